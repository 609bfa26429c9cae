//! Domain models for the storefront.
//!
//! These types are what handlers and services work with. Database row types
//! stay private to the `db` module and convert into these.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use account::{Address, AddressInput, Review, WishlistEntry};
pub use cart::{CartLine, CartLineView, CartOwner, CartView, MergeLine, MergeStep};
pub use catalog::{
    Category, CategorySummary, Page, Product, ProductColor, ProductDetail, ProductFilter,
    ProductSize, ProductSort, ProductSummary, RatingSummary, StockItem,
};
pub use order::{NewOrderItem, Order, OrderItem, OrderWithItems, ShippingAddress};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
