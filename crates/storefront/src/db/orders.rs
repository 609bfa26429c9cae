//! Order storage.
//!
//! Checkout runs `decrement_stock`, `insert_order` and `insert_item` inside
//! one transaction; they accept any executor so the caller owns the
//! transaction boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use malmequer_core::{
    Email, OrderId, OrderStatus, PaymentStatus, StockItemId, UserId, pricing::OrderTotals,
};

use super::RepositoryError;
use crate::models::{NewOrderItem, Order, OrderItem, OrderWithItems, ShippingAddress};

const ORDER_COLUMNS: &str = r"
    id, order_number, user_id, email, status, payment_status, payment_intent_id,
    subtotal, tax, shipping, discount, total, promo_code,
    ship_full_name, ship_line1, ship_line2, ship_city, ship_postal_code, ship_country, ship_phone,
    created_at, updated_at
";

const ITEM_COLUMNS: &str = r"
    id, product_id, stock_item_id, product_name, size_label, color_name,
    unit_price, quantity, line_total
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    email: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_intent_id: Option<String>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total: Decimal,
    promo_code: Option<String>,
    ship_full_name: String,
    ship_line1: String,
    ship_line2: Option<String>,
    ship_city: String,
    ship_postal_code: String,
    ship_country: String,
    ship_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "order {} has invalid email: {e}",
                r.order_number
            ))
        })?;
        Ok(Self {
            id: r.id,
            order_number: r.order_number,
            user_id: r.user_id,
            email,
            status: r.status,
            payment_status: r.payment_status,
            payment_intent_id: r.payment_intent_id,
            subtotal: r.subtotal,
            tax: r.tax,
            shipping: r.shipping,
            discount: r.discount,
            total: r.total,
            promo_code: r.promo_code,
            shipping_address: ShippingAddress {
                full_name: r.ship_full_name,
                line1: r.ship_line1,
                line2: r.ship_line2,
                city: r.ship_city,
                postal_code: r.ship_postal_code,
                country: r.ship_country,
                phone: r.ship_phone,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Everything needed to insert an order header.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: Option<UserId>,
    pub email: &'a Email,
    pub totals: &'a OrderTotals,
    pub promo_code: Option<&'a str>,
    pub shipping_address: &'a ShippingAddress,
}

/// Take `quantity` units from a stock item.
///
/// Returns `false` when there are not enough units; the row is left untouched.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock<'e, E>(
    executor: E,
    stock_item_id: StockItemId,
    quantity: i32,
) -> Result<bool, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE shop.stock_item
        SET quantity = quantity - $2
        WHERE id = $1 AND quantity >= $2
        ",
    )
    .bind(stock_item_id)
    .bind(quantity)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Put every unit of an order's items back into stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restore_stock<'e, E>(executor: E, order_id: OrderId) -> Result<u64, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE shop.stock_item si
        SET quantity = si.quantity + oi.total
        FROM (
            SELECT stock_item_id, SUM(quantity)::int AS total
            FROM shop.order_item
            WHERE order_id = $1 AND stock_item_id IS NOT NULL
            GROUP BY stock_item_id
        ) oi
        WHERE si.id = oi.stock_item_id
        ",
    )
    .bind(order_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number is taken.
pub async fn insert_order<'e, E>(executor: E, new: &NewOrder<'_>) -> Result<Order, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let address = new.shipping_address;
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO shop.order (
            order_number, user_id, email, subtotal, tax, shipping, discount, total, promo_code,
            ship_full_name, ship_line1, ship_line2, ship_city, ship_postal_code, ship_country,
            ship_phone
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(new.order_number)
    .bind(new.user_id)
    .bind(new.email)
    .bind(new.totals.subtotal)
    .bind(new.totals.tax)
    .bind(new.totals.shipping)
    .bind(new.totals.discount)
    .bind(new.totals.total)
    .bind(new.promo_code)
    .bind(address.full_name.trim())
    .bind(address.line1.trim())
    .bind(address.line2.as_deref())
    .bind(address.city.trim())
    .bind(address.postal_code.trim())
    .bind(address.country.trim())
    .bind(address.phone.as_deref())
    .fetch_one(executor)
    .await
    .map_err(|e| RepositoryError::from_unique_violation(e, "order number"))?;

    row.try_into()
}

/// Insert one order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item<'e, E>(
    executor: E,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let item = sqlx::query_as::<_, OrderItem>(&format!(
        r"
        INSERT INTO shop.order_item (
            order_id, product_id, stock_item_id, product_name, size_label, color_name,
            unit_price, quantity, line_total
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ITEM_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.stock_item_id)
    .bind(&item.product_name)
    .bind(item.size_label.as_deref())
    .bind(item.color_name.as_deref())
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.line_total)
    .fetch_one(executor)
    .await?;

    Ok(item)
}

/// Set an order's status, returning the updated order.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if there is no such order.
pub async fn set_status<'e, E>(
    executor: E,
    order_id: OrderId,
    status: OrderStatus,
    payment_status: Option<PaymentStatus>,
) -> Result<Order, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        UPDATE shop.order
        SET status = $2,
            payment_status = COALESCE($3, payment_status),
            updated_at = now()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(status)
    .bind(payment_status)
    .fetch_optional(executor)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    row.try_into()
}

/// Lock an order row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order<'e, E>(
    executor: E,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(executor)
    .await?
    .map(Order::try_from)
    .transpose()
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM shop.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_items(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = self.get_by_number(order_number).await? else {
            return Ok(None);
        };
        let items = self.items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// The user's orders, newest first, each with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let rows = sqlx::query_as::<_, ItemWithOrderRow>(&format!(
            r"
            SELECT order_id, {ITEM_COLUMNS}
            FROM shop.order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, id
            "
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut result: Vec<OrderWithItems> = orders
            .into_iter()
            .map(|order| OrderWithItems { order, items: Vec::new() })
            .collect();
        for row in rows {
            if let Some(entry) = result.iter_mut().find(|o| o.order.id == row.order_id) {
                entry.items.push(row.item);
            }
        }
        Ok(result)
    }

    /// Record the payment intent created for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    pub async fn set_payment_intent(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.order SET payment_intent_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(order_id)
        .bind(payment_intent_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark an order paid, confirming it if it is still pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.order
            SET payment_status = 'PAID',
                status = CASE
                    WHEN status = 'PENDING' THEN 'CONFIRMED'::shop.order_status
                    ELSE status
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    pub async fn set_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.order SET payment_status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(order_id)
        .bind(payment_status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ItemWithOrderRow {
    order_id: OrderId,
    #[sqlx(flatten)]
    item: OrderItem,
}
