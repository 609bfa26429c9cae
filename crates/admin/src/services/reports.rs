//! Sales, inventory, customer and financial reports.
//!
//! Rows come from `db::reports`; everything below `ReportService` is plain
//! aggregation over those rows, rendered as JSON or CSV.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use malmequer_core::pricing::round_money;
use malmequer_core::{PaymentStatus, ProductId};

use crate::db::reports::{CustomerCounts, InventoryRow, ReportLine, ReportOrder};
use crate::db::{ReportRepository, RepositoryError};

/// Days covered when no `from` is given, counting `to` itself.
pub const DEFAULT_RANGE_DAYS: i64 = 30;
/// Longest range a report may cover, counting both ends.
pub const MAX_RANGE_DAYS: i64 = 366;
/// Length of the top products / top customers lists.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Sales,
    Inventory,
    Customers,
    Financial,
}

impl ReportKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Inventory => "inventory",
            Self::Customers => "customers",
            Self::Financial => "financial",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "inventory" => Ok(Self::Inventory),
            "customers" => Ok(Self::Customers),
            "financial" => Ok(Self::Financial),
            _ => Err(format!("unknown report: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

/// Inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Fill in defaults: `to` is `today`, `from` is the start of a
    /// [`DEFAULT_RANGE_DAYS`]-day window ending at `to`.
    ///
    /// # Errors
    ///
    /// Returns a message when `from` is after `to` or the range spans more
    /// than [`MAX_RANGE_DAYS`] days.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, String> {
        let to = to.unwrap_or(today);
        let from = match from {
            Some(from) => from,
            None => to
                .checked_sub_signed(TimeDelta::days(DEFAULT_RANGE_DAYS - 1))
                .unwrap_or(NaiveDate::MIN),
        };
        if from > to {
            return Err("from must not be after to".to_string());
        }
        if (to - from).num_days() >= MAX_RANGE_DAYS {
            return Err(format!("range must not exceed {MAX_RANGE_DAYS} days"));
        }
        Ok(Self { from, to })
    }

    /// Half-open timestamp bounds `[from 00:00, day after to 00:00)`.
    #[must_use]
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.to.succ_opt().unwrap_or(NaiveDate::MAX);
        (
            self.from.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        )
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(|day| *day <= self.to)
    }
}

// =============================================================================
// Report types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: u32,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub order_count: u32,
    pub units_sold: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub revenue_by_day: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Ok,
    Low,
    Out,
}

impl StockLevel {
    #[must_use]
    pub const fn classify(quantity: i32, threshold: i32) -> Self {
        if quantity <= 0 {
            Self::Out
        } else if quantity <= threshold {
            Self::Low
        } else {
            Self::Ok
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Low => "low",
            Self::Out => "out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub product_name: String,
    pub sku: String,
    pub size_label: Option<String>,
    pub color_name: Option<String>,
    pub quantity: i32,
    pub level: StockLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    pub threshold: i32,
    pub total_units: i64,
    pub low_count: usize,
    pub out_count: usize,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSpend {
    pub email: String,
    pub orders: u32,
    pub spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerReport {
    pub range: DateRange,
    /// Registered customers overall.
    pub customer_count: i64,
    /// Customers who registered within the range.
    pub new_customers: i64,
    /// Distinct emails (guests included) with an order in the range.
    pub ordering_customers: usize,
    /// Of those, the ones with more than one order.
    pub repeat_customers: usize,
    pub top_customers: Vec<CustomerSpend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialReport {
    pub range: DateRange,
    /// Orders whose payment was collected (including later refunds).
    pub paid_orders: u32,
    pub gross: Decimal,
    pub discounts: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub refunds: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Sales(SalesReport),
    Inventory(InventoryReport),
    Customers(CustomerReport),
    Financial(FinancialReport),
}

// =============================================================================
// Aggregation
// =============================================================================

/// Sales over orders that count as a sale (not cancelled or refunded).
#[must_use]
pub fn sales_report(range: DateRange, orders: &[ReportOrder], lines: &[ReportLine]) -> SalesReport {
    let sales: Vec<&ReportOrder> = orders.iter().filter(|o| o.status.counts_as_sale()).collect();
    let sale_ids: HashSet<_> = sales.iter().map(|o| o.id).collect();
    let order_day: HashMap<_, _> = sales
        .iter()
        .map(|o| (o.id, o.created_at.date_naive()))
        .collect();

    let mut by_day: BTreeMap<NaiveDate, DailySales> = range
        .days()
        .map(|date| {
            (
                date,
                DailySales {
                    date,
                    orders: 0,
                    units: 0,
                    revenue: Decimal::ZERO,
                },
            )
        })
        .collect();

    for order in &sales {
        if let Some(day) = by_day.get_mut(&order.created_at.date_naive()) {
            day.orders += 1;
            day.revenue += order.total;
        }
    }

    let mut products: HashMap<ProductId, TopProduct> = HashMap::new();
    let mut units_sold = 0_i64;
    for line in lines.iter().filter(|l| sale_ids.contains(&l.order_id)) {
        let units = i64::from(line.quantity);
        units_sold += units;
        if let Some(day) = order_day.get(&line.order_id).and_then(|d| by_day.get_mut(d)) {
            day.units += units;
        }
        let entry = products.entry(line.product_id).or_insert_with(|| TopProduct {
            product_id: line.product_id,
            name: line.product_name.clone(),
            units: 0,
            revenue: Decimal::ZERO,
        });
        entry.units += units;
        entry.revenue += line.line_total;
    }

    let mut top_products: Vec<TopProduct> = products.into_values().collect();
    top_products.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.units.cmp(&a.units))
            .then(a.name.cmp(&b.name))
    });
    top_products.truncate(TOP_N);

    let order_count = u32::try_from(sales.len()).unwrap_or(u32::MAX);
    let revenue: Decimal = sales.iter().map(|o| o.total).sum();
    let average_order_value = if order_count == 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(order_count))
    };

    SalesReport {
        range,
        order_count,
        units_sold,
        revenue,
        average_order_value,
        revenue_by_day: by_day.into_values().collect(),
        top_products,
    }
}

#[must_use]
pub fn inventory_report(rows: Vec<InventoryRow>, threshold: i32) -> InventoryReport {
    let items: Vec<InventoryItem> = rows
        .into_iter()
        .map(|row| InventoryItem {
            level: StockLevel::classify(row.quantity, threshold),
            product_name: row.product_name,
            sku: row.sku,
            size_label: row.size_label,
            color_name: row.color_name,
            quantity: row.quantity,
        })
        .collect();

    InventoryReport {
        threshold,
        total_units: items.iter().map(|i| i64::from(i.quantity)).sum(),
        low_count: items.iter().filter(|i| i.level == StockLevel::Low).count(),
        out_count: items.iter().filter(|i| i.level == StockLevel::Out).count(),
        items,
    }
}

/// Customers by spend over orders that count as a sale. Emails are compared
/// case-insensitively so guest and account orders of one person merge.
#[must_use]
pub fn customer_report(
    range: DateRange,
    counts: CustomerCounts,
    orders: &[ReportOrder],
) -> CustomerReport {
    let mut spend: HashMap<String, CustomerSpend> = HashMap::new();
    for order in orders.iter().filter(|o| o.status.counts_as_sale()) {
        let email = order.email.to_lowercase();
        let entry = spend.entry(email.clone()).or_insert_with(|| CustomerSpend {
            email,
            orders: 0,
            spent: Decimal::ZERO,
        });
        entry.orders += 1;
        entry.spent += order.total;
    }

    let ordering_customers = spend.len();
    let repeat_customers = spend.values().filter(|c| c.orders > 1).count();
    let mut top_customers: Vec<CustomerSpend> = spend.into_values().collect();
    top_customers.sort_by(|a, b| b.spent.cmp(&a.spent).then(a.email.cmp(&b.email)));
    top_customers.truncate(TOP_N);

    CustomerReport {
        range,
        customer_count: counts.total,
        new_customers: counts.new_in_range,
        ordering_customers,
        repeat_customers,
        top_customers,
    }
}

/// Money collected in the range.
///
/// Only orders whose payment went through (`PAID` or later `REFUNDED`)
/// count; refunds are the totals of the refunded ones, and
/// `net = gross - discounts + tax + shipping - refunds`.
#[must_use]
pub fn financial_report(range: DateRange, orders: &[ReportOrder]) -> FinancialReport {
    let collected: Vec<&ReportOrder> = orders
        .iter()
        .filter(|o| matches!(o.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded))
        .collect();

    let gross: Decimal = collected.iter().map(|o| o.subtotal).sum();
    let discounts: Decimal = collected.iter().map(|o| o.discount).sum();
    let tax: Decimal = collected.iter().map(|o| o.tax).sum();
    let shipping: Decimal = collected.iter().map(|o| o.shipping).sum();
    let refunds: Decimal = collected
        .iter()
        .filter(|o| o.payment_status == PaymentStatus::Refunded)
        .map(|o| o.total)
        .sum();

    FinancialReport {
        range,
        paid_orders: u32::try_from(collected.len()).unwrap_or(u32::MAX),
        gross,
        discounts,
        tax,
        shipping,
        refunds,
        net: gross - discounts + tax + shipping - refunds,
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Quote a CSV field when it contains a comma, quote or line break.
#[must_use]
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl Report {
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Sales(_) => ReportKind::Sales,
            Self::Inventory(_) => ReportKind::Inventory,
            Self::Customers(_) => ReportKind::Customers,
            Self::Financial(_) => ReportKind::Financial,
        }
    }

    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        match self {
            Self::Sales(report) => {
                csv.push_str("date,orders,units,revenue\n");
                for day in &report.revenue_by_day {
                    let _ = writeln!(
                        csv,
                        "{},{},{},{}",
                        day.date, day.orders, day.units, day.revenue
                    );
                }
            }
            Self::Inventory(report) => {
                csv.push_str("product,sku,size,color,quantity,level\n");
                for item in &report.items {
                    let _ = writeln!(
                        csv,
                        "{},{},{},{},{},{}",
                        csv_field(&item.product_name),
                        csv_field(&item.sku),
                        csv_field(item.size_label.as_deref().unwrap_or("")),
                        csv_field(item.color_name.as_deref().unwrap_or("")),
                        item.quantity,
                        item.level.as_str()
                    );
                }
            }
            Self::Customers(report) => {
                csv.push_str("email,orders,spent\n");
                for customer in &report.top_customers {
                    let _ = writeln!(
                        csv,
                        "{},{},{}",
                        csv_field(&customer.email),
                        customer.orders,
                        customer.spent
                    );
                }
            }
            Self::Financial(report) => {
                csv.push_str("metric,amount\n");
                for (metric, amount) in [
                    ("gross", report.gross),
                    ("discounts", report.discounts),
                    ("tax", report.tax),
                    ("shipping", report.shipping),
                    ("refunds", report.refunds),
                    ("net", report.net),
                ] {
                    let _ = writeln!(csv, "{metric},{amount}");
                }
            }
        }
        csv
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct ReportService<'a> {
    reports: ReportRepository<'a>,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reports: ReportRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn generate(
        &self,
        kind: ReportKind,
        range: DateRange,
        low_stock_threshold: i32,
    ) -> Result<Report, RepositoryError> {
        let (from, to) = range.bounds();
        let report = match kind {
            ReportKind::Sales => {
                let orders = self.reports.orders(from, to).await?;
                let lines = self.reports.lines(from, to).await?;
                Report::Sales(sales_report(range, &orders, &lines))
            }
            ReportKind::Inventory => {
                let rows = self.reports.inventory().await?;
                Report::Inventory(inventory_report(rows, low_stock_threshold))
            }
            ReportKind::Customers => {
                let counts = self.reports.customer_counts(from, to).await?;
                let orders = self.reports.orders(from, to).await?;
                Report::Customers(customer_report(range, counts, &orders))
            }
            ReportKind::Financial => {
                let orders = self.reports.orders(from, to).await?;
                Report::Financial(financial_report(range, &orders))
            }
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use malmequer_core::{OrderId, OrderStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range() -> DateRange {
        DateRange {
            from: date(2025, 3, 1),
            to: date(2025, 3, 3),
        }
    }

    fn order(
        id: i32,
        day: u32,
        email: &str,
        total: i64,
        status: OrderStatus,
        payment: PaymentStatus,
    ) -> ReportOrder {
        let total = Decimal::new(total, 2);
        ReportOrder {
            id: OrderId::new(id),
            order_number: format!("MQ-202503{day:02}-{id:06}"),
            user_id: None,
            email: email.to_string(),
            status,
            payment_status: payment,
            subtotal: total,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total,
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
        }
    }

    fn line(order_id: i32, product_id: i32, name: &str, quantity: i32, total: i64) -> ReportLine {
        ReportLine {
            order_id: OrderId::new(order_id),
            product_id: ProductId::new(product_id),
            product_name: name.to_string(),
            quantity,
            line_total: Decimal::new(total, 2),
        }
    }

    #[test]
    fn test_range_defaults_to_last_thirty_days() {
        let today = date(2025, 3, 31);
        let range = DateRange::resolve(None, None, today).unwrap();
        assert_eq!(range.to, today);
        assert_eq!(range.from, date(2025, 3, 2));
        assert_eq!(range.days().count(), 30);
    }

    #[test]
    fn test_range_rejects_reversed_dates() {
        let today = date(2025, 3, 31);
        assert!(DateRange::resolve(Some(date(2025, 3, 5)), Some(date(2025, 3, 1)), today).is_err());
    }

    #[test]
    fn test_range_span_is_capped() {
        let today = date(2025, 3, 31);
        let leap_year = DateRange::resolve(Some(date(2024, 1, 1)), Some(date(2024, 12, 31)), today)
            .unwrap();
        assert_eq!(leap_year.days().count(), 366);

        assert!(DateRange::resolve(Some(date(2024, 1, 1)), Some(date(2025, 1, 1)), today).is_err());
        assert!(
            DateRange::resolve(Some(date(1, 1, 1)), Some(date(9999, 12, 31)), today).is_err()
        );
    }

    #[test]
    fn test_range_bounds_cover_whole_last_day() {
        let (from, to) = range().bounds();
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_sales_report_skips_cancelled_orders() {
        let orders = vec![
            order(1, 1, "ana@example.pt", 5980, OrderStatus::Confirmed, PaymentStatus::Paid),
            order(2, 1, "rui@example.pt", 2000, OrderStatus::Cancelled, PaymentStatus::Pending),
            order(3, 3, "ana@example.pt", 1500, OrderStatus::Shipped, PaymentStatus::Paid),
        ];
        let lines = vec![
            line(1, 10, "Linen Shirt", 2, 5980),
            line(2, 11, "Tote Bag", 1, 2000),
            line(3, 11, "Tote Bag", 1, 1500),
        ];

        let report = sales_report(range(), &orders, &lines);
        assert_eq!(report.order_count, 2);
        assert_eq!(report.units_sold, 3);
        assert_eq!(report.revenue, Decimal::new(7480, 2));
        assert_eq!(report.average_order_value, Decimal::new(3740, 2));

        assert_eq!(report.revenue_by_day.len(), 3);
        assert_eq!(report.revenue_by_day[0].orders, 1);
        assert_eq!(report.revenue_by_day[0].units, 2);
        assert_eq!(report.revenue_by_day[1].revenue, Decimal::ZERO);
        assert_eq!(report.revenue_by_day[2].revenue, Decimal::new(1500, 2));

        assert_eq!(report.top_products[0].name, "Linen Shirt");
        assert_eq!(report.top_products[1].units, 1);
    }

    #[test]
    fn test_empty_sales_report_has_zero_average() {
        let report = sales_report(range(), &[], &[]);
        assert_eq!(report.order_count, 0);
        assert_eq!(report.average_order_value, Decimal::ZERO);
        assert!(report.top_products.is_empty());
    }

    #[test]
    fn test_inventory_levels() {
        assert_eq!(StockLevel::classify(0, 5), StockLevel::Out);
        assert_eq!(StockLevel::classify(5, 5), StockLevel::Low);
        assert_eq!(StockLevel::classify(6, 5), StockLevel::Ok);

        let rows = vec![
            InventoryRow {
                product_name: "Linen Shirt".into(),
                sku: "LINEN-SHIRT-M-SAND".into(),
                size_label: Some("M".into()),
                color_name: Some("Sand".into()),
                quantity: 0,
            },
            InventoryRow {
                product_name: "Tote Bag".into(),
                sku: "TOTE-BAG".into(),
                size_label: None,
                color_name: None,
                quantity: 12,
            },
        ];
        let report = inventory_report(rows, 5);
        assert_eq!(report.total_units, 12);
        assert_eq!(report.out_count, 1);
        assert_eq!(report.low_count, 0);
    }

    #[test]
    fn test_customer_report_merges_email_case_and_counts_repeats() {
        let orders = vec![
            order(1, 1, "Ana@Example.pt", 1000, OrderStatus::Delivered, PaymentStatus::Paid),
            order(2, 2, "ana@example.pt", 2500, OrderStatus::Confirmed, PaymentStatus::Paid),
            order(3, 2, "rui@example.pt", 9000, OrderStatus::Confirmed, PaymentStatus::Paid),
            order(4, 3, "eva@example.pt", 9900, OrderStatus::Refunded, PaymentStatus::Refunded),
        ];
        let counts = CustomerCounts { total: 40, new_in_range: 3 };

        let report = customer_report(range(), counts, &orders);
        assert_eq!(report.customer_count, 40);
        assert_eq!(report.new_customers, 3);
        assert_eq!(report.ordering_customers, 2);
        assert_eq!(report.repeat_customers, 1);
        assert_eq!(report.top_customers[0].email, "rui@example.pt");
        assert_eq!(report.top_customers[1].spent, Decimal::new(3500, 2));
    }

    #[test]
    fn test_financial_report_nets_out_refunds() {
        let mut paid =
            order(1, 1, "ana@example.pt", 0, OrderStatus::Confirmed, PaymentStatus::Paid);
        paid.subtotal = Decimal::new(10000, 2);
        paid.discount = Decimal::new(1000, 2);
        paid.tax = Decimal::new(2070, 2);
        paid.shipping = Decimal::ZERO;
        paid.total = Decimal::new(11070, 2);

        let mut refunded =
            order(2, 2, "rui@example.pt", 0, OrderStatus::Refunded, PaymentStatus::Refunded);
        refunded.subtotal = Decimal::new(2000, 2);
        refunded.tax = Decimal::new(460, 2);
        refunded.shipping = Decimal::new(499, 2);
        refunded.total = Decimal::new(2959, 2);

        let unpaid =
            order(3, 3, "eva@example.pt", 5000, OrderStatus::Pending, PaymentStatus::Pending);

        let report = financial_report(range(), &[paid, refunded, unpaid]);
        assert_eq!(report.paid_orders, 2);
        assert_eq!(report.gross, Decimal::new(12000, 2));
        assert_eq!(report.discounts, Decimal::new(1000, 2));
        assert_eq!(report.tax, Decimal::new(2530, 2));
        assert_eq!(report.shipping, Decimal::new(499, 2));
        assert_eq!(report.refunds, Decimal::new(2959, 2));
        assert_eq!(report.net, Decimal::new(11070, 2));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("Tote Bag"), "Tote Bag");
        assert_eq!(csv_field("Shirt, linen"), "\"Shirt, linen\"");
        assert_eq!(csv_field("The \"Classic\""), "\"The \"\"Classic\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_inventory_csv() {
        let report = Report::Inventory(inventory_report(
            vec![InventoryRow {
                product_name: "Shirt, linen".into(),
                sku: "SHIRT-LINEN-M".into(),
                size_label: Some("M".into()),
                color_name: None,
                quantity: 3,
            }],
            5,
        ));
        assert_eq!(
            report.to_csv(),
            "product,sku,size,color,quantity,level\n\"Shirt, linen\",SHIRT-LINEN-M,M,,3,low\n"
        );
    }

    #[test]
    fn test_financial_csv_lists_every_metric() {
        let report = Report::Financial(financial_report(range(), &[]));
        let csv = report.to_csv();
        assert!(csv.starts_with("metric,amount\n"));
        assert_eq!(csv.lines().count(), 7);
        assert!(csv.contains("net,0"));
    }

    #[test]
    fn test_report_kind_parsing() {
        assert_eq!("Sales".parse::<ReportKind>(), Ok(ReportKind::Sales));
        assert!("margins".parse::<ReportKind>().is_err());
    }
}
