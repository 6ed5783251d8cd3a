//! Table and group definitions shared across test modules.
//!
//! Identities are fixed so that wire schemas generated in different tests
//! bind the same way.

use std::{str::FromStr, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tessera_types::{Column, ColumnType, IntWidth, Row, Table, TableGroup, TableId, Value};
use uuid::Uuid;

/// Identity of the `orders` table.
pub const ORDERS_UUID: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_0000_0000_0001);

/// Identity of the `items` table.
pub const ITEMS_UUID: Uuid = Uuid::from_u128(0x0000_0002_0000_4000_8000_0000_0000_0002);

/// Id of the `orders` table.
pub const ORDERS_ID: TableId = TableId::new(1);

/// Id of the `items` table.
pub const ITEMS_ID: TableId = TableId::new(2);

/// Id of the table returned by [`all_types_table`].
pub const ALL_TYPES_ID: TableId = TableId::new(10);

fn column(name: &str, column_type: ColumnType, nullable: bool, seed: u128) -> Column {
    Column::builder()
        .name(name)
        .column_type(column_type)
        .uuid(Uuid::from_u128(0xC0 << 64 | seed))
        .nullable(nullable)
        .build()
}

/// `shop.orders (id BIGINT NOT NULL, total DECIMAL(10,2))` and
/// `shop.items (order_id BIGINT NOT NULL, sku INT NOT NULL, qty INT)`.
#[must_use]
pub fn orders_items() -> (Arc<Table>, Arc<Table>) {
    let total = ColumnType::decimal(10, 2).expect("valid decimal");
    let orders = Table::builder()
        .id(ORDERS_ID)
        .schema("shop")
        .name("orders")
        .uuid(ORDERS_UUID)
        .columns(vec![
            column("id", ColumnType::int(IntWidth::W64), false, 0x101),
            column("total", total, true, 0x102),
        ])
        .build()
        .expect("valid orders table");
    let items = Table::builder()
        .id(ITEMS_ID)
        .schema("shop")
        .name("items")
        .uuid(ITEMS_UUID)
        .columns(vec![
            column("order_id", ColumnType::int(IntWidth::W64), false, 0x201),
            column("sku", ColumnType::int(IntWidth::W32), false, 0x202),
            column("qty", ColumnType::int(IntWidth::W32), true, 0x203),
        ])
        .build()
        .expect("valid items table");
    (Arc::new(orders), Arc::new(items))
}

/// Group `shop.orders` with `items` joined under `orders`.
#[must_use]
pub fn orders_items_group() -> Arc<TableGroup> {
    let (orders, items) = orders_items();
    let mut group = TableGroup::new("shop.orders", orders);
    group.add_child(ORDERS_ID, items).expect("items joins orders");
    Arc::new(group)
}

/// A nullable column of every supported type.
#[must_use]
pub fn all_types_table() -> Arc<Table> {
    let types = [
        ("flag", ColumnType::Boolean),
        ("tiny", ColumnType::int(IntWidth::W8)),
        ("small", ColumnType::int(IntWidth::W16)),
        ("medium", ColumnType::int(IntWidth::W24)),
        ("regular", ColumnType::int(IntWidth::W32)),
        ("big", ColumnType::int(IntWidth::W64)),
        ("utiny", ColumnType::uint(IntWidth::W8)),
        ("ubig", ColumnType::uint(IntWidth::W64)),
        ("ratio", ColumnType::Float),
        ("score", ColumnType::Double),
        ("price", ColumnType::Decimal { precision: 18, scale: 4 }),
        ("balance", ColumnType::Decimal { precision: 28, scale: 6 }),
        ("code", ColumnType::Char { length: 4 }),
        ("label", ColumnType::Varchar { length: 64 }),
        ("body", ColumnType::Text),
        ("digest", ColumnType::Binary { length: 4 }),
        ("blob", ColumnType::Varbinary { length: 64 }),
        ("payload", ColumnType::Blob),
        ("born", ColumnType::Date),
        ("seen", ColumnType::DateTime),
        ("elapsed", ColumnType::Time),
        ("vintage", ColumnType::Year),
        ("stamp", ColumnType::Timestamp),
    ];
    let columns = types
        .into_iter()
        .zip(0x300u128..)
        .map(|((name, column_type), seed)| column(name, column_type, true, seed))
        .collect();
    let table = Table::builder()
        .id(ALL_TYPES_ID)
        .schema("test")
        .name("all_types")
        .uuid(Uuid::from_u128(0x0000_000A_0000_4000_8000_0000_0000_000A))
        .columns(columns)
        .build()
        .expect("valid all_types table");
    Arc::new(table)
}

/// A row of [`all_types_table`] with a non-NULL value in every column.
#[must_use]
pub fn all_types_row(table: &Table) -> Row {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
    let datetime = date.and_hms_opt(23, 59, 58).expect("valid time");
    let decimal = |s: &str| Value::Decimal(Decimal::from_str(s).expect("valid decimal"));
    Row::new(
        table.id,
        [
            Value::Bool(true),
            Value::Int(-128),
            Value::Int(32_767),
            Value::Int(-8_388_608),
            Value::Int(i64::from(i32::MIN)),
            Value::Int(i64::MAX),
            Value::UInt(255),
            Value::UInt(u64::MAX),
            Value::Float(1.5),
            Value::Double(-2.25e100),
            decimal("-12345678901234.5678"),
            decimal("1234567890123456789012.000001"),
            Value::from("ABCD"),
            Value::from("héllo"),
            Value::from(""),
            Value::Bytes(vec![0, 1, 2, 3]),
            Value::Bytes(vec![]),
            Value::Bytes(vec![0xFF; 300]),
            Value::Date(date),
            Value::DateTime(datetime),
            Value::Time(-3_020_399),
            Value::Year(1901),
            Value::Timestamp(u32::MAX),
        ],
    )
}
