//! Common test fixtures for validation and diff scenarios.
//!
//! Small hand-written tables for unit tests, plus seeded random tables and
//! source/target pairs for property tests and benchmarks.

use crate::error::Result;
use crate::table::{Column, Table, Value};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A customer table with nulls in `email` and an out-of-range `age`.
///
/// Columns: `id` (Integer64), `email` (Utf8Text), `age` (Integer64),
/// `status` (Utf8Text), `signup` (Date).
pub fn customers() -> Result<Table> {
    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d);
    Table::builder()
        .column(Column::int64("id", (1..=6).map(Some)))
        .column(Column::utf8(
            "email",
            [
                Some("alice@example.com"),
                Some("bob@example.com"),
                None,
                Some("dave.example.com"),
                Some("eve@example.com"),
                None,
            ],
        ))
        .column(Column::int64(
            "age",
            [Some(25), Some(30), Some(200), None, Some(41), Some(-1)],
        ))
        .column(Column::utf8(
            "status",
            [
                Some("active"),
                Some("inactive"),
                Some("active"),
                Some("pending"),
                Some("banned"),
                None,
            ],
        ))
        .column(Column::date(
            "signup",
            [day(1), day(2), day(3), None, day(5), day(6)],
        ))
        .build()
}

/// The untyped form of an orders feed: every column arrives as text.
pub fn raw_orders() -> Result<Table> {
    Table::builder()
        .column(Column::utf8("order_id", [Some("1"), Some("2"), Some("3"), Some("4")]))
        .column(Column::utf8(
            "amount",
            [Some("19.99"), Some("5"), Some("n/a"), None],
        ))
        .column(Column::utf8(
            "shipped",
            [Some("true"), Some("no"), Some("Y"), Some("0")],
        ))
        .column(Column::utf8(
            "ordered_on",
            [Some("2024-03-01"), Some("2024-03-02"), Some("03/03/2024"), None],
        ))
        .build()
}

/// A table of `rows` rows with a unique `id` key, a nullable `email`, a
/// nullable `amount` and a `region`, generated deterministically from `seed`.
pub fn random_table(rows: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_rows(&mut rng, 0..rows as i64)
}

/// A source table and a target derived from it by removing, adding and
/// modifying roughly `change_rate` of the rows each.
pub fn random_pair(rows: usize, change_rate: f64, seed: u64) -> Result<(Table, Table)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let source = random_rows(&mut rng, 0..rows as i64)?;

    let mut ids = Vec::with_capacity(rows);
    let mut emails = Vec::with_capacity(rows);
    let mut amounts = Vec::with_capacity(rows);
    let mut regions = Vec::with_capacity(rows);
    for row in source.rows() {
        if rng.random_bool(change_rate) {
            continue;
        }
        let amount = row[2].as_f64();
        let amount = if rng.random_bool(change_rate) {
            amount.map(|a| a + 1.0).or(Some(0.0))
        } else {
            amount
        };
        ids.push(int_of(&row[0]));
        emails.push(text_of(&row[1]));
        amounts.push(amount);
        regions.push(text_of(&row[3]));
    }
    let extra = ((rows as f64) * change_rate).ceil() as i64;
    let added = random_rows(&mut rng, rows as i64..rows as i64 + extra)?;
    for row in added.rows() {
        ids.push(int_of(&row[0]));
        emails.push(text_of(&row[1]));
        amounts.push(row[2].as_f64());
        regions.push(text_of(&row[3]));
    }

    let target = Table::builder()
        .column(Column::int64("id", ids))
        .column(Column::utf8("email", emails))
        .column(Column::float64("amount", amounts))
        .column(Column::utf8("region", regions))
        .build()?;
    Ok((source, target))
}

fn int_of(value: &Value) -> Option<i64> {
    match value {
        Value::Int(v) => Some(*v),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

fn random_rows(rng: &mut StdRng, ids: std::ops::Range<i64>) -> Result<Table> {
    const REGIONS: [&str; 4] = ["north", "south", "east", "west"];
    let n = (ids.end - ids.start).max(0) as usize;
    let mut emails = Vec::with_capacity(n);
    let mut amounts = Vec::with_capacity(n);
    let mut regions = Vec::with_capacity(n);
    for id in ids.clone() {
        emails.push(rng.random_bool(0.9).then(|| format!("user{id}@example.com")));
        amounts.push(
            rng.random_bool(0.95)
                .then(|| (rng.random_range(0..100_000u32) as f64) / 100.0),
        );
        regions.push(Some(REGIONS[rng.random_range(0..REGIONS.len())]));
    }
    Table::builder()
        .column(Column::int64("id", ids.map(Some)))
        .column(Column::utf8("email", emails))
        .column(Column::float64("amount", amounts))
        .column(Column::utf8("region", regions))
        .build()
}
