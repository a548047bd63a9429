//! Demo inventory and order book for a fresh data directory.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{Order, RawMaterialRoll};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn stamp(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    day(y, m, d).and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

fn roll(
    id: &str,
    batch: &str,
    width: f64,
    weight: f64,
    material: &str,
    is_remnant: bool,
    entry: DateTime<Utc>,
) -> RawMaterialRoll {
    RawMaterialRoll {
        id: id.to_string(),
        batch_number: batch.to_string(),
        width,
        weight,
        material_type: material.to_string(),
        is_remnant,
        entry_date: entry,
    }
}

fn order(id: &str, customer: &str, width: f64, weight: f64, due: NaiveDate) -> Order {
    Order {
        id: id.to_string(),
        customer_name: customer.to_string(),
        required_width: width,
        target_weight: weight,
        is_fulfilled: false,
        due_date: due,
    }
}

pub fn inventory() -> Vec<RawMaterialRoll> {
    vec![
        roll("RM-001", "BATCH-X99", 1200.0, 500.0, "PVC-A", false, stamp(2023, 10, 1)),
        roll("RM-002", "BATCH-X99-OFF", 350.0, 45.0, "PVC-A", true, stamp(2023, 10, 5)),
        roll("RM-003", "BATCH-Y01", 1000.0, 400.0, "ALU-FOIL", false, stamp(2023, 10, 10)),
        roll("RM-004", "BATCH-Z22", 1250.0, 550.0, "PVC-B", false, stamp(2023, 10, 12)),
    ]
}

pub fn orders() -> Vec<Order> {
    vec![
        order("ORD-101", "PharmaCorp", 220.0, 100.0, day(2023, 11, 1)),
        order("ORD-102", "MediLife", 310.0, 50.0, day(2023, 11, 2)),
        order("ORD-103", "HealthPlus", 150.0, 200.0, day(2023, 11, 5)),
        order("ORD-104", "BioGen", 220.0, 80.0, day(2023, 11, 6)),
        order("ORD-105", "PharmaCorp", 400.0, 150.0, day(2023, 11, 7)),
    ]
}
