use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{Order, RawMaterialRoll};

/// Production overview: what is in stock and what is still owed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub roll_count: usize,
    pub remnant_count: usize,
    pub stock_weight_kg: f64,
    pub stock_width_by_material: BTreeMap<String, f64>,
    pub pending_orders: usize,
    pub fulfilled_orders: usize,
    pub pending_width_mm: f64,
    pub overdue_orders: usize,
}

pub fn summarize(rolls: &[RawMaterialRoll], orders: &[Order], today: NaiveDate) -> Dashboard {
    let mut stock_width_by_material = BTreeMap::new();
    for r in rolls {
        *stock_width_by_material
            .entry(r.material_type.clone())
            .or_insert(0.0) += r.width;
    }
    let pending: Vec<&Order> = orders.iter().filter(|o| !o.is_fulfilled).collect();

    Dashboard {
        roll_count: rolls.len(),
        remnant_count: rolls.iter().filter(|r| r.is_remnant).count(),
        stock_weight_kg: rolls.iter().map(|r| r.weight).sum(),
        stock_width_by_material,
        pending_orders: pending.len(),
        fulfilled_orders: orders.len() - pending.len(),
        pending_width_mm: pending.iter().map(|o| o.required_width).sum(),
        overdue_orders: pending.iter().filter(|o| o.due_date < today).count(),
    }
}

impl std::fmt::Display for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Inventory:")?;
        writeln!(
            f,
            "  {} roll{} ({} remnant), {:.2}kg",
            self.roll_count,
            if self.roll_count == 1 { "" } else { "s" },
            self.remnant_count,
            self.stock_weight_kg
        )?;
        for (material, width) in &self.stock_width_by_material {
            writeln!(f, "  {material}: {width}mm")?;
        }
        writeln!(f, "Orders:")?;
        writeln!(
            f,
            "  {} pending ({}mm), {} fulfilled",
            self.pending_orders, self.pending_width_mm, self.fulfilled_orders
        )?;
        write!(f, "  {} overdue", self.overdue_orders)
    }
}
