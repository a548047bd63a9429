use serde::Serialize;

use crate::types::{Order, RawMaterialRoll};

/// Rolls and orders eligible for one planning attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidates {
    pub rolls: Vec<RawMaterialRoll>,
    pub orders: Vec<Order>,
}

impl Candidates {
    pub fn roll(&self, roll_id: &str) -> Option<&RawMaterialRoll> {
        self.rolls.iter().find(|r| r.id == roll_id)
    }
}

/// Rolls with stock left (optionally of one material type) and every order
/// not yet fulfilled. Never fails; empty sets are a valid answer.
pub fn select_candidates(
    rolls: &[RawMaterialRoll],
    orders: &[Order],
    material_type: Option<&str>,
) -> Candidates {
    let rolls = rolls
        .iter()
        .filter(|r| r.has_stock())
        .filter(|r| material_type.is_none_or(|m| r.material_type == m))
        .cloned()
        .collect();
    let orders = orders.iter().filter(|o| !o.is_fulfilled).cloned().collect();
    Candidates { rolls, orders }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn test_filters_by_material() {
        let c = select_candidates(&seed::inventory(), &seed::orders(), Some("PVC-A"));
        let ids: Vec<&str> = c.rolls.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["RM-001", "RM-002"]);
        assert_eq!(c.orders.len(), 5);
    }

    #[test]
    fn test_no_material_keeps_all_stock() {
        let c = select_candidates(&seed::inventory(), &seed::orders(), None);
        assert_eq!(c.rolls.len(), 4);
    }

    #[test]
    fn test_unknown_material_yields_empty_set() {
        let c = select_candidates(&seed::inventory(), &seed::orders(), Some("STEEL"));
        assert!(c.rolls.is_empty());
        assert_eq!(c.orders.len(), 5);
    }

    #[test]
    fn test_fulfilled_orders_and_empty_rolls_dropped() {
        let mut rolls = seed::inventory();
        rolls[0].weight = 0.0;
        let mut orders = seed::orders();
        orders[1].is_fulfilled = true;

        let c = select_candidates(&rolls, &orders, None);
        assert!(c.roll("RM-001").is_none());
        assert!(c.orders.iter().all(|o| o.id != "ORD-102"));
        assert_eq!(c.orders.len(), 4);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let rolls = seed::inventory();
        let orders = seed::orders();
        let first = select_candidates(&rolls, &orders, Some("PVC-A"));
        let second = select_candidates(&rolls, &orders, Some("PVC-A"));
        assert_eq!(first, second);

        let again = select_candidates(&first.rolls, &first.orders, Some("PVC-A"));
        assert_eq!(first, again);
    }
}
