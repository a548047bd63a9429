use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::PlanError;
use crate::types::{Constraints, OptimizationPlan, Order, RawMaterialRoll};

pub const DEFAULT_REMNANT_THRESHOLD_MM: f64 = 100.0;

/// Relative slack when comparing widths carried by a plan with the roll.
const WIDTH_TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= WIDTH_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// The roll a plan was made for is still the one on the shelf.
fn same_roll(planned: &RawMaterialRoll, current: &RawMaterialRoll) -> bool {
    planned.id == current.id
        && planned.batch_number == current.batch_number
        && planned.material_type == current.material_type
        && planned.is_remnant == current.is_remnant
        && close(planned.width, current.width)
        && close(planned.weight, current.weight)
}

/// What an executed plan changed, for the operator's result message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub fulfilled_order_ids: Vec<String>,
    pub consumed_roll_id: String,
    pub consumed_batch: String,
    pub remnant: Option<RawMaterialRoll>,
}

impl ExecutionSummary {
    pub fn remnant_created(&self) -> bool {
        self.remnant.is_some()
    }
}

impl std::fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.fulfilled_order_ids.len();
        writeln!(
            f,
            "- {} order{} marked as done.",
            n,
            if n == 1 { "" } else { "s" }
        )?;
        write!(f, "- Roll {} removed from stock.", self.consumed_batch)?;
        if let Some(rem) = &self.remnant {
            write!(
                f,
                "\n(Created 1 remnant roll: {}, {}mm / {}kg)",
                rem.batch_number, rem.width, rem.weight
            )?;
        }
        Ok(())
    }
}

/// New snapshots of both collections plus the summary. The inputs are never
/// modified; the caller swaps these in and persists them.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub inventory: Vec<RawMaterialRoll>,
    pub orders: Vec<Order>,
    pub summary: ExecutionSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanExecutor {
    remnant_threshold_mm: f64,
    constraints: Constraints,
}

impl Default for PlanExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_REMNANT_THRESHOLD_MM)
    }
}

impl PlanExecutor {
    pub fn new(remnant_threshold_mm: f64) -> Self {
        assert!(
            remnant_threshold_mm.is_finite() && remnant_threshold_mm >= 0.0,
            "remnant threshold must be finite and non-negative, got {remnant_threshold_mm}"
        );
        Self {
            remnant_threshold_mm,
            constraints: Constraints::default(),
        }
    }

    /// Kerf and trim used to re-derive a plan's waste; must match the planner's.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn remnant_threshold(&self) -> f64 {
        self.remnant_threshold_mm
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    /// Waste left on `roll` by the plan's cuts, after checking the plan's own
    /// figures agree with it.
    fn waste_on(&self, plan: &OptimizationPlan, roll: &RawMaterialRoll) -> Result<f64, PlanError> {
        let inconsistent = |reason: String| PlanError::InconsistentPlan {
            roll_id: roll.id.clone(),
            reason,
        };
        let usable = self.constraints.usable_width(roll.width);
        let used = self
            .constraints
            .consumed_width(plan.cuts.iter().map(|o| o.required_width));
        if plan.cuts.is_empty() || plan.cuts.len() != plan.strips.len() {
            return Err(inconsistent(format!(
                "{} cuts but {} strips",
                plan.cuts.len(),
                plan.strips.len()
            )));
        }
        let waste = usable - used;
        if waste < 0.0 && !close(used, usable) {
            return Err(inconsistent(format!(
                "cuts need {used}mm of {usable}mm usable"
            )));
        }
        if !close(plan.used_width, used) || !close(plan.waste_width, waste) {
            return Err(inconsistent(format!(
                "plan reports {}mm used and {}mm waste, roll gives {used}mm and {waste}mm",
                plan.used_width, plan.waste_width
            )));
        }
        Ok(waste.max(0.0))
    }

    pub fn keeps_remnant(&self, waste_width: f64) -> bool {
        waste_width > self.remnant_threshold_mm
    }

    /// Text the operator confirms before `execute` is called.
    pub fn preview(&self, plan: &OptimizationPlan) -> String {
        let ids: Vec<&str> = plan.order_ids().collect();
        let mut text = format!(
            "Confirm production execution? This will:\n1. Mark {} order{} as fulfilled ({})\n2. Remove roll {} from inventory",
            ids.len(),
            if ids.len() == 1 { "" } else { "s" },
            ids.join(", "),
            plan.selected_roll.batch_number,
        );
        if self.keeps_remnant(plan.waste_width) {
            text.push_str(&format!(
                "\n3. Return a {}mm remnant roll to inventory",
                plan.waste_width
            ));
        } else {
            text.push_str(&format!("\n3. Scrap {}mm of waste", plan.waste_width));
        }
        text
    }

    /// Applies `plan` to the given snapshots, all or nothing.
    ///
    /// Fails with `ExecutionConflict` when the source roll is gone or differs
    /// from the plan's snapshot; a second execution of the same plan sees the
    /// former. Waste and any remnant come from the inventory record, and a plan
    /// whose figures disagree with that record is `InconsistentPlan`.
    pub fn execute(
        &self,
        plan: &OptimizationPlan,
        inventory: &[RawMaterialRoll],
        orders: &[Order],
    ) -> Result<Execution, PlanError> {
        let conflict = || PlanError::ExecutionConflict {
            roll_id: plan.roll_id.clone(),
        };
        let Some(source) = inventory.iter().find(|r| r.id == plan.roll_id) else {
            warn!(roll = %plan.roll_id, "source roll missing at execution");
            return Err(conflict());
        };
        if !same_roll(&plan.selected_roll, source) {
            warn!(
                roll = %plan.roll_id,
                planned_width = plan.selected_roll.width,
                width = source.width,
                "source roll changed since planning"
            );
            return Err(conflict());
        }
        let waste_width = self.waste_on(plan, source)?;

        let wanted: HashSet<&str> = plan.order_ids().collect();
        let mut fulfilled_order_ids = Vec::with_capacity(wanted.len());
        let orders: Vec<Order> = orders
            .iter()
            .map(|o| {
                if !wanted.contains(o.id.as_str()) {
                    return o.clone();
                }
                if o.is_fulfilled {
                    warn!(order = %o.id, "order already fulfilled");
                } else {
                    fulfilled_order_ids.push(o.id.clone());
                }
                Order {
                    is_fulfilled: true,
                    ..o.clone()
                }
            })
            .collect();
        for id in plan.order_ids() {
            if !orders.iter().any(|o| o.id == id) {
                warn!(order = %id, "planned order not in order book");
            }
        }

        let mut inventory: Vec<RawMaterialRoll> = inventory
            .iter()
            .filter(|r| r.id != plan.roll_id)
            .cloned()
            .collect();

        let remnant = if self.keeps_remnant(waste_width) {
            let rem = source.remnant(waste_width);
            inventory.push(rem.clone());
            Some(rem)
        } else {
            None
        };

        let summary = ExecutionSummary {
            fulfilled_order_ids,
            consumed_roll_id: plan.roll_id.clone(),
            consumed_batch: source.batch_number.clone(),
            remnant,
        };
        info!(
            roll = %summary.consumed_roll_id,
            fulfilled = summary.fulfilled_order_ids.len(),
            remnant = summary.remnant.as_ref().map(|r| r.id.as_str()).unwrap_or("none"),
            "plan executed"
        );
        Ok(Execution {
            inventory,
            orders,
            summary,
        })
    }
}
