use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::dashboard::{self, Dashboard};
use crate::error::PlanError;
use crate::executor::{ExecutionSummary, PlanExecutor};
use crate::filter::{Candidates, select_candidates};
use crate::seed;
use crate::solver::Planner;
use crate::store::{self, Inventory, OrderBook, Storage, ThemeMode};
use crate::types::{OptimizationPlan, Order, RawMaterialRoll, validate_dimension};

/// Result of a state change. `persisted` is false when the in-memory state
/// changed but mirroring it to storage failed; the change is kept either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Committed<T> {
    pub value: T,
    pub persisted: bool,
}

/// Owns the single writable copy of inventory and orders.
///
/// Every mutation builds new snapshots, swaps them in, then mirrors both
/// collections to storage. Callers sharing a workshop between operators must
/// hold it behind one lock so that an execution is a single critical section.
pub struct Workshop {
    storage: Storage,
    inventory: Inventory,
    order_book: OrderBook,
    rolls: Vec<RawMaterialRoll>,
    orders: Vec<Order>,
    planner: Planner,
    executor: PlanExecutor,
}

impl Workshop {
    /// The executor re-derives waste with the planner's constraints.
    pub fn open(storage: Storage, planner: Planner, executor: PlanExecutor) -> Self {
        let executor = executor.with_constraints(planner.constraints());
        let inventory = Inventory::new(storage.clone());
        let order_book = OrderBook::new(storage.clone());
        let rolls = inventory.list();
        let orders = order_book.list();
        info!(rolls = rolls.len(), orders = orders.len(), "workshop loaded");
        Self {
            storage,
            inventory,
            order_book,
            rolls,
            orders,
            planner,
            executor,
        }
    }

    pub fn rolls(&self) -> &[RawMaterialRoll] {
        &self.rolls
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn pending_orders(&self) -> Vec<&Order> {
        self.orders.iter().filter(|o| !o.is_fulfilled).collect()
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    fn commit(&mut self, rolls: Vec<RawMaterialRoll>, orders: Vec<Order>) -> bool {
        self.rolls = rolls;
        self.orders = orders;
        let mut persisted = true;
        if let Err(e) = self.inventory.replace_all(&self.rolls) {
            error!(error = %e, "inventory not persisted");
            persisted = false;
        }
        if let Err(e) = self.order_book.replace_all(&self.orders) {
            error!(error = %e, "orders not persisted");
            persisted = false;
        }
        persisted
    }

    /// Replaces everything with the demo data set.
    pub fn seed(&mut self) -> bool {
        self.commit(seed::inventory(), seed::orders())
    }

    pub fn candidates(&self, material_type: Option<&str>) -> Candidates {
        select_candidates(&self.rolls, &self.orders, material_type)
    }

    /// Plans the given roll, or the best eligible roll when none is named.
    pub fn plan(
        &self,
        roll_id: Option<&str>,
        material_type: Option<&str>,
    ) -> Result<OptimizationPlan, PlanError> {
        match roll_id {
            Some(id) => self
                .planner
                .plan_for_roll(&self.candidates(material_type), id),
            None => self.plan_best(material_type),
        }
    }

    /// Plans every eligible roll and keeps the most efficient, ties to less
    /// waste.
    pub fn plan_best(&self, material_type: Option<&str>) -> Result<OptimizationPlan, PlanError> {
        let candidates = self.candidates(material_type);
        if candidates.rolls.is_empty() {
            return Err(PlanError::NoCandidateRoll);
        }

        let mut best: Option<OptimizationPlan> = None;
        let mut last_err = PlanError::NoCandidateRoll;
        for roll in &candidates.rolls {
            match self.planner.plan(roll, &candidates.orders) {
                Ok(plan) => {
                    let better = best.as_ref().is_none_or(|b| {
                        plan.efficiency > b.efficiency + 1e-9
                            || ((plan.efficiency - b.efficiency).abs() <= 1e-9
                                && plan.waste_width < b.waste_width)
                    });
                    if better {
                        best = Some(plan);
                    }
                }
                Err(e) => {
                    debug!(roll = %roll.id, error = %e, "roll skipped");
                    last_err = e;
                }
            }
        }
        best.ok_or(last_err)
    }

    pub fn preview(&self, plan: &OptimizationPlan) -> String {
        self.executor.preview(plan)
    }

    /// Commits an operator-confirmed plan.
    pub fn execute(
        &mut self,
        plan: &OptimizationPlan,
    ) -> Result<Committed<ExecutionSummary>, PlanError> {
        let execution = self.executor.execute(plan, &self.rolls, &self.orders)?;
        let persisted = self.commit(execution.inventory, execution.orders);
        Ok(Committed {
            value: execution.summary,
            persisted,
        })
    }

    pub fn add_roll(
        &mut self,
        roll: RawMaterialRoll,
    ) -> Result<Committed<RawMaterialRoll>, PlanError> {
        validate_dimension("width", roll.width)?;
        validate_dimension("weight", roll.weight)?;
        if self.rolls.iter().any(|r| r.id == roll.id) {
            return Err(PlanError::DuplicateId(roll.id));
        }
        let mut rolls = self.rolls.clone();
        rolls.push(roll.clone());
        let orders = self.orders.clone();
        info!(roll = %roll.id, batch = %roll.batch_number, "roll added");
        let persisted = self.commit(rolls, orders);
        Ok(Committed {
            value: roll,
            persisted,
        })
    }

    pub fn update_roll(
        &mut self,
        id: &str,
        width: f64,
        weight: f64,
    ) -> Result<Committed<RawMaterialRoll>, PlanError> {
        let width = validate_dimension("width", width)?;
        let weight = validate_dimension("weight", weight)?;
        let mut rolls = self.rolls.clone();
        let roll = rolls
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PlanError::RollNotFound(id.to_string()))?;
        roll.width = width;
        roll.weight = weight;
        let updated = roll.clone();
        let orders = self.orders.clone();
        let persisted = self.commit(rolls, orders);
        Ok(Committed {
            value: updated,
            persisted,
        })
    }

    pub fn remove_roll(&mut self, id: &str) -> Result<Committed<RawMaterialRoll>, PlanError> {
        let removed = self
            .rolls
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlanError::RollNotFound(id.to_string()))?;
        let rolls = self.rolls.iter().filter(|r| r.id != id).cloned().collect();
        let orders = self.orders.clone();
        info!(roll = %id, "roll removed");
        let persisted = self.commit(rolls, orders);
        Ok(Committed {
            value: removed,
            persisted,
        })
    }

    /// Rolls whose width or weight contains `query` as text. A blank query
    /// matches everything.
    pub fn search_rolls(&self, query: &str) -> Vec<&RawMaterialRoll> {
        let q = query.trim();
        self.rolls
            .iter()
            .filter(|r| {
                q.is_empty() || r.width.to_string().contains(q) || r.weight.to_string().contains(q)
            })
            .collect()
    }

    pub fn add_order(&mut self, order: Order) -> Result<Committed<Order>, PlanError> {
        validate_dimension("required width", order.required_width)?;
        validate_dimension("target weight", order.target_weight)?;
        if self.orders.iter().any(|o| o.id == order.id) {
            return Err(PlanError::DuplicateId(order.id));
        }
        let mut orders = self.orders.clone();
        orders.push(order.clone());
        let rolls = self.rolls.clone();
        info!(order = %order.id, customer = %order.customer_name, "order added");
        let persisted = self.commit(rolls, orders);
        Ok(Committed {
            value: order,
            persisted,
        })
    }

    pub fn dashboard(&self, today: NaiveDate) -> Dashboard {
        dashboard::summarize(&self.rolls, &self.orders, today)
    }

    pub fn theme(&self) -> ThemeMode {
        store::load_theme(&self.storage)
    }

    pub fn set_theme(&self, theme: ThemeMode) -> Committed<ThemeMode> {
        let persisted = store::save_theme(&self.storage, theme).is_ok();
        Committed {
            value: theme,
            persisted,
        }
    }
}
