use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::filter::Candidates;
use crate::strip::StripLayout;
use crate::types::{Constraints, OptimizationPlan, Order, PlanMode, RawMaterialRoll};

pub const DEFAULT_GRID_MM: f64 = 1.0;
pub const DEFAULT_MAX_SEARCH_CELLS: usize = 4_000_000;

const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillOrder {
    WidestFirst,
    EarliestDueFirst,
}

/// Ranks subsets: more consumed width, then the earlier minimum due date,
/// then more orders.
#[derive(Debug, Clone, Copy)]
struct Score {
    consumed: f64,
    earliest_due: Option<NaiveDate>,
    count: usize,
}

impl Score {
    fn beats(&self, other: &Score) -> bool {
        if (self.consumed - other.consumed).abs() > EPS {
            return self.consumed > other.consumed;
        }
        match (self.earliest_due, other.earliest_due) {
            (Some(a), Some(b)) if a != b => return a < b,
            (Some(_), None) => return true,
            (None, Some(_)) => return false,
            _ => {}
        }
        self.count > other.count
    }
}

fn units_ceil(value: f64, grid: f64) -> usize {
    (value / grid - EPS).ceil().max(0.0) as usize
}

/// Chooses which pending orders to slit from a single roll.
///
/// Exact mode runs a 0/1 subset-sum over an integer grid of the usable
/// width. Order widths and the kerf are rounded up to the grid and the usable
/// width down, so every grid-feasible subset is physically feasible.
pub struct Planner {
    constraints: Constraints,
    mode: PlanMode,
    grid_mm: f64,
    max_search_cells: usize,
}

impl Planner {
    pub fn new(constraints: Constraints) -> Self {
        Self {
            constraints,
            mode: PlanMode::Exact,
            grid_mm: DEFAULT_GRID_MM,
            max_search_cells: DEFAULT_MAX_SEARCH_CELLS,
        }
    }

    pub fn with_mode(mut self, mode: PlanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_grid(mut self, grid_mm: f64) -> Self {
        assert!(
            grid_mm.is_finite() && grid_mm > 0.0,
            "grid must be a positive width, got {grid_mm}"
        );
        self.grid_mm = grid_mm;
        self
    }

    /// Upper bound on `orders × grid cells` explored by the exact search.
    /// Larger problems fall back to the approximate mode.
    pub fn with_search_budget(mut self, max_cells: usize) -> Self {
        self.max_search_cells = max_cells;
        self
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    pub fn mode(&self) -> PlanMode {
        self.mode
    }

    /// Plans one eligible roll against the eligible order pool.
    pub fn plan_for_roll(
        &self,
        candidates: &Candidates,
        roll_id: &str,
    ) -> Result<OptimizationPlan, PlanError> {
        let roll = candidates.roll(roll_id).ok_or(PlanError::NoCandidateRoll)?;
        self.plan(roll, &candidates.orders)
    }

    pub fn plan(
        &self,
        roll: &RawMaterialRoll,
        orders: &[Order],
    ) -> Result<OptimizationPlan, PlanError> {
        let usable = self.constraints.usable_width(roll.width);
        let infeasible = || PlanError::NoFeasiblePlan {
            roll_id: roll.id.clone(),
            usable_width: usable,
        };

        let mut pool: Vec<&Order> = orders
            .iter()
            .filter(|o| !o.is_fulfilled && o.required_width <= usable + EPS)
            .collect();
        if pool.is_empty() {
            debug!(roll = %roll.id, usable, "no order narrower than usable width");
            return Err(infeasible());
        }
        pool.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));

        // Greedy phase gives an incumbent; exact search replaces it unless the
        // grid rounding made it lose real width.
        let greedy = self.greedy_best(&pool, roll.width);
        let (selection, mode) = match self.mode {
            PlanMode::Approximate => (greedy, PlanMode::Approximate),
            PlanMode::Exact => match self.subset_sum(&pool, usable) {
                Some(exact) if !self.score(&pool, &greedy).beats(&self.score(&pool, &exact)) => {
                    (exact, PlanMode::Exact)
                }
                Some(_) => (greedy, PlanMode::Exact),
                None => {
                    warn!(
                        roll = %roll.id,
                        orders = pool.len(),
                        budget = self.max_search_cells,
                        "exact search over budget, using approximate plan"
                    );
                    (greedy, PlanMode::Approximate)
                }
            },
        };

        if selection.is_empty() {
            return Err(infeasible());
        }
        Ok(self.build_plan(roll, &pool, selection, mode))
    }

    fn score(&self, pool: &[&Order], selection: &[usize]) -> Score {
        Score {
            consumed: self
                .constraints
                .consumed_width(selection.iter().map(|&i| pool[i].required_width)),
            earliest_due: selection.iter().map(|&i| pool[i].due_date).min(),
            count: selection.len(),
        }
    }

    fn greedy_best(&self, pool: &[&Order], roll_width: f64) -> Vec<usize> {
        let strategies = [FillOrder::WidestFirst, FillOrder::EarliestDueFirst];

        let mut best: Vec<usize> = Vec::new();
        for &strategy in &strategies {
            let sel = self.greedy_solve(pool, roll_width, strategy);
            if self.score(pool, &sel).beats(&self.score(pool, &best)) {
                best = sel;
            }
        }
        best
    }

    fn greedy_solve(&self, pool: &[&Order], roll_width: f64, strategy: FillOrder) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..pool.len()).collect();
        if strategy == FillOrder::WidestFirst {
            // Stable, so equal widths keep due-date order
            indices.sort_by(|&a, &b| pool[b].required_width.total_cmp(&pool[a].required_width));
        }

        let mut layout = StripLayout::new(self.constraints, roll_width);
        let mut chosen = Vec::new();
        for i in indices {
            if layout.fits(pool[i].required_width) {
                layout.place(pool[i]);
                chosen.push(i);
            }
        }
        chosen
    }

    /// Exact selection, or `None` when the grid exceeds the search budget.
    ///
    /// Each order weighs `width + kerf` against a capacity of `usable + kerf`,
    /// which charges the kerf once per adjacent pair. `pool` must be sorted by
    /// due date so the earliest due date of a subset is fixed by its first item.
    fn subset_sum(&self, pool: &[&Order], usable: f64) -> Option<Vec<usize>> {
        let grid = self.grid_mm;
        let kerf_units = (self.constraints.kerf_mm / grid - EPS).ceil().max(0.0);
        let usable_units = (usable / grid + EPS).floor().max(0.0);
        // Sized in f64 first; wide rolls on a fine grid would overflow usize.
        let cells = pool.len() as f64 * (usable_units + kerf_units + 1.0);
        if cells > self.max_search_cells as f64 {
            return None;
        }
        let kerf = kerf_units as usize;
        let capacity = usable_units as usize + kerf;
        let weights: Vec<usize> = pool
            .iter()
            .map(|o| units_ceil(o.required_width, grid).saturating_add(kerf))
            .collect();
        debug!(orders = pool.len(), capacity, cells, "subset-sum search");

        let mut best: Vec<Option<Score>> = vec![None; capacity + 1];
        best[0] = Some(Score {
            consumed: 0.0,
            earliest_due: None,
            count: 0,
        });
        let mut took = vec![vec![false; capacity + 1]; pool.len()];

        for (i, order) in pool.iter().enumerate() {
            let w = weights[i];
            if w == 0 || w > capacity {
                continue;
            }
            // Descending so each order is taken at most once
            for s in (w..=capacity).rev() {
                let Some(prev) = best[s - w] else {
                    continue;
                };
                let candidate = Score {
                    consumed: s as f64,
                    earliest_due: prev.earliest_due.or(Some(order.due_date)),
                    count: prev.count + 1,
                };
                let replace = match &best[s] {
                    None => true,
                    Some(current) => candidate.beats(current),
                };
                if replace {
                    best[s] = Some(candidate);
                    took[i][s] = true;
                }
            }
        }

        let Some(mut s) = (1..=capacity).rev().find(|&s| best[s].is_some()) else {
            return Some(Vec::new());
        };
        let mut selection = Vec::new();
        for i in (0..pool.len()).rev() {
            if took[i][s] {
                selection.push(i);
                s -= weights[i];
            }
        }
        selection.reverse();
        Some(selection)
    }

    fn build_plan(
        &self,
        roll: &RawMaterialRoll,
        pool: &[&Order],
        mut selection: Vec<usize>,
        mode: PlanMode,
    ) -> OptimizationPlan {
        // Physical order does not change utilization; lay out by due date.
        selection.sort_unstable();
        let cuts: Vec<Order> = selection.iter().map(|&i| pool[i].clone()).collect();

        let mut layout = StripLayout::new(self.constraints, roll.width);
        for order in &cuts {
            layout.place(order);
        }

        let usable_width = self.constraints.usable_width(roll.width);
        let used_width = layout.used_width();
        let plan = OptimizationPlan {
            roll_id: roll.id.clone(),
            selected_roll: roll.clone(),
            blade_positions: layout.blade_positions(),
            strips: layout.strips,
            cuts,
            waste_width: usable_width - used_width,
            used_width,
            usable_width,
            efficiency: used_width / roll.width * 100.0,
            mode,
        };
        info!(
            roll = %plan.roll_id,
            cuts = plan.cuts.len(),
            used = plan.used_width,
            waste = plan.waste_width,
            efficiency = plan.efficiency,
            mode = %plan.mode,
            "plan computed"
        );
        plan
    }
}
