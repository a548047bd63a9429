use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanError;

pub const DEFAULT_KERF_MM: f64 = 2.0;
pub const DEFAULT_TRIM_MARGIN_MM: f64 = 10.0;

/// Physical parameters shared by every planning computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub kerf_mm: f64,
    pub trim_margin_mm: f64,
}

impl Constraints {
    /// Panics on a negative or non-finite value: that is a configuration bug,
    /// not a planning outcome.
    pub fn new(kerf_mm: f64, trim_margin_mm: f64) -> Self {
        assert!(
            kerf_mm.is_finite() && kerf_mm >= 0.0,
            "kerf must be finite and non-negative, got {kerf_mm}"
        );
        assert!(
            trim_margin_mm.is_finite() && trim_margin_mm >= 0.0,
            "trim margin must be finite and non-negative, got {trim_margin_mm}"
        );
        Self {
            kerf_mm,
            trim_margin_mm,
        }
    }

    pub fn usable_width(&self, roll_width: f64) -> f64 {
        roll_width - 2.0 * self.trim_margin_mm
    }

    /// Width taken by strips of the given widths laid side by side, one kerf
    /// between each adjacent pair.
    pub fn consumed_width<I: IntoIterator<Item = f64>>(&self, widths: I) -> f64 {
        let (sum, count) = widths
            .into_iter()
            .fold((0.0, 0usize), |(s, n), w| (s + w, n + 1));
        if count == 0 {
            return 0.0;
        }
        sum + self.kerf_mm * (count - 1) as f64
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self::new(DEFAULT_KERF_MM, DEFAULT_TRIM_MARGIN_MM)
    }
}

/// Rejects NaN, infinities, zero and negatives for a width or weight.
pub fn validate_dimension(field: &'static str, value: f64) -> Result<f64, PlanError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PlanError::InvalidInput { field, value })
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterialRoll {
    pub id: String,
    pub batch_number: String,
    /// mm
    pub width: f64,
    /// kg
    pub weight: f64,
    pub material_type: String,
    pub is_remnant: bool,
    pub entry_date: DateTime<Utc>,
}

impl RawMaterialRoll {
    /// New original-stock roll with a fresh id, stamped now.
    pub fn new(
        batch_number: impl Into<String>,
        width: f64,
        weight: f64,
        material_type: impl Into<String>,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            batch_number: batch_number.into(),
            width: validate_dimension("width", width)?,
            weight: validate_dimension("weight", weight)?,
            material_type: material_type.into(),
            is_remnant: false,
            entry_date: Utc::now(),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_stock(&self) -> bool {
        self.width > 0.0 && self.weight > 0.0
    }

    /// Leftover strip of `width` mm cut from this roll, weight prorated by width.
    pub fn remnant(&self, width: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            batch_number: format!("{}-REM", self.batch_number),
            width,
            weight: round2(self.weight * (width / self.width)),
            material_type: self.material_type.clone(),
            is_remnant: true,
            entry_date: Utc::now(),
        }
    }
}

impl std::fmt::Display for RawMaterialRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}mm / {}kg {}",
            self.batch_number, self.id, self.width, self.weight, self.material_type
        )?;
        if self.is_remnant {
            write!(f, " (remnant)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    /// mm
    pub required_width: f64,
    /// kg
    pub target_weight: f64,
    pub is_fulfilled: bool,
    pub due_date: NaiveDate,
}

impl Order {
    pub fn new(
        customer_name: impl Into<String>,
        required_width: f64,
        target_weight: f64,
        due_date: NaiveDate,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            required_width: validate_dimension("required width", required_width)?,
            target_weight: validate_dimension("target weight", target_weight)?,
            is_fulfilled: false,
            due_date,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}mm / {}kg due {}",
            self.id, self.customer_name, self.required_width, self.target_weight, self.due_date
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanMode {
    #[default]
    Exact,
    Approximate,
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanMode::Exact => write!(f, "exact"),
            PlanMode::Approximate => write!(f, "approximate"),
        }
    }
}

/// Span of one slit strip, offsets from the roll's left edge in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strip {
    pub order_id: String,
    pub start: f64,
    pub end: f64,
}

impl Strip {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Proposed slitting of one roll. Ephemeral until executed.
///
/// `blade_positions` holds only the internal separating cuts (the right edge
/// of every strip but the last), so it is always one shorter than `cuts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    pub roll_id: String,
    pub selected_roll: RawMaterialRoll,
    pub cuts: Vec<Order>,
    pub strips: Vec<Strip>,
    pub blade_positions: Vec<f64>,
    pub waste_width: f64,
    pub used_width: f64,
    pub usable_width: f64,
    pub efficiency: f64,
    pub mode: PlanMode,
}

impl OptimizationPlan {
    pub fn order_ids(&self) -> impl Iterator<Item = &str> {
        self.cuts.iter().map(|o| o.id.as_str())
    }
}

impl std::fmt::Display for OptimizationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "roll {}: {} cut{}, used {}mm, waste {}mm, {:.1}% efficiency ({})",
            self.selected_roll.batch_number,
            self.cuts.len(),
            if self.cuts.len() == 1 { "" } else { "s" },
            self.used_width,
            self.waste_width,
            self.efficiency,
            self.mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_usable_and_consumed() {
        let c = Constraints::new(2.0, 10.0);
        assert_eq!(c.usable_width(1200.0), 1180.0);
        assert_eq!(c.consumed_width([220.0, 310.0, 150.0, 220.0]), 906.0);
        assert_eq!(c.consumed_width([500.0]), 500.0);
        assert_eq!(c.consumed_width(std::iter::empty()), 0.0);
    }

    #[test]
    #[should_panic(expected = "trim margin")]
    fn test_negative_trim_margin_panics() {
        Constraints::new(2.0, -1.0);
    }

    #[test]
    fn test_roll_rejects_bad_dimensions() {
        assert!(RawMaterialRoll::new("B", 0.0, 10.0, "PVC-A").is_err());
        assert!(RawMaterialRoll::new("B", 100.0, f64::NAN, "PVC-A").is_err());
        assert!(RawMaterialRoll::new("B", f64::INFINITY, 10.0, "PVC-A").is_err());
        assert_eq!(
            RawMaterialRoll::new("B", -5.0, 10.0, "PVC-A"),
            Err(PlanError::InvalidInput {
                field: "width",
                value: -5.0
            })
        );
        let roll = RawMaterialRoll::new("B", 100.0, 10.0, "PVC-A").unwrap();
        assert!(!roll.is_remnant);
        assert!(roll.has_stock());
    }

    #[test]
    fn test_order_rejects_bad_dimensions() {
        let due = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        assert!(Order::new("Acme", 0.0, 10.0, due).is_err());
        assert!(Order::new("Acme", 10.0, -1.0, due).is_err());
        let order = Order::new("Acme", 220.0, 100.0, due).unwrap();
        assert!(!order.is_fulfilled);
    }

    #[test]
    fn test_remnant_prorates_weight() {
        let roll = RawMaterialRoll::new("BATCH-X99", 1200.0, 500.0, "PVC-A")
            .unwrap()
            .with_id("RM-001");
        let rem = roll.remnant(274.0);
        assert_eq!(rem.batch_number, "BATCH-X99-REM");
        assert_eq!(rem.weight, 114.17);
        assert_eq!(rem.width, 274.0);
        assert_eq!(rem.material_type, "PVC-A");
        assert!(rem.is_remnant);
        assert_ne!(rem.id, roll.id);
    }
}
