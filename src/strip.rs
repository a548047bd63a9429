use crate::types::{Constraints, Order, Strip};

/// Lays strips across a roll from the left trim edge, one kerf between
/// neighbours.
#[derive(Debug, Clone)]
pub struct StripLayout {
    origin: f64,
    kerf: f64,
    usable: f64,
    pub strips: Vec<Strip>,
}

impl StripLayout {
    pub fn new(constraints: Constraints, roll_width: f64) -> Self {
        Self {
            origin: constraints.trim_margin_mm,
            kerf: constraints.kerf_mm,
            usable: constraints.usable_width(roll_width),
            strips: Vec::new(),
        }
    }

    /// Width consumed so far: strips plus the kerfs between them.
    pub fn used_width(&self) -> f64 {
        match (self.strips.first(), self.strips.last()) {
            (Some(first), Some(last)) => last.end - first.start,
            _ => 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.usable - self.used_width()
    }

    /// Room needed to add a strip of `width`, including the separating kerf.
    fn required(&self, width: f64) -> f64 {
        if self.strips.is_empty() {
            width
        } else {
            width + self.kerf
        }
    }

    pub fn fits(&self, width: f64) -> bool {
        self.required(width) <= self.remaining() + 1e-9
    }

    pub fn place(&mut self, order: &Order) -> Strip {
        let start = match self.strips.last() {
            Some(prev) => prev.end + self.kerf,
            None => self.origin,
        };
        let strip = Strip {
            order_id: order.id.clone(),
            start,
            end: start + order.required_width,
        };
        self.strips.push(strip.clone());
        strip
    }

    /// Internal separating cuts: the right edge of every strip except the last.
    pub fn blade_positions(&self) -> Vec<f64> {
        let n = self.strips.len().saturating_sub(1);
        self.strips[..n].iter().map(|s| s.end).collect()
    }
}
