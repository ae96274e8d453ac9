use crate::geom::EPS;
use serde::{Deserialize, Serialize};

/// Direction vector. Analysis points without an explicit direction face up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn up() -> Self {
        Self::new(0., 0., 1.)
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.dz - other.dz).abs() < EPS
    }
}

impl From<[f64; 3]> for Vector {
    fn from([dx, dy, dz]: [f64; 3]) -> Self {
        Self::new(dx, dy, dz)
    }
}
