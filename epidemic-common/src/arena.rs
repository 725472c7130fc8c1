use serde::{Deserialize, Serialize};

use crate::vecmath::Vec2;

/// Width of the rectangular domain in world units.
pub const ARENA_WIDTH: f64 = 1000.0;
/// Height of the rectangular domain in world units.
pub const ARENA_HEIGHT: f64 = 500.0;

/// The rectangular domain bounding particle motion, centered at the origin.
///
/// Walls sit at `x = ±half_width` and `y = ±half_height`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub half_width: f64,
    pub half_height: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Arena {
            half_width: ARENA_WIDTH / 2.0,
            half_height: ARENA_HEIGHT / 2.0,
        }
    }
}

impl Arena {
    pub fn left(&self) -> f64 {
        -self.half_width
    }

    pub fn right(&self) -> f64 {
        self.half_width
    }

    pub fn bottom(&self) -> f64 {
        -self.half_height
    }

    pub fn top(&self) -> f64 {
        self.half_height
    }

    /// True if a disk of radius `r` centered at `pos` lies fully inside the
    /// walls, within tolerance `eps`.
    pub fn contains(&self, pos: Vec2, r: f64, eps: f64) -> bool {
        pos.x.abs() <= self.half_width - r + eps && pos.y.abs() <= self.half_height - r + eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_geometry() {
        let arena = Arena::default();
        assert_eq!(arena.left(), -500.0);
        assert_eq!(arena.right(), 500.0);
        assert_eq!(arena.bottom(), -250.0);
        assert_eq!(arena.top(), 250.0);
    }

    #[test]
    fn containment_accounts_for_radius() {
        let arena = Arena::default();
        assert!(arena.contains(Vec2::new(492.0, 0.0), 8.0, 1e-6));
        assert!(!arena.contains(Vec2::new(493.0, 0.0), 8.0, 1e-6));
    }
}
