//! Battlefield geometry: lanes, funnel width and home edges.
//!
//! The map is a `width × height` rectangle. Lanes run along the x axis and
//! are stacked across y in equal bands. The player's home edge is x = 0,
//! the enemy's is x = width.

use crate::components::Faction;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Shape of a lane's ideal cross-axis line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaneShape {
    /// Every lane follows its band's center line.
    Straight,
    /// Non-center lanes bow outward toward the midfield by `bulge` units.
    Curved { bulge: f32 },
}

impl Default for LaneShape {
    fn default() -> Self {
        Self::Straight
    }
}

/// Map dimensions and lane layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneLayout {
    pub width: f32,
    pub height: f32,
    pub lane_count: usize,
    pub shape: LaneShape,
    /// Gap kept between a lane's widest spread and its band edge.
    pub funnel_margin: f32,
    /// Fraction of the full spread left at the map's lateral extremes.
    pub funnel_min_fraction: f32,
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            lane_count: 3,
            shape: LaneShape::Straight,
            funnel_margin: 10.0,
            funnel_min_fraction: 0.2,
        }
    }
}

impl LaneLayout {
    pub fn lane_height(&self) -> f32 {
        self.height / self.lane_count.max(1) as f32
    }

    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }

    /// Center line of a lane's band.
    pub fn lane_center_y(&self, lane: usize) -> f32 {
        let h = self.lane_height();
        lane as f32 * h + h / 2.0
    }

    /// Lane whose band contains `y`, clamped to the valid range.
    pub fn lane_at(&self, y: f32) -> usize {
        let idx = (y / self.lane_height()).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.lane_count.saturating_sub(1))
        }
    }

    /// Ideal cross-axis position for a unit in `lane` at along-axis `x`.
    pub fn ideal_y(&self, lane: usize, x: f32) -> f32 {
        let center = self.lane_center_y(lane);
        match self.shape {
            LaneShape::Straight => center,
            LaneShape::Curved { bulge } => {
                let mid = (self.lane_count as f32 - 1.0) / 2.0;
                let offset = lane as f32 - mid;
                if offset.abs() < f32::EPSILON {
                    return center;
                }
                let t = (x / self.width).clamp(0.0, 1.0);
                center + offset.signum() * bulge * (PI * t).sin()
            }
        }
    }

    /// Allowed lateral deviation from the ideal line at `x`.
    ///
    /// Widest at the midpoint between the home bases, narrowing to
    /// `funnel_min_fraction` of that at either edge.
    pub fn lateral_spread(&self, x: f32) -> f32 {
        let base = (self.lane_height() / 2.0 - self.funnel_margin).max(0.0);
        let half = self.center_x();
        let ratio = if half > 0.0 {
            ((x - half).abs() / half).min(1.0)
        } else {
            0.0
        };
        let min_frac = self.funnel_min_fraction;
        base * (min_frac + (1.0 - min_frac) * (1.0 - ratio))
    }

    /// Distance from the faction's home edge measured along its advance axis.
    pub fn distance_from_home(&self, faction: Faction, x: f32) -> f32 {
        let d = match faction {
            Faction::Player => x,
            Faction::Enemy => self.width - x,
        };
        d.max(0.0)
    }

    /// Mirror an x coordinate measured from the player's edge onto the
    /// faction's own side.
    pub fn from_home(&self, faction: Faction, offset: f32) -> f32 {
        match faction {
            Faction::Player => offset,
            Faction::Enemy => self.width - offset,
        }
    }
}
