//! Attrition - combat efficiency decays with distance from the home edge.

use crate::components::Faction;
use crate::config::AttritionConfig;
use crate::lanes::LaneLayout;

/// Supply-line efficiency factor for a unit at along-axis position `x`.
///
/// `max(floor, 1 − decay_rate × distance_from_home / width)`. Static units
/// always report 1.0.
pub fn efficiency(
    layout: &LaneLayout,
    attrition: &AttritionConfig,
    faction: Faction,
    x: f32,
    is_static: bool,
) -> f32 {
    if is_static {
        return 1.0;
    }
    let distance = layout.distance_from_home(faction, x);
    let factor = 1.0 - attrition.decay_rate * (distance / layout.width);
    factor.max(attrition.floor)
}
