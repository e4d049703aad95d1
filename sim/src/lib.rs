//! Entropy War - Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of a lane-based skirmish:
//! squads advance along lanes, lose combat power with distance from home,
//! draw bonuses from strongpoint networks and leave wreckage that feeds the
//! economy. Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod lanes;
pub mod render_bridge;
pub mod spatial;
pub mod store;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{load_sim_config_from_env, read_sim_config_from_file, ConfigError, SimConfig};
pub use lanes::{LaneLayout, LaneShape};
pub use spatial::SpatialGrid;
pub use store::{CommandError, Intent, SpawnCommand};
pub use systems::*;
pub use world::{Snapshot, UnitSnapshot, WreckageSnapshot, ZoneSnapshot};
