//! ECS systems for the Entropy War simulation.
//!
//! Systems contain the game logic that operates on components. They all run
//! in one chained schedule built by [`clock::build_tick_schedule`]:
//!
//! **Tick boundary**
//! - `director_system` - AI spawn decisions, queued as commands
//! - `apply_spawn_queue_system` - executes queued spawns
//!
//! **Physics**
//! - `network_zone_system` - rebuilds network zones, sets membership
//! - `collision_system` - mass-share separation
//! - `confinement_system` - lane funnel
//!
//! **Per-unit update**
//! - `unit_update_system` - flanking, targeting, combat, movement, collection
//!
//! **Bookkeeping**
//! - `apply_intents_system` - wreckage spawns, credits, strongpoint losses
//! - `economy_trickle_system` - passive income
//! - `compact_system` - removes dead units and collected wreckage
//! - `outcome_system` - dominance score

pub mod ai;
pub mod attrition;
pub mod clock;
pub mod combat;
pub mod economy;
pub mod movement;
pub mod network;
pub mod outcome;
pub mod physics;
pub mod serialization;

pub use ai::*;
pub use attrition::*;
pub use clock::*;
pub use combat::*;
pub use economy::*;
pub use movement::*;
pub use network::*;
pub use outcome::*;
pub use physics::*;
pub use serialization::*;
