//! Simulation configuration: tunables, unit stat tables and the matchup matrix.
//!
//! Everything here is immutable once the simulation is built. Defaults live
//! in code; a JSON file can override any subset of fields (`#[serde(default)]`
//! everywhere). Set `EW_SIM_CONFIG_PATH` to load one at startup.

use crate::components::{Faction, UnitType};
use crate::lanes::LaneLayout;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

// ============================================================================
// UNIT TABLES
// ============================================================================

/// Baseline stats for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub hp: f32,
    pub damage: f32,
    pub range: f32,
    /// Max speed in world units per tick.
    pub speed: f32,
    pub radius: f32,
    pub mass: f32,
    /// Price of one squad.
    pub cost: f32,
    pub squad_size: u32,
    /// Melee-charge roles shove non-static targets on every hit.
    #[serde(default)]
    pub knockback: bool,
}

impl UnitStats {
    /// Share of the squad cost carried by a single unit.
    pub fn unit_cost(&self) -> f32 {
        self.cost / self.squad_size.max(1) as f32
    }
}

/// Immutable stat table keyed by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitCatalog {
    pub shield: UnitStats,
    pub crossbow: UnitStats,
    pub cavalry: UnitStats,
    pub strongpoint: UnitStats,
}

impl UnitCatalog {
    pub fn get(&self, unit_type: UnitType) -> &UnitStats {
        match unit_type {
            UnitType::Shield => &self.shield,
            UnitType::Crossbow => &self.crossbow,
            UnitType::Cavalry => &self.cavalry,
            UnitType::Strongpoint => &self.strongpoint,
        }
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self {
            shield: UnitStats {
                hp: 450.0,
                damage: 8.0,
                range: 45.0,
                speed: 0.6,
                radius: 18.0,
                mass: 25.0,
                cost: 100.0,
                squad_size: 3,
                knockback: false,
            },
            crossbow: UnitStats {
                hp: 100.0,
                damage: 40.0,
                range: 220.0,
                speed: 0.9,
                radius: 12.0,
                mass: 5.0,
                cost: 150.0,
                squad_size: 4,
                knockback: false,
            },
            cavalry: UnitStats {
                hp: 300.0,
                damage: 25.0,
                range: 35.0,
                speed: 2.8,
                radius: 16.0,
                mass: 15.0,
                cost: 200.0,
                squad_size: 2,
                knockback: true,
            },
            strongpoint: UnitStats {
                hp: 4000.0,
                damage: 80.0,
                range: 300.0,
                speed: 0.0,
                radius: 45.0,
                mass: 9999.0,
                cost: 0.0,
                squad_size: 1,
                knockback: false,
            },
        }
    }
}

/// Damage multiplier table, `rows[attacker][defender]`, indexed by
/// [`UnitType::index`]. Deliberately asymmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageMatrix {
    pub rows: [[f32; 4]; 4],
}

impl DamageMatrix {
    pub fn multiplier(&self, attacker: UnitType, defender: UnitType) -> f32 {
        self.rows[attacker.index()][defender.index()]
    }

    pub fn is_symmetric(&self) -> bool {
        (0..4).all(|a| (0..4).all(|d| self.rows[a][d] == self.rows[d][a]))
    }
}

impl Default for DamageMatrix {
    fn default() -> Self {
        // Columns: Shield, Crossbow, Cavalry, Strongpoint
        Self {
            rows: [
                [1.0, 1.5, 0.5, 0.2], // Shield
                [1.5, 1.0, 2.0, 1.0], // Crossbow
                [2.0, 1.0, 1.0, 0.4], // Cavalry
                [1.0, 1.5, 1.0, 0.0], // Strongpoint
            ],
        }
    }
}

// ============================================================================
// SUBSYSTEM SETTINGS
// ============================================================================

/// Rule deciding which strongpoint pairs form a network zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkRule {
    /// Strongpoints on neighbouring lanes, roughly aligned along x.
    LaneAdjacency {
        min_lateral: f32,
        max_lateral: f32,
        alignment_tolerance: f32,
    },
    /// Any two strongpoints closer than `max_link_distance`.
    MaxDistance { max_link_distance: f32 },
}

impl Default for LinkRule {
    fn default() -> Self {
        Self::LaneAdjacency {
            min_lateral: 100.0,
            max_lateral: 400.0,
            alignment_tolerance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rule: LinkRule,
    /// Padding added around the rectangle spanned by the two anchors.
    pub zone_margin: f32,
    pub speed_bonus: f32,
    pub range_bonus: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rule: LinkRule::default(),
            zone_margin: 20.0,
            speed_bonus: 1.5,
            range_bonus: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttritionConfig {
    pub decay_rate: f32,
    pub floor: f32,
}

impl Default for AttritionConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.6,
            floor: 0.4,
        }
    }
}

/// Collision broad phase. Both variants resolve pairs in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadPhase {
    BruteForce,
    Grid { cell_size: f32 },
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::BruteForce
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Fraction of max speed added along the forward axis each tick.
    pub forward_accel: f32,
    /// Lateral pull toward the lane line outside the network.
    pub lateral_stiffness: f32,
    /// Lateral pull while buffed or switching lanes.
    pub relaxed_lateral_stiffness: f32,
    pub lateral_gain: f32,
    /// Fraction of a funnel overflow corrected per tick for relaxed units.
    pub relaxed_confinement: f32,
    /// Velocity reflection applied when a unit is clamped to the funnel.
    pub wall_bounce: f32,
    pub broad_phase: BroadPhase,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            forward_accel: 0.05,
            lateral_stiffness: 0.1,
            relaxed_lateral_stiffness: 0.02,
            lateral_gain: 0.1,
            relaxed_confinement: 0.1,
            wall_bounce: 0.5,
            broad_phase: BroadPhase::BruteForce,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub attack_cooldown_ticks: u32,
    /// Velocity retained per tick while attacking.
    pub attack_damping: f32,
    pub knockback_impulse: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_cooldown_ticks: 60,
            attack_damping: 0.8,
            knockback_impulse: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub player_start: f32,
    pub enemy_start: f32,
    /// Passive player income per tick.
    pub player_trickle: f32,
    pub recovery_fraction: f32,
    pub wreckage_radius: f32,
    pub wreckage_mass: f32,
    /// Extra distance at which a unit still counts as touching wreckage.
    pub collect_slop: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            player_start: 800.0,
            enemy_start: 0.0,
            player_trickle: 0.4,
            recovery_fraction: 0.7,
            wreckage_radius: 10.0,
            wreckage_mass: 20.0,
            collect_slop: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Distance of the spawn point from the faction's home edge.
    pub home_inset: f32,
    /// Full width of the random square around the spawn point.
    pub jitter: f32,
    /// Strongpoint x offsets from the home edge, mirrored for the enemy.
    pub strongpoint_columns: Vec<f32>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            home_inset: 40.0,
            jitter: 30.0,
            strongpoint_columns: vec![100.0, 280.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DominanceConfig {
    /// |score| at which the match ends.
    pub threshold: i64,
    /// Player units beyond `player_deep_fraction × width` count as deep.
    pub player_deep_fraction: f32,
    /// Enemy units below `enemy_deep_fraction × width` count as deep.
    pub enemy_deep_fraction: f32,
    /// A faction scores only while its deep count exceeds this.
    pub min_deep_units: u32,
}

impl Default for DominanceConfig {
    fn default() -> Self {
        Self {
            threshold: 2500,
            player_deep_fraction: 0.7,
            enemy_deep_fraction: 0.3,
            min_deep_units: 0,
        }
    }
}

/// How the director picks the lane for its next squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneChoice {
    Random,
    /// Lane with the fewest own mobile units.
    LeastPresence,
    /// Lane where the most player units have crossed into the enemy half.
    Pressure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectorMode {
    /// One free squad every `interval_ticks`.
    Interval { interval_ticks: u64 },
    /// Save enemy income for a composed wave; cadence and income scale with
    /// a difficulty multiplier that grows with elapsed ticks.
    Wave {
        base_interval_ticks: u64,
        income_per_tick: f32,
        difficulty_growth_per_tick: f32,
        max_difficulty: f32,
        composition: Vec<UnitType>,
        strike_unit: UnitType,
    },
}

impl Default for DirectorMode {
    fn default() -> Self {
        Self::Interval { interval_ticks: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub enabled: bool,
    pub faction: Faction,
    pub mode: DirectorMode,
    pub lane_choice: LaneChoice,
    /// Relative weights for Shield, Crossbow, Cavalry.
    pub unit_weights: [f32; 3],
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            faction: Faction::Enemy,
            mode: DirectorMode::default(),
            lane_choice: LaneChoice::Random,
            unit_weights: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlankingConfig {
    pub enabled: bool,
    pub factions: Vec<Faction>,
    /// Half-width of the crossroad band around each strongpoint column.
    pub crossroad_half_width: f32,
    pub cooldown_ticks: u32,
    pub transition_ticks: u32,
}

impl Default for FlankingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factions: vec![Faction::Enemy],
            crossroad_half_width: 40.0,
            cooldown_ticks: 240,
            transition_ticks: 90,
        }
    }
}

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

/// Complete simulation configuration.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed timestep in seconds used by `SimWorld::step`.
    pub fixed_timestep: f32,
    /// Seed for spawn jitter and director choices. `None` draws from entropy.
    pub rng_seed: Option<u64>,
    pub map: LaneLayout,
    pub units: UnitCatalog,
    pub matchups: DamageMatrix,
    pub attrition: AttritionConfig,
    pub network: NetworkConfig,
    pub movement: MovementConfig,
    pub combat: CombatConfig,
    pub economy: EconomyConfig,
    pub spawn: SpawnConfig,
    pub dominance: DominanceConfig,
    pub director: DirectorConfig,
    pub flanking: FlankingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            rng_seed: None,
            map: LaneLayout::default(),
            units: UnitCatalog::default(),
            matchups: DamageMatrix::default(),
            attrition: AttritionConfig::default(),
            network: NetworkConfig::default(),
            movement: MovementConfig::default(),
            combat: CombatConfig::default(),
            economy: EconomyConfig::default(),
            spawn: SpawnConfig::default(),
            dominance: DominanceConfig::default(),
            director: DirectorConfig::default(),
            flanking: FlankingConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse sim config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read sim config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid sim config: {0}")]
    Invalid(String),
}

impl SimConfig {
    /// Parse and validate a (possibly partial) JSON config.
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map.lane_count == 0 {
            return Err(ConfigError::Invalid("lane_count must be at least 1".into()));
        }
        if self.map.width <= 0.0 || self.map.height <= 0.0 {
            return Err(ConfigError::Invalid("map dimensions must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.attrition.floor) {
            return Err(ConfigError::Invalid("attrition floor must be within [0, 1]".into()));
        }
        if self.fixed_timestep <= 0.0 {
            return Err(ConfigError::Invalid("fixed_timestep must be positive".into()));
        }
        if let BroadPhase::Grid { cell_size } = self.movement.broad_phase {
            if cell_size <= 0.0 {
                return Err(ConfigError::Invalid("grid cell_size must be positive".into()));
            }
        }
        Ok(())
    }

    pub fn stats(&self, unit_type: UnitType) -> &UnitStats {
        self.units.get(unit_type)
    }

    /// Largest unit or wreckage radius in the tables.
    pub fn max_body_radius(&self) -> f32 {
        UnitType::ALL
            .iter()
            .map(|t| self.units.get(*t).radius)
            .fold(self.economy.wreckage_radius, f32::max)
    }
}

pub fn read_sim_config_from_file(path: &Path) -> Result<SimConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    SimConfig::from_json_str(&contents)
}

/// Load the config named by `EW_SIM_CONFIG_PATH`, falling back to defaults.
pub fn load_sim_config_from_env() -> SimConfig {
    let Some(path) = env::var("EW_SIM_CONFIG_PATH").ok().map(PathBuf::from) else {
        return SimConfig::default();
    };

    match read_sim_config_from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "ew_sim::config",
                path = %path.display(),
                "sim_config.loaded"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                target: "ew_sim::config",
                path = %path.display(),
                error = %err,
                "sim_config.load_failed"
            );
            SimConfig::default()
        }
    }
}
