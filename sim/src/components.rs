//! ECS Components for the Entropy War simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position on the battlefield (x = along the lanes, y = across them).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D velocity vector, in world units per tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Rescale the vector so its magnitude does not exceed `max`.
    pub fn clamp_magnitude(&mut self, max: f32) {
        let mag = self.magnitude();
        if mag > max && mag > 0.0001 {
            self.vx = self.vx / mag * max;
            self.vy = self.vy / mag * max;
        }
    }

    pub fn scale(&mut self, factor: f32) {
        self.vx *= factor;
        self.vy *= factor;
    }
}

/// Rigid-body collision shape.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Body {
    pub radius: f32,
    pub mass: f32,
}

impl Body {
    pub fn new(radius: f32, mass: f32) -> Self {
        Self { radius, mass }
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable identifier for a unit or strongpoint. Allocated in spawn order.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Stable identifier for a wreckage entity.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WreckageId(pub u32);

/// Faction/side identifier.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Home edge at x = 0, advances toward +x.
    #[default]
    Player,
    /// Home edge at x = map width, advances toward -x.
    Enemy,
}

impl Faction {
    pub const ALL: [Faction; 2] = [Faction::Player, Faction::Enemy];

    /// Sign of the forward (advance) direction along the x axis.
    pub fn forward_sign(&self) -> f32 {
        match self {
            Faction::Player => 1.0,
            Faction::Enemy => -1.0,
        }
    }

    pub fn opponent(&self) -> Faction {
        match self {
            Faction::Player => Faction::Enemy,
            Faction::Enemy => Faction::Player,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Faction::Player => 0,
            Faction::Enemy => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::Player => "Player",
            Faction::Enemy => "Enemy",
        }
    }
}

/// Enumerated combat role. Stats and matchups are looked up by this key.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    #[default]
    Shield,
    Crossbow,
    Cavalry,
    Strongpoint,
}

impl UnitType {
    pub const ALL: [UnitType; 4] = [
        UnitType::Shield,
        UnitType::Crossbow,
        UnitType::Cavalry,
        UnitType::Strongpoint,
    ];

    /// Roles that can be produced by a squad spawn command.
    pub const MOBILE: [UnitType; 3] = [UnitType::Shield, UnitType::Crossbow, UnitType::Cavalry];

    pub fn index(&self) -> usize {
        match self {
            UnitType::Shield => 0,
            UnitType::Crossbow => 1,
            UnitType::Cavalry => 2,
            UnitType::Strongpoint => 3,
        }
    }

    pub fn is_strongpoint(&self) -> bool {
        matches!(self, UnitType::Strongpoint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Shield => "Shield",
            UnitType::Crossbow => "Crossbow",
            UnitType::Cavalry => "Cavalry",
            UnitType::Strongpoint => "Strongpoint",
        }
    }
}

/// Lane the unit is assigned to. Drives the ideal cross-axis line.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane(pub usize);

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Hit points of a unit or strongpoint.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Ticks remaining until the next attack may land.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCooldown(pub u32);

impl AttackCooldown {
    pub fn is_ready(&self) -> bool {
        self.0 == 0
    }

    pub fn tick_down(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    pub fn reset(&mut self, ticks: u32) {
        self.0 = ticks;
    }
}

/// Per-tick derived combat values.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CombatState {
    /// Base damage scaled by the attrition factor this tick.
    pub current_damage: f32,
    /// Whether the unit had a target in range this tick.
    pub attacking: bool,
}

/// Lifecycle and buff flags.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UnitFlags {
    /// Set the moment hp reaches zero; the entity is removed at tick end.
    pub dead: bool,
    /// Strongpoints never move and ignore attrition.
    pub is_static: bool,
    /// Inside one of its faction's network zones this tick.
    pub in_network: bool,
}

impl UnitFlags {
    pub fn mobile() -> Self {
        Self::default()
    }

    pub fn fixed() -> Self {
        Self {
            is_static: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_mobile_alive(&self) -> bool {
        !self.dead && !self.is_static
    }
}

/// Flanking state for lane reassignment.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LaneSwitch {
    /// Ticks before another lane switch may be considered.
    pub cooldown: u32,
    /// Ticks of relaxed confinement remaining after a switch.
    pub transition: u32,
}

impl LaneSwitch {
    pub fn in_transition(&self) -> bool {
        self.transition > 0
    }
}

// ============================================================================
// WRECKAGE COMPONENTS
// ============================================================================

/// Collectible remnant of a dead mobile unit.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wreckage {
    /// Currency credited to whichever faction collects it.
    pub value: f32,
    /// Role of the unit that left it behind.
    pub origin: UnitType,
    pub collected: bool,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a unit or strongpoint entity.
#[derive(Bundle, Default)]
pub struct UnitBundle {
    pub id: UnitId,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub lane: Lane,
    pub position: Position,
    pub velocity: Velocity,
    pub body: Body,
    pub health: Health,
    pub cooldown: AttackCooldown,
    pub combat: CombatState,
    pub flags: UnitFlags,
    pub lane_switch: LaneSwitch,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(10.0, 10.0)
    }
}

/// Bundle for spawning a wreckage entity.
#[derive(Bundle)]
pub struct WreckageBundle {
    pub id: WreckageId,
    pub position: Position,
    pub body: Body,
    pub wreckage: Wreckage,
}

impl WreckageBundle {
    pub fn new(id: u32, x: f32, y: f32, value: f32, origin: UnitType, radius: f32, mass: f32) -> Self {
        Self {
            id: WreckageId(id),
            position: Position::new(x, y),
            body: Body::new(radius, mass),
            wreckage: Wreckage {
                value,
                origin,
                collected: false,
            },
        }
    }
}
