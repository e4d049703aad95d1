//! Outcome - the dominance tally that decides the match.

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::clock::SimTick;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Match result, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

/// Signed dominance score: positive favours the player.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct Dominance {
    pub score: i64,
    pub outcome: Option<MatchOutcome>,
}

impl Dominance {
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Score as a fraction of the threshold, clamped to [-1, 1].
    pub fn ratio(&self, threshold: i64) -> f32 {
        if threshold <= 0 {
            return 0.0;
        }
        (self.score as f32 / threshold as f32).clamp(-1.0, 1.0)
    }
}

/// Deep-unit counts for one tick: player units past the player line,
/// enemy units past the enemy line.
pub fn deep_counts<'a>(
    config: &SimConfig,
    units: impl Iterator<Item = (&'a Faction, &'a Position, &'a UnitFlags)>,
) -> (u32, u32) {
    let width = config.map.width;
    let player_line = width * config.dominance.player_deep_fraction;
    let enemy_line = width * config.dominance.enemy_deep_fraction;

    let mut player = 0;
    let mut enemy = 0;
    for (faction, pos, flags) in units {
        if !flags.is_mobile_alive() {
            continue;
        }
        match faction {
            Faction::Player if pos.x > player_line => player += 1,
            Faction::Enemy if pos.x < enemy_line => enemy += 1,
            _ => {}
        }
    }
    (player, enemy)
}

/// System that updates the dominance score and decides the match.
pub fn outcome_system(
    config: Res<SimConfig>,
    tick: Res<SimTick>,
    mut dominance: ResMut<Dominance>,
    units: Query<(&Faction, &Position, &UnitFlags)>,
) {
    if dominance.is_terminal() {
        return;
    }

    let (player_deep, enemy_deep) = deep_counts(&config, units.iter());
    let min = config.dominance.min_deep_units;
    if player_deep > min {
        dominance.score += player_deep as i64;
    }
    if enemy_deep > min {
        dominance.score -= enemy_deep as i64;
    }

    let threshold = config.dominance.threshold;
    if dominance.score.abs() >= threshold {
        let outcome = if dominance.score > 0 {
            MatchOutcome::Victory
        } else {
            MatchOutcome::Defeat
        };
        dominance.outcome = Some(outcome);
        tracing::info!(
            target: "ew_sim::outcome",
            tick = tick.0,
            score = dominance.score,
            outcome = ?outcome,
            "outcome.decided"
        );
    }
}
