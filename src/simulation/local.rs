//! Offline match generator. Weighted random draws only, no I/O, never fails.
//! Goal events always add up to the final score.

use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::simulation::types::{
    score_line, sort_chronologically, EventKind, MatchEvent, MatchResult, Tactic, Team,
    MAX_MINUTE,
};

pub const EVENT_COUNT_RANGE: RangeInclusive<u32> = 6..=14;
pub const MINUTE_RANGE: RangeInclusive<u32> = 2..=88;
pub const GOAL_PROBABILITY: f64 = 0.18;

#[derive(Debug, Clone)]
pub struct LocalSimulator {
    event_count: RangeInclusive<u32>,
    goal_probability: f64,
}

impl Default for LocalSimulator {
    fn default() -> Self {
        Self {
            event_count: EVENT_COUNT_RANGE,
            goal_probability: GOAL_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

impl LocalSimulator {
    /// Reversed bounds are swapped; the probability is clamped to [0, 1]
    /// and NaN falls back to the default.
    pub fn new(event_count: RangeInclusive<u32>, goal_probability: f64) -> Self {
        let (low, high) = event_count.into_inner();
        let goal_probability = if goal_probability.is_nan() {
            GOAL_PROBABILITY
        } else {
            goal_probability.clamp(0.0, 1.0)
        };
        Self {
            event_count: low.min(high)..=low.max(high),
            goal_probability,
        }
    }

    pub fn event_count(&self) -> &RangeInclusive<u32> {
        &self.event_count
    }

    pub fn goal_probability(&self) -> f64 {
        self.goal_probability
    }

    pub fn simulate<R: Rng + ?Sized>(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
        rng: &mut R,
    ) -> MatchResult {
        let weight1 = tactic1.attack_bias();
        let weight2 = tactic2.attack_bias();
        let total = rng.gen_range(self.event_count.clone());

        let mut goals = [0_u32; 2];
        let mut events = Vec::with_capacity(total as usize);
        for _ in 0..total {
            let minute = rng.gen_range(MINUTE_RANGE).min(MAX_MINUTE);
            let side = if rng.gen::<f64>() * weight1 > rng.gen::<f64>() * weight2 {
                Side::Home
            } else {
                Side::Away
            };
            let attacker = match side {
                Side::Home => &team1.name,
                Side::Away => &team2.name,
            };

            if rng.gen_bool(self.goal_probability) {
                goals[side as usize] += 1;
                events.push(MatchEvent {
                    minute,
                    kind: EventKind::Goal,
                    description: goal_description(side, attacker),
                });
            } else {
                let kind = EventKind::NON_GOAL
                    .choose(rng)
                    .cloned()
                    .unwrap_or(EventKind::Shot);
                let description = format!(
                    "{attacker} costruisce: {} pericoloso ma nulla di fatto.",
                    kind.commentary_label()
                );
                events.push(MatchEvent {
                    minute,
                    kind,
                    description,
                });
            }
        }

        sort_chronologically(&mut events);
        let [goals_team_1, goals_team_2] = goals;
        MatchResult {
            goals_team_1,
            goals_team_2,
            score_string: score_line(&team1.name, goals_team_1, goals_team_2, &team2.name),
            events,
        }
    }
}

fn goal_description(side: Side, attacker: &str) -> String {
    match side {
        Side::Home => format!("{attacker} segna! Azione corale conclusa con un tap-in."),
        Side::Away => format!("{attacker} trova la rete con un diagonale preciso."),
    }
}
