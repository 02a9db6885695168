pub mod local;
pub mod prompt;
pub mod remote;
pub mod rng;
pub mod types;

use rand::Rng;
use serde::Serialize;

pub use local::LocalSimulator;
pub use prompt::{build_prompt, MatchPrompt, PromptSection, PromptTemplate, SectionKind};
pub use remote::{parse_match_content, sanitize_placeholders, RemoteSimulator};
pub use rng::SimRng;
pub use types::{EventKind, MatchEvent, MatchResult, Player, Tactic, Team};

use crate::config::AppConfig;

/// Which simulator produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub source: SimulationSource,
    pub result: MatchResult,
}

/// Single entry point over both simulators: one remote attempt, local on any
/// failure. Always yields a result.
pub struct MatchSimulator {
    remote: RemoteSimulator,
    local: LocalSimulator,
}

impl MatchSimulator {
    pub fn new(remote: RemoteSimulator, local: LocalSimulator) -> Self {
        Self { remote, local }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let remote = RemoteSimulator::new(config.llm.clone(), config.simulation)?;
        Ok(Self::new(remote, LocalSimulator::default()))
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_configured()
    }

    pub async fn simulate(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
    ) -> MatchResult {
        let mut rng = rng::from_entropy();
        self.simulate_seeded(team1, team2, tactic1, tactic2, &mut rng)
            .await
            .result
    }

    pub async fn simulate_seeded<R: Rng + ?Sized>(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
        rng: &mut R,
    ) -> SimulationOutcome {
        match self.remote.simulate(team1, team2, tactic1, tactic2, rng).await {
            Ok(result) => SimulationOutcome {
                source: SimulationSource::Remote,
                result,
            },
            Err(err) => {
                tracing::warn!(error = %err, "remote simulation unavailable, using local fallback");
                self.simulate_local(team1, team2, tactic1, tactic2, rng)
            }
        }
    }

    /// Skip the remote attempt entirely.
    pub fn simulate_local<R: Rng + ?Sized>(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
        rng: &mut R,
    ) -> SimulationOutcome {
        SimulationOutcome {
            source: SimulationSource::Local,
            result: self.local.simulate(team1, team2, tactic1, tactic2, rng),
        }
    }
}
