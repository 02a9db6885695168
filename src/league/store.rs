use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LeagueError;
use crate::simulation::{
    MatchEvent, MatchResult, Player, SimulationSource, Tactic, Team,
};

/// Maximum total value of a roster, in millions.
pub const BUDGET_LIMIT: u32 = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u32,
    pub full_name: String,
    pub role: String,
    /// Market value in millions.
    pub value: u32,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRecord {
    pub id: u32,
    pub president_email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub id: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub scheduled_at: DateTime<Utc>,
    pub home_tactic: Option<String>,
    pub away_tactic: Option<String>,
    pub home_ready: bool,
    pub away_ready: bool,
    pub finished: bool,
    /// Set while a simulation for this match is running.
    pub in_progress: bool,
    pub goals_home: Option<u32>,
    pub goals_away: Option<u32>,
    pub score_string: Option<String>,
    pub source: Option<SimulationSource>,
    #[serde(skip)]
    timeline: Vec<MatchEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchDetails {
    #[serde(flatten)]
    pub record: MatchRecord,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_email: String,
    pub away_email: String,
}

/// Everything the simulator needs for one match.
#[derive(Debug, Clone)]
pub struct Kickoff {
    pub match_id: u32,
    pub home: Team,
    pub away: Team,
    pub home_tactic: Tactic,
    pub away_tactic: Tactic,
}

/// In-memory league: player catalog, registered teams, rosters and fixtures.
#[derive(Debug, Default)]
pub struct League {
    players: BTreeMap<u32, PlayerRecord>,
    teams: BTreeMap<u32, TeamRecord>,
    rosters: BTreeMap<u32, Vec<u32>>,
    matches: BTreeMap<u32, MatchRecord>,
    next_team_id: u32,
    next_match_id: u32,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl League {
    pub fn with_players(players: Vec<PlayerRecord>) -> Self {
        let mut league = Self::default();
        for player in players {
            league.players.insert(player.id, player);
        }
        league
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn team_by_email(&self, email: &str) -> Result<&TeamRecord, LeagueError> {
        let email = normalize_email(email);
        self.teams
            .values()
            .find(|team| team.president_email == email)
            .ok_or(LeagueError::TeamNotFound(email))
    }

    /// Return the president's team, registering it when a name is given.
    pub fn init_team(&mut self, email: &str, name: Option<&str>) -> Result<TeamRecord, LeagueError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(LeagueError::MissingEmail);
        }
        if let Ok(team) = self.team_by_email(&email) {
            return Ok(team.clone());
        }
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(LeagueError::MissingTeamName)?;

        self.next_team_id += 1;
        let team = TeamRecord {
            id: self.next_team_id,
            president_email: email,
            name: name.to_string(),
        };
        self.teams.insert(team.id, team.clone());
        self.rosters.insert(team.id, Vec::new());
        tracing::info!(team_id = team.id, name = %team.name, "team registered");
        Ok(team)
    }

    pub fn roster(&self, email: &str) -> Result<Vec<PlayerRecord>, LeagueError> {
        let team = self.team_by_email(email)?;
        Ok(self.roster_of(team.id))
    }

    fn roster_of(&self, team_id: u32) -> Vec<PlayerRecord> {
        self.rosters
            .get(&team_id)
            .map(|ids| ids.iter().filter_map(|id| self.players.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn sign_player(&mut self, email: &str, player_id: u32) -> Result<PlayerRecord, LeagueError> {
        let team_id = self.team_by_email(email)?.id;
        let player = self
            .players
            .get(&player_id)
            .ok_or(LeagueError::PlayerNotFound(player_id))?;
        if player.signed {
            return Err(LeagueError::PlayerAlreadySigned(player_id));
        }
        let roster_value: u32 = self.roster_of(team_id).iter().map(|p| p.value).sum();
        if roster_value + player.value > BUDGET_LIMIT {
            return Err(LeagueError::BudgetExceeded {
                limit: BUDGET_LIMIT,
            });
        }

        let player = match self.players.get_mut(&player_id) {
            Some(player) => {
                player.signed = true;
                player.clone()
            }
            None => return Err(LeagueError::PlayerNotFound(player_id)),
        };
        self.rosters.entry(team_id).or_default().push(player_id);
        Ok(player)
    }

    pub fn release_player(&mut self, email: &str, player_id: u32) -> Result<(), LeagueError> {
        let team_id = self.team_by_email(email)?.id;
        let roster = self.rosters.entry(team_id).or_default();
        let position = roster
            .iter()
            .position(|id| *id == player_id)
            .ok_or(LeagueError::PlayerNotInRoster(player_id))?;
        roster.remove(position);
        if let Some(player) = self.players.get_mut(&player_id) {
            player.signed = false;
        }
        Ok(())
    }

    pub fn schedule_match(&mut self, home_email: &str, away_email: &str) -> Result<MatchRecord, LeagueError> {
        let home = self.team_by_email(home_email)?.id;
        let away = self.team_by_email(away_email)?.id;
        if home == away {
            return Err(LeagueError::SameTeam);
        }

        self.next_match_id += 1;
        let record = MatchRecord {
            id: self.next_match_id,
            home_team_id: home,
            away_team_id: away,
            scheduled_at: Utc::now(),
            home_tactic: None,
            away_tactic: None,
            home_ready: false,
            away_ready: false,
            finished: false,
            in_progress: false,
            goals_home: None,
            goals_away: None,
            score_string: None,
            source: None,
            timeline: Vec::new(),
        };
        self.matches.insert(record.id, record.clone());
        Ok(record)
    }

    /// Fixtures involving the president's team, newest first.
    pub fn matches_for(&self, email: &str) -> Result<Vec<MatchDetails>, LeagueError> {
        let team_id = self.team_by_email(email)?.id;
        let mut list: Vec<MatchDetails> = self
            .matches
            .values()
            .filter(|m| m.home_team_id == team_id || m.away_team_id == team_id)
            .filter_map(|m| self.details_of(m))
            .collect();
        list.sort_by(|a, b| {
            b.record
                .scheduled_at
                .cmp(&a.record.scheduled_at)
                .then(b.record.id.cmp(&a.record.id))
        });
        Ok(list)
    }

    pub fn match_details(&self, match_id: u32) -> Result<MatchDetails, LeagueError> {
        self.matches
            .get(&match_id)
            .and_then(|m| self.details_of(m))
            .ok_or(LeagueError::MatchNotFound(match_id))
    }

    fn details_of(&self, record: &MatchRecord) -> Option<MatchDetails> {
        let home = self.teams.get(&record.home_team_id)?;
        let away = self.teams.get(&record.away_team_id)?;
        Some(MatchDetails {
            record: record.clone(),
            home_team_name: home.name.clone(),
            away_team_name: away.name.clone(),
            home_email: home.president_email.clone(),
            away_email: away.president_email.clone(),
        })
    }

    pub fn timeline(&self, match_id: u32) -> Result<Vec<MatchEvent>, LeagueError> {
        let record = self
            .matches
            .get(&match_id)
            .ok_or(LeagueError::MatchNotFound(match_id))?;
        let mut events = record.timeline.clone();
        events.sort_by_key(|event| event.minute);
        Ok(events)
    }

    pub fn set_ready(
        &mut self,
        match_id: u32,
        email: &str,
        tactic: Option<&str>,
    ) -> Result<MatchDetails, LeagueError> {
        let team_id = self.team_by_email(email)?.id;
        let record = self
            .matches
            .get_mut(&match_id)
            .ok_or(LeagueError::MatchNotFound(match_id))?;
        if record.finished {
            return Err(LeagueError::AlreadyFinished);
        }
        if record.in_progress {
            return Err(LeagueError::InProgress);
        }
        let tactic = Tactic::from_optional(tactic).to_string();
        if record.home_team_id == team_id {
            record.home_ready = true;
            record.home_tactic = Some(tactic);
        } else if record.away_team_id == team_id {
            record.away_ready = true;
            record.away_tactic = Some(tactic);
        } else {
            return Err(LeagueError::NotParticipant);
        }
        self.match_details(match_id)
    }

    /// Check that `email` may start the match and gather both squads.
    pub fn prepare_kickoff(&self, match_id: u32, email: &str) -> Result<Kickoff, LeagueError> {
        let details = self.match_details(match_id)?;
        let email = normalize_email(email);
        if details.home_email != email && details.away_email != email {
            return Err(LeagueError::NotParticipant);
        }
        let record = &details.record;
        if record.finished {
            return Err(LeagueError::AlreadyFinished);
        }
        if record.in_progress {
            return Err(LeagueError::InProgress);
        }
        if !record.home_ready || !record.away_ready {
            return Err(LeagueError::NotReady {
                home_ready: record.home_ready,
                away_ready: record.away_ready,
            });
        }

        Ok(Kickoff {
            match_id,
            home: self.squad(record.home_team_id, &details.home_team_name),
            away: self.squad(record.away_team_id, &details.away_team_name),
            home_tactic: Tactic::from_optional(record.home_tactic.as_deref()),
            away_tactic: Tactic::from_optional(record.away_tactic.as_deref()),
        })
    }

    /// Like `prepare_kickoff`, and marks the match as in progress so a
    /// concurrent start is refused until the result is recorded or the
    /// kickoff is abandoned.
    pub fn start_kickoff(&mut self, match_id: u32, email: &str) -> Result<Kickoff, LeagueError> {
        let kickoff = self.prepare_kickoff(match_id, email)?;
        if let Some(record) = self.matches.get_mut(&match_id) {
            record.in_progress = true;
        }
        Ok(kickoff)
    }

    pub fn abandon_kickoff(&mut self, match_id: u32) {
        if let Some(record) = self.matches.get_mut(&match_id) {
            record.in_progress = false;
        }
    }

    fn squad(&self, team_id: u32, name: &str) -> Team {
        let roster = self
            .roster_of(team_id)
            .into_iter()
            .map(|p| Player::new(p.full_name, p.role))
            .collect();
        Team::new(name, roster)
    }

    pub fn record_result(
        &mut self,
        match_id: u32,
        result: &MatchResult,
        source: SimulationSource,
    ) -> Result<(), LeagueError> {
        let record = self
            .matches
            .get_mut(&match_id)
            .ok_or(LeagueError::MatchNotFound(match_id))?;
        if record.finished {
            return Err(LeagueError::AlreadyFinished);
        }
        record.goals_home = Some(result.goals_team_1);
        record.goals_away = Some(result.goals_team_2);
        record.score_string = Some(result.score_string.clone());
        record.timeline = result.events.clone();
        record.source = Some(source);
        record.finished = true;
        record.in_progress = false;
        Ok(())
    }
}
