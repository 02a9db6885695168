use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_TACTIC: &str = "equilibrata";
pub const MAX_MINUTE: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub display_name: String,
    pub role: String,
}

impl Player {
    pub fn new(display_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            role: role.into(),
        }
    }

    /// `"name (role)"`, with `N/D` standing in for blanks.
    pub fn listing(&self) -> String {
        format!("{} ({})", or_unknown(&self.display_name), or_unknown(&self.role))
    }
}

fn or_unknown(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "N/D"
    } else {
        trimmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub roster: Vec<Player>,
}

impl Team {
    pub fn new(name: impl Into<String>, roster: Vec<Player>) -> Self {
        Self {
            name: name.into(),
            roster,
        }
    }

    pub fn roster_listing(&self) -> String {
        if self.roster.is_empty() {
            return "N/D".to_string();
        }
        self.roster
            .iter()
            .map(Player::listing)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Free-text tactical label, stored normalized (trimmed, lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub struct Tactic(String);

impl Tactic {
    pub fn new(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            Self(DEFAULT_TACTIC.to_string())
        } else {
            Self(normalized)
        }
    }

    pub fn from_optional(raw: Option<&str>) -> Self {
        raw.map(Self::new).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Multiplier on the side's attacking draw.
    pub fn attack_bias(&self) -> f64 {
        if self.0.contains("attacco") {
            1.2
        } else if self.0.contains("difesa") {
            0.8
        } else {
            1.0
        }
    }
}

impl Default for Tactic {
    fn default() -> Self {
        Self(DEFAULT_TACTIC.to_string())
    }
}

impl From<Option<String>> for Tactic {
    fn from(raw: Option<String>) -> Self {
        Self::from_optional(raw.as_deref())
    }
}

impl From<Tactic> for String {
    fn from(tactic: Tactic) -> Self {
        tactic.0
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Goal,
    Shot,
    Chance,
    Caution,
    FreeKick,
    Corner,
    /// A model-provided label that matches none of the known kinds.
    Other(String),
}

impl EventKind {
    pub const NON_GOAL: [EventKind; 5] = [
        EventKind::Shot,
        EventKind::Chance,
        EventKind::Caution,
        EventKind::FreeKick,
        EventKind::Corner,
    ];

    /// Accepts the canonical names and the Italian labels the prompt asks for.
    pub fn from_label(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().replace(|c: char| c == '_' || c == '-', " ").as_str() {
            "goal" | "gol" | "rete" => Self::Goal,
            "shot" | "tiro" => Self::Shot,
            "chance" | "occasione" => Self::Chance,
            "caution" | "ammonizione" | "yellow card" | "cartellino giallo" => Self::Caution,
            "freekick" | "free kick" | "punizione" | "calcio di punizione" => Self::FreeKick,
            "corner" | "calcio d'angolo" => Self::Corner,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Goal => "Goal",
            Self::Shot => "Shot",
            Self::Chance => "Chance",
            Self::Caution => "Caution",
            Self::FreeKick => "FreeKick",
            Self::Corner => "Corner",
            Self::Other(label) => label,
        }
    }

    /// Italian wording used inside generated commentary.
    pub fn commentary_label(&self) -> &str {
        match self {
            Self::Goal => "gol",
            Self::Shot => "tiro",
            Self::Chance => "occasione",
            Self::Caution => "ammonizione",
            Self::FreeKick => "punizione",
            Self::Corner => "corner",
            Self::Other(label) => label,
        }
    }

    pub fn is_goal(&self) -> bool {
        matches!(self, Self::Goal)
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_label(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u32,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub goals_team_1: u32,
    pub goals_team_2: u32,
    pub score_string: String,
    pub events: Vec<MatchEvent>,
}

impl MatchResult {
    pub fn goal_events(&self) -> usize {
        self.events.iter().filter(|event| event.kind.is_goal()).count()
    }
}

pub fn score_line(home: &str, goals_home: u32, goals_away: u32, away: &str) -> String {
    format!("{home} {goals_home} - {goals_away} {away}")
}

/// Stable ascending sort by minute.
pub fn sort_chronologically(events: &mut [MatchEvent]) {
    events.sort_by_key(|event| event.minute);
}
