//! Match simulation through an OpenAI-compatible chat completion endpoint.
//!
//! One request per call, no retry: fallback policy belongs to the facade.
//! The model's answer is validated, scrubbed of template placeholders and
//! sorted by minute before it is returned.

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{LlmConfig, MatchRules};
use crate::error::SimulationError;
use crate::simulation::prompt::{MatchPrompt, PromptTemplate};
use crate::simulation::types::{
    score_line, sort_chronologically, EventKind, MatchEvent, MatchResult, Tactic, Team,
    MAX_MINUTE,
};

pub struct RemoteSimulator {
    client: Client,
    config: LlmConfig,
    rules: MatchRules,
    template: PromptTemplate,
}

impl RemoteSimulator {
    pub fn new(config: LlmConfig, rules: MatchRules) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            config,
            rules,
            template: PromptTemplate::default(),
        })
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.config.credential().is_some()
    }

    pub async fn simulate<R: Rng + ?Sized>(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
        rng: &mut R,
    ) -> Result<MatchResult, SimulationError> {
        let api_key = self
            .config
            .credential()
            .ok_or_else(|| SimulationError::Config("missing OPENAI_API_KEY".into()))?;

        let prompt = self
            .template
            .build(team1, team2, tactic1, tactic2, &self.rules, rng);
        tracing::debug!(system = %prompt.system, user = %prompt.user, data = %prompt.payload, "match prompt");

        let content = self.complete(api_key, &prompt).await?;
        parse_match_content(&content, &team1.name, &team2.name)
    }

    async fn complete(&self, api_key: &str, prompt: &MatchPrompt) -> Result<String, SimulationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.payload.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::info!(model = %self.config.model, url = %self.config.api_url, "requesting match simulation");
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SimulationError::http_status(status.as_u16(), &body));
        }

        let body = response.text().await?;
        let completion: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| SimulationError::Format(format!("unexpected completion envelope: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| SimulationError::Format("empty completion".into()))
    }
}

/// Validate and normalize the JSON document produced by the model.
pub fn parse_match_content(
    content: &str,
    team1: &str,
    team2: &str,
) -> Result<MatchResult, SimulationError> {
    let parsed: Value = serde_json::from_str(content.trim())
        .map_err(|e| SimulationError::Format(format!("content is not valid JSON: {e}")))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| SimulationError::Format("content is not a JSON object".into()))?;

    let raw_events = field(object, &["events", "azioni"])
        .and_then(Value::as_array)
        .ok_or_else(|| SimulationError::Format("missing \"events\" array".into()))?;
    let goals_team_1 = goal_count(object, &["goals_team_1", "gol_squadra_1"])?;
    let goals_team_2 = goal_count(object, &["goals_team_2", "gol_squadra_2"])?;

    let score_string = field(object, &["score_string", "marcatori"])
        .and_then(Value::as_str)
        .map(|score| sanitize_placeholders(score, team1, team2).trim().to_string())
        .filter(|score| !score.is_empty())
        .unwrap_or_else(|| score_line(team1, goals_team_1, goals_team_2, team2));

    let mut events = raw_events
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_event(index, raw, team1, team2))
        .collect::<Result<Vec<_>, _>>()?;
    sort_chronologically(&mut events);

    Ok(MatchResult {
        goals_team_1,
        goals_team_2,
        score_string,
        events,
    })
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn goal_count(object: &Map<String, Value>, keys: &[&str]) -> Result<u32, SimulationError> {
    field(object, keys)
        .and_then(Value::as_f64)
        .filter(|goals| goals.is_finite() && *goals >= 0.0)
        .map(|goals| goals.round() as u32)
        .ok_or_else(|| SimulationError::Format(format!("\"{}\" is not a non-negative number", keys[0])))
}

fn parse_event(index: usize, raw: &Value, team1: &str, team2: &str) -> Result<MatchEvent, SimulationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| SimulationError::Format(format!("event {index} is not an object")))?;

    let minute = field(object, &["minute", "minuto"])
        .and_then(|value| value.as_f64().or_else(|| value.as_str()?.trim().parse().ok()))
        .filter(|minute| minute.is_finite())
        .map(|minute| minute.clamp(0.0, f64::from(MAX_MINUTE)).round() as u32)
        .unwrap_or(0);
    let text = |keys: &[&str]| {
        field(object, keys)
            .and_then(Value::as_str)
            .map(|value| sanitize_placeholders(value, team1, team2))
            .unwrap_or_default()
    };

    Ok(MatchEvent {
        minute,
        kind: EventKind::from_label(&text(&["type", "tipo"][..])),
        description: text(&["description", "descrizione"][..]).trim().to_string(),
    })
}

/// Substitute team-name placeholders, then drop every other `{{...}}` token.
pub fn sanitize_placeholders(text: &str, team1: &str, team2: &str) -> String {
    strip_placeholders(&replace_team_tokens(text, team1, team2))
}

fn replace_team_tokens(text: &str, team1: &str, team2: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match team_token(after, team1, team2) {
            Some((name, consumed)) => {
                out.push_str(name);
                rest = &after[consumed..];
            }
            None => {
                // Step past one brace only, a token may start at the next one.
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Team name for a `KEY}}` tail, with the number of bytes it spans.
fn team_token<'a>(after: &str, team1: &'a str, team2: &'a str) -> Option<(&'a str, usize)> {
    let close = after.find("}}")?;
    let name = match after[..close].trim() {
        "TEAM1_NAME" | "SQUADRA1_NOME" => team1,
        "TEAM2_NAME" | "SQUADRA2_NOME" => team2,
        _ => return None,
    };
    Some((name, close + 2))
}

/// Remove `{{...}}` tokens whose body holds no `}`.
fn strip_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        if after[close..].starts_with("}}") {
            out.push_str(&rest[..start]);
            rest = &after[close + 2..];
        } else {
            out.push_str(&rest[..start + 2 + close + 1]);
            rest = &after[close + 1..];
        }
    }
    out.push_str(rest);
    out
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
