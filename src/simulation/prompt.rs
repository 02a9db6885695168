//! Prompt construction for the text-generation simulator.
//!
//! The user prompt is an ordered list of sections rather than one rendered
//! string, so the randomly drawn scenario is placed structurally: before the
//! output constraints, else before the guidelines, else at the end. A template
//! that drops or reorders sections still carries the scenario.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

use crate::config::MatchRules;
use crate::simulation::types::{Player, Tactic, Team};

pub const SYSTEM_PROMPT: &str = "Sei un motore di simulazione calcistica. \
Genera una cronologia realistica di una partita di calcio tra due squadre. \
Rispetta le tattiche fornite e mantieni un tono sportivo, conciso e credibile. \
Produci esclusivamente JSON valido senza testo extra.";

pub const SCENARIO_PREFIX: &str = "Scenario partita (casuale): ";

pub const SCENARIOS: &[&str] = &[
    "La partita è molto equilibrata e c'è grande possibilità di un pareggio",
    "La squadra di casa domina, crea la maggior parte delle occasioni e probabilmente vince con almeno 2 gol di scarto",
    "La squadra ospite domina, crea la maggior parte delle occasioni e probabilmente vince con almeno 2 gol di scarto",
    "Partita abbastanza equilibrata ma con tanti gol",
    "Partita bloccata con pochissimi gol, può finire 0-0",
    "Partita decisa da episodi: un rigore, un'espulsione o un errore difensivo cambiano il risultato",
    "Una squadra si chiude e riparte in contropiede cercando di colpire con azioni rapide",
    "Una squadra segna presto e continua a spingere fino alla goleada",
    "La squadra in vantaggio difende con ordine sotto una pressione continua",
    "Risultato deciso negli ultimi minuti, ma vince la squadra che ha segnato per prima",
    "Risultato ribaltato più volte con tanti gol e assist, vince chi era in svantaggio",
    "Goleada della squadra con la rosa più forte",
];

const INTRO: &str = "Simula una partita di calcio tra {{TEAM1_NAME}} (casa, tattica: {{TACTIC1}}) \
e {{TEAM2_NAME}} (ospite, tattica: {{TACTIC2}}).\n\
Rosa {{TEAM1_NAME}}: {{ROSTER1}}\n\
Rosa {{TEAM2_NAME}}: {{ROSTER2}}\n\
Usa ESATTAMENTE i nomi così come compaiono nelle rose fornite.";

const CONSTRAINTS: &str = "Vincoli output (obbligatorio, solo JSON):\n\
{\n  \"goals_team_1\": number,\n  \"goals_team_2\": number,\n  \
\"score_string\": string, // formato: '<NOME_SQUADRA_1> X - Y <NOME_SQUADRA_2>'\n  \
\"events\": [ // ordinati per minuto crescente\n    \
{ \"minute\": number (2-90), \"type\": string, \"description\": string }\n  ]\n}";

const GUIDELINES: &str = "Linee guida: genera tra {{MIN_EVENTS}} e {{MAX_EVENTS}} azioni totali; \
varia gli eventi tra 'Goal', 'Tiro', 'Occasione', 'Ammonizione', 'Punizione', 'Corner'; \
rispetta il bias tattico (più azioni offensive per chi attacca) ma considera la stanchezza \
nelle fasi finali e il rischio di subire contropiedi; \
le tattiche più raffinate meritano più probabilità di andare in gol; \
usa nomi realistici dalla rosa nelle descrizioni; \
non creare espulsioni; mantieni verosimiglianza; \
vietato usare placeholder o stringhe tra doppie parentesi graffe (es. {{...}}) nell'output.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Intro,
    Scenario,
    Constraints,
    Guidelines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    pub kind: SectionKind,
    pub template: String,
}

impl PromptSection {
    pub fn new(kind: SectionKind, template: impl Into<String>) -> Self {
        Self {
            kind,
            template: template.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: String,
    pub sections: Vec<PromptSection>,
    pub scenarios: Vec<String>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            sections: vec![
                PromptSection::new(SectionKind::Intro, INTRO),
                PromptSection::new(SectionKind::Constraints, CONSTRAINTS),
                PromptSection::new(SectionKind::Guidelines, GUIDELINES),
            ],
            scenarios: SCENARIOS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fully rendered prompt: system text, user text, and the structured data
/// message restating exact names and bounds.
#[derive(Debug, Clone)]
pub struct MatchPrompt {
    pub system: String,
    pub user: String,
    pub payload: Value,
    pub scenario: Option<String>,
}

impl PromptTemplate {
    pub fn build<R: Rng + ?Sized>(
        &self,
        team1: &Team,
        team2: &Team,
        tactic1: &Tactic,
        tactic2: &Tactic,
        rules: &MatchRules,
        rng: &mut R,
    ) -> MatchPrompt {
        let variables = [
            ("TEAM1_NAME", team1.name.clone()),
            ("TEAM2_NAME", team2.name.clone()),
            ("TACTIC1", tactic1.to_string()),
            ("TACTIC2", tactic2.to_string()),
            ("ROSTER1", team1.roster_listing()),
            ("ROSTER2", team2.roster_listing()),
            ("MIN_EVENTS", rules.min_events.to_string()),
            ("MAX_EVENTS", rules.max_events.to_string()),
        ];

        let scenario = self.scenarios.choose(rng).cloned();
        let sections = with_scenario(&self.sections, scenario.as_deref());
        let user = sections
            .iter()
            .map(|section| fill_template(&section.template, &variables))
            .collect::<Vec<_>>()
            .join("\n\n");

        MatchPrompt {
            system: self.system.clone(),
            user,
            payload: structured_payload(team1, team2, tactic1, tactic2, rules),
            scenario,
        }
    }
}

/// Build the prompt from the standard template.
pub fn build_prompt<R: Rng + ?Sized>(
    team1: &Team,
    team2: &Team,
    tactic1: &Tactic,
    tactic2: &Tactic,
    rules: &MatchRules,
    rng: &mut R,
) -> MatchPrompt {
    PromptTemplate::default().build(team1, team2, tactic1, tactic2, rules, rng)
}

fn with_scenario(sections: &[PromptSection], scenario: Option<&str>) -> Vec<PromptSection> {
    let mut out: Vec<PromptSection> = sections
        .iter()
        .filter(|section| section.kind != SectionKind::Scenario)
        .cloned()
        .collect();
    let Some(scenario) = scenario else {
        return out;
    };

    let anchor = out
        .iter()
        .position(|section| section.kind == SectionKind::Constraints)
        .or_else(|| {
            out.iter()
                .position(|section| section.kind == SectionKind::Guidelines)
        })
        .unwrap_or(out.len());
    out.insert(
        anchor,
        PromptSection::new(SectionKind::Scenario, format!("{SCENARIO_PREFIX}{scenario}.")),
    );
    out
}

/// Replace every `{{KEY}}` whose key is known; unknown tokens are left alone.
pub fn fill_template(template: &str, variables: &[(&str, String)]) -> String {
    variables
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), value)
        })
}

fn structured_payload(
    team1: &Team,
    team2: &Team,
    tactic1: &Tactic,
    tactic2: &Tactic,
    rules: &MatchRules,
) -> Value {
    json!({
        "meta": {
            "instruction": "Usa esattamente questi nomi di squadre e giocatori nelle descrizioni",
            "min_events": rules.min_events,
            "max_events": rules.max_events,
        },
        "teams": [
            team_payload(team1, tactic1),
            team_payload(team2, tactic2),
        ],
    })
}

fn team_payload(team: &Team, tactic: &Tactic) -> Value {
    json!({
        "name": team.name,
        "tactic": tactic.as_str(),
        "roster": team.roster.iter().map(player_payload).collect::<Vec<_>>(),
    })
}

fn player_payload(player: &Player) -> Value {
    let or_unknown = |value: &str| {
        if value.trim().is_empty() {
            "N/D".to_string()
        } else {
            value.trim().to_string()
        }
    };
    json!({
        "name": or_unknown(&player.display_name),
        "role": or_unknown(&player.role),
    })
}

#[cfg(test)]
mod tests {
    use crate::simulation::rng::seeded;

    use super::*;

    fn teams() -> (Team, Team) {
        (
            Team::new(
                "Leoni",
                vec![Player::new("Marco Verdi", "Attaccante"), Player::new("Gino Neri", "Portiere")],
            ),
            Team::new("Falchi", vec![Player::new("Paolo Blu", "Difensore")]),
        )
    }

    fn scenario_lines(user: &str) -> usize {
        user.lines().filter(|line| line.starts_with(SCENARIO_PREFIX)).count()
    }

    #[test]
    fn user_prompt_contains_exactly_one_catalog_scenario() {
        let (home, away) = teams();
        for seed in 0..50 {
            let prompt = build_prompt(
                &home,
                &away,
                &Tactic::new("attacco"),
                &Tactic::default(),
                &MatchRules::default(),
                &mut seeded(seed),
            );
            assert_eq!(scenario_lines(&prompt.user), 1);
            let hits = SCENARIOS.iter().filter(|s| prompt.user.contains(*s)).count();
            assert_eq!(hits, 1, "seed {seed} rendered {hits} scenarios");
        }
    }

    #[test]
    fn scenario_precedes_constraints() {
        let (home, away) = teams();
        let prompt = build_prompt(
            &home,
            &away,
            &Tactic::default(),
            &Tactic::default(),
            &MatchRules::default(),
            &mut seeded(3),
        );
        let scenario_at = prompt.user.find(SCENARIO_PREFIX).unwrap();
        let constraints_at = prompt.user.find("Vincoli output").unwrap();
        assert!(scenario_at < constraints_at);
    }

    #[test]
    fn scenario_falls_back_to_guidelines_then_end() {
        let (home, away) = teams();
        let mut template = PromptTemplate::default();
        template.sections.retain(|s| s.kind != SectionKind::Constraints);
        let prompt = template.build(
            &home,
            &away,
            &Tactic::default(),
            &Tactic::default(),
            &MatchRules::default(),
            &mut seeded(4),
        );
        assert!(prompt.user.find(SCENARIO_PREFIX).unwrap() < prompt.user.find("Linee guida").unwrap());

        template.sections.retain(|s| s.kind == SectionKind::Intro);
        let prompt = template.build(
            &home,
            &away,
            &Tactic::default(),
            &Tactic::default(),
            &MatchRules::default(),
            &mut seeded(4),
        );
        let last_line = prompt.user.lines().last().unwrap();
        assert!(last_line.starts_with(SCENARIO_PREFIX));
    }

    #[test]
    fn empty_catalog_adds_no_scenario() {
        let (home, away) = teams();
        let template = PromptTemplate {
            scenarios: Vec::new(),
            ..PromptTemplate::default()
        };
        let prompt = template.build(
            &home,
            &away,
            &Tactic::default(),
            &Tactic::default(),
            &MatchRules::default(),
            &mut seeded(1),
        );
        assert_eq!(scenario_lines(&prompt.user), 0);
        assert!(prompt.scenario.is_none());
    }

    #[test]
    fn template_is_filled_with_names_tactics_rosters_and_bounds() {
        let (home, away) = teams();
        let rules = MatchRules { min_events: 8, max_events: 12 };
        let prompt = build_prompt(
            &home,
            &away,
            &Tactic::new("ATTACCO"),
            &Tactic::new("difesa"),
            &rules,
            &mut seeded(9),
        );
        assert!(prompt.user.contains("Leoni (casa, tattica: attacco)"));
        assert!(prompt.user.contains("Falchi (ospite, tattica: difesa)"));
        assert!(prompt.user.contains("Marco Verdi (Attaccante), Gino Neri (Portiere)"));
        assert!(prompt.user.contains("tra 8 e 12 azioni"));
        assert!(!prompt.user.contains("{{TEAM1_NAME}}"));
        assert!(prompt.user.contains("(es. {{...}})"));
    }

    #[test]
    fn payload_restates_exact_names_and_bounds() {
        let (home, away) = teams();
        let prompt = build_prompt(
            &home,
            &away,
            &Tactic::default(),
            &Tactic::new("difesa"),
            &MatchRules::default(),
            &mut seeded(2),
        );
        assert_eq!(prompt.payload["meta"]["min_events"], 10);
        assert_eq!(prompt.payload["meta"]["max_events"], 15);
        assert_eq!(prompt.payload["teams"][0]["name"], "Leoni");
        assert_eq!(prompt.payload["teams"][1]["tactic"], "difesa");
        assert_eq!(prompt.payload["teams"][0]["roster"][1]["name"], "Gino Neri");
    }

    #[test]
    fn fill_template_ignores_unknown_keys() {
        let out = fill_template("{{A}} e {{B}}", &[("A", "uno".to_string())]);
        assert_eq!(out, "uno e {{B}}");
    }
}
