use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::league;
use crate::server;
use crate::simulation::{
    build_prompt, rng, MatchSimulator, Player, SimRng, SimulationOutcome, Tactic, Team,
};

#[derive(Debug, Parser)]
#[command(name = "calcio", version, about = "Football match simulation backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API and static frontend.
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Simulate one match and print the result as JSON.
    Simulate {
        #[command(flatten)]
        fixture: FixtureArgs,
        /// Skip the remote model.
        #[arg(long)]
        local: bool,
        #[arg(long)]
        table: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the prompt that would be sent for a fixture.
    Prompt {
        #[command(flatten)]
        fixture: FixtureArgs,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Check a lesson query against the SQL rules.
    CheckQuery {
        #[arg(long)]
        team_id: u32,
        sql: String,
    },
}

#[derive(Debug, Args)]
pub struct FixtureArgs {
    #[arg(long)]
    pub home: String,
    #[arg(long)]
    pub away: String,
    #[arg(long)]
    pub home_tactic: Option<String>,
    #[arg(long)]
    pub away_tactic: Option<String>,
    /// Home roster entry as `name:role`; repeatable.
    #[arg(long = "home-player")]
    pub home_players: Vec<String>,
    /// Away roster entry as `name:role`; repeatable.
    #[arg(long = "away-player")]
    pub away_players: Vec<String>,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl FixtureArgs {
    fn teams(&self) -> (Team, Team) {
        (
            Team::new(self.home.as_str(), parse_roster(&self.home_players)),
            Team::new(self.away.as_str(), parse_roster(&self.away_players)),
        )
    }

    fn tactics(&self) -> (Tactic, Tactic) {
        (
            Tactic::from_optional(self.home_tactic.as_deref()),
            Tactic::from_optional(self.away_tactic.as_deref()),
        )
    }

    fn rng(&self) -> SimRng {
        match self.seed {
            Some(seed) => rng::seeded(seed),
            None => rng::from_entropy(),
        }
    }
}

fn parse_roster(entries: &[String]) -> Vec<Player> {
    entries
        .iter()
        .map(|entry| match entry.split_once(':') {
            Some((name, role)) => Player::new(name.trim(), role.trim()),
            None => Player::new(entry.trim(), ""),
        })
        .collect()
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 2 } else { 0 };
            if err.print().is_err() {
                eprintln!("{err}");
            }
            return code;
        }
    };

    match cli.command {
        Command::Serve { bind, config } => handle_serve(bind, config),
        Command::Simulate {
            fixture,
            local,
            table,
            config,
        } => handle_simulate(&fixture, local, table, config),
        Command::Prompt { fixture, config } => handle_prompt(&fixture, config),
        Command::CheckQuery { team_id, sql } => handle_check_query(team_id, &sql),
    }
}

fn load_config(path: Option<PathBuf>) -> Option<AppConfig> {
    match AppConfig::load(path.as_deref()) {
        Ok(config) => Some(config),
        Err(err) => {
            eprintln!("configuration error: {err}");
            None
        }
    }
}

fn runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => Some(runtime),
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            None
        }
    }
}

fn handle_serve(bind: Option<String>, config: Option<PathBuf>) -> i32 {
    let Some(mut config) = load_config(config) else {
        return 1;
    };
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    let Some(runtime) = runtime() else {
        return 1;
    };

    match runtime.block_on(server::run_server(config)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_simulate(fixture: &FixtureArgs, local: bool, table: bool, config: Option<PathBuf>) -> i32 {
    let Some(config) = load_config(config) else {
        return 1;
    };
    let simulator = match MatchSimulator::from_config(&config) {
        Ok(simulator) => simulator,
        Err(err) => {
            eprintln!("failed to build http client: {err}");
            return 1;
        }
    };

    let (home, away) = fixture.teams();
    let (home_tactic, away_tactic) = fixture.tactics();
    let mut rng = fixture.rng();

    let outcome = if local {
        simulator.simulate_local(&home, &away, &home_tactic, &away_tactic, &mut rng)
    } else {
        let Some(runtime) = runtime() else {
            return 1;
        };
        runtime.block_on(simulator.simulate_seeded(
            &home,
            &away,
            &home_tactic,
            &away_tactic,
            &mut rng,
        ))
    };

    if table {
        print_table(&outcome);
        return 0;
    }
    match serde_json::to_string_pretty(&outcome) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize simulation result: {err}");
            1
        }
    }
}

fn print_table(outcome: &SimulationOutcome) {
    let result = &outcome.result;
    println!("{}", result.score_string);
    println!("minute\ttype\tdescription");
    for event in &result.events {
        println!("{}\t{}\t{}", event.minute, event.kind.label(), event.description);
    }
}

fn handle_prompt(fixture: &FixtureArgs, config: Option<PathBuf>) -> i32 {
    let Some(config) = load_config(config) else {
        return 1;
    };
    let (home, away) = fixture.teams();
    let (home_tactic, away_tactic) = fixture.tactics();
    let mut rng = fixture.rng();
    let prompt = build_prompt(
        &home,
        &away,
        &home_tactic,
        &away_tactic,
        &config.simulation,
        &mut rng,
    );

    println!("{}\n", prompt.system);
    println!("{}\n", prompt.user);
    match serde_json::to_string_pretty(&prompt.payload) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize prompt payload: {err}");
            1
        }
    }
}

fn handle_check_query(team_id: u32, sql: &str) -> i32 {
    match league::check_query(sql, team_id) {
        Ok(kind) => {
            println!("query accepted: {kind:?}");
            0
        }
        Err(err) => {
            eprintln!("query rejected: {err}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roster_entries_split_on_colon() {
        let roster = parse_roster(&args(&["Luca Rossi:Portiere", "Solo"]));
        assert_eq!(roster[0], Player::new("Luca Rossi", "Portiere"));
        assert_eq!(roster[1].role, "");
    }

    #[test]
    fn missing_subcommand_is_usage_error() {
        assert_eq!(run_with_args(&args(&["calcio"])), 2);
        assert_eq!(run_with_args(&args(&["calcio", "bogus"])), 2);
    }

    #[test]
    fn check_query_exit_codes() {
        assert_eq!(
            run_with_args(&args(&["calcio", "check-query", "--team-id", "3", "SELECT * FROM giocatori"])),
            0
        );
        assert_eq!(
            run_with_args(&args(&["calcio", "check-query", "--team-id", "3", "DROP TABLE squadre"])),
            1
        );
    }
}
