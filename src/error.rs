use thiserror::Error;

/// Failure modes of the remote simulator. The facade turns every one of them
/// into a local simulation, so none of these reach HTTP callers.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("LLM not configured: {0}")]
    Config(String),

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM response format error: {0}")]
    Format(String),
}

impl SimulationError {
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::Transport(format!("HTTP {status}: {body}"))
    }
}

impl From<reqwest::Error> for SimulationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid match rules: {0}")]
    Rules(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LeagueError {
    #[error("Email mancante")]
    MissingEmail,

    #[error("Nome squadra mancante")]
    MissingTeamName,

    #[error("Squadra non trovata per {0}")]
    TeamNotFound(String),

    #[error("Giocatore {0} non trovato")]
    PlayerNotFound(u32),

    #[error("Non puoi ingaggiare un giocatore già appartenente a un'altra squadra")]
    PlayerAlreadySigned(u32),

    #[error("Il giocatore {0} non fa parte della tua rosa")]
    PlayerNotInRoster(u32),

    #[error("Budget superato: il valore totale dei giocatori non può superare {limit} milioni")]
    BudgetExceeded { limit: u32 },

    #[error("Una squadra non può sfidare se stessa")]
    SameTeam,

    #[error("Partita {0} non trovata")]
    MatchNotFound(u32),

    #[error("Non sei autorizzato a gestire questa partita")]
    NotParticipant,

    #[error("La partita è già terminata")]
    AlreadyFinished,

    #[error("La partita è già in corso")]
    InProgress,

    #[error("Entrambe le squadre devono essere pronte per iniziare la partita")]
    NotReady { home_ready: bool, away_ready: bool },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
