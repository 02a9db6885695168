//! Classroom rules for student-written SQL. Only the four DML/query verbs are
//! allowed; destructive statements need a WHERE clause and must target the
//! student's own team.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    #[error("Query vuota")]
    Empty,

    #[error("Solo SELECT, INSERT, DELETE o UPDATE sono consentiti in questa lezione")]
    NotAllowed,

    #[error("Le query DELETE e UPDATE devono includere una clausola WHERE")]
    MissingWhere,

    #[error("L'ID della tua squadra ({team_id}) deve comparire nella query")]
    ForeignTeam { team_id: u32 },
}

pub fn classify(query: &str) -> Result<QueryKind, QueryRejection> {
    let lower = query.trim().to_lowercase();
    if lower.is_empty() {
        return Err(QueryRejection::Empty);
    }
    if lower.starts_with("select") {
        Ok(QueryKind::Select)
    } else if lower.starts_with("insert") {
        Ok(QueryKind::Insert)
    } else if lower.starts_with("update") {
        Ok(QueryKind::Update)
    } else if lower.starts_with("delete") {
        Ok(QueryKind::Delete)
    } else {
        Err(QueryRejection::NotAllowed)
    }
}

pub fn check_query(query: &str, team_id: u32) -> Result<QueryKind, QueryRejection> {
    let kind = classify(query)?;
    let lower = query.trim().to_lowercase();

    if matches!(kind, QueryKind::Update | QueryKind::Delete) && !lower.contains("where") {
        return Err(QueryRejection::MissingWhere);
    }

    // Updates are league-wide (e.g. flagging a player as signed).
    if matches!(kind, QueryKind::Insert | QueryKind::Delete) && !query.contains(&team_id.to_string()) {
        return Err(QueryRejection::ForeignTeam { team_id });
    }

    Ok(kind)
}
