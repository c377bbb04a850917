use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Singular design: rank {rank} < {columns} columns")]
    SingularDesign { rank: usize, columns: usize },

    #[error("Insufficient observations: {rows} rows for {columns} columns")]
    InsufficientObservations { rows: usize, columns: usize },

    #[error("Numerical failure: {reason}")]
    NumericalFailure { reason: String },

    #[error("Team '{team}' is not part of the team universe")]
    UnknownTeam { team: String },

    #[error("Degenerate run: none of {n_sims} replicates converged")]
    DegenerateRun { n_sims: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudyError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }

    pub fn numerical(reason: impl Into<String>) -> Self {
        Self::NumericalFailure { reason: reason.into() }
    }
}

pub type StudyResult<T> = Result<T, StudyError>;
