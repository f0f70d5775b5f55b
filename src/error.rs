use thiserror::Error;

/// Error type shared by every stage of the engine, from network construction to export.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("species `{0}` is declared more than once")]
    DuplicateSpecies(String),

    #[error("reaction `{0}` is declared more than once")]
    DuplicateReaction(String),

    #[error("reaction `{reaction}` references undeclared species `{species}`")]
    UnknownSpecies { reaction: String, species: String },

    #[error("no species named `{0}`")]
    NoSuchSpecies(String),

    #[error("reaction `{reaction}` has invalid rate constant {rate}")]
    InvalidRate { reaction: String, rate: f64 },

    #[error("cannot parse formula `{formula}`: {reason}")]
    Formula { formula: String, reason: String },

    #[error("reaction `{reaction}` gives species `{species}` a zero coefficient")]
    ZeroCoefficient { reaction: String, species: String },

    #[error("network `{0}` declares no species")]
    EmptyNetwork(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid save points: {0}")]
    InvalidSavePoints(String),

    #[error("reaction `{reaction}` would drive species `{species}` below zero")]
    NegativePopulation { reaction: String, species: String },

    #[error("all trial workers disconnected before the ensemble finished")]
    WorkersDisconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
