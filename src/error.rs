use thiserror::Error;

pub type Result<T, E = SimError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("reaction network must contain at least one reaction")]
    EmptyNetwork,
    #[error("reaction {reaction} has invalid rate constant {rate} (must be finite and >= 0)")]
    InvalidRate { reaction: usize, rate: f64 },
    #[error(
        "reaction {reaction} lists species '{species}' with non-positive multiplicity {multiplicity}"
    )]
    InvalidMultiplicity {
        reaction: usize,
        species: String,
        multiplicity: i64,
    },
    #[error("reaction {reaction} contains an empty species name")]
    EmptySpeciesName { reaction: usize },
    #[error("count for species '{species}' is negative ({count})")]
    NegativeCount { species: String, count: i64 },
    #[error("state was not built for this reaction network")]
    StateMismatch,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// Errors raised while reading the reaction and initial-count text formats.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected `reactants : products : rate`, found {found} field(s)")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: stoichiometry must be `species count` pairs")]
    OddTokens { line: usize },
    #[error("line {line}: invalid multiplicity '{token}'")]
    InvalidMultiplicity { line: usize, token: String },
    #[error("line {line}: invalid rate constant '{token}'")]
    InvalidRate { line: usize, token: String },
    #[error("line {line}: invalid species count '{token}'")]
    InvalidCount { line: usize, token: String },
    #[error("no {what} found")]
    Empty { what: &'static str },
}
