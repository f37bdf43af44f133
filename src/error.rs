//! Domain error taxonomy for expansion, scoring, and similarity

use thiserror::Error;

/// Errors produced by the ranking core.
///
/// Orchestration code (CLI, service wiring) wraps these in `anyhow`, but the
/// domain modules keep the category visible so callers can decide whether to
/// reject, recover, or retry with a different policy.
#[derive(Debug, Error)]
pub enum RankError {
    /// Rejected before any collaborator call; never retried.
    #[error("invalid input: {0}")]
    Input(String),

    /// Every token of the working set fell outside the embedding vocabulary.
    #[error("no query token found in the embedding vocabulary")]
    VocabularyMiss,

    /// The corpus fetch for the scored token set came back empty.
    #[error("no documents in the corpus match the query tokens")]
    NoRelevantDocuments,

    /// Zero-norm vector reached a cosine computation.
    #[error("degenerate vector: zero norm")]
    DegenerateVector,

    /// The expansion-weight denominator summed to zero.
    #[error("degenerate weighting: expansion similarities sum to zero")]
    DegenerateWeighting,

    /// Scoring policy name not among the five known policies. Fatal.
    #[error("unknown scoring function: {0}")]
    UnknownScoringFunction(String),

    /// Weighting parameters supplied to an unweighted policy, or missing
    /// from a weighted one.
    #[error("argument mismatch for scoring function {policy}: {reason}")]
    ArgumentMismatch { policy: String, reason: String },

    /// Embedding oracle or corpus store failed; surfaced immediately,
    /// no retry inside the core.
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl RankError {
    pub fn input(msg: impl Into<String>) -> Self {
        RankError::Input(msg.into())
    }

    pub fn collaborator(msg: impl Into<String>) -> Self {
        RankError::Collaborator(msg.into())
    }
}
