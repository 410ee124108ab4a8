//! Detection engines.
//!
//! Concrete implementations of the scoring oracles consumed by the
//! mediation engine: a heuristic prompt-injection scorer and a regex
//! sensitive-entity recognizer with redaction.

pub mod injection;
pub mod sensitive;

pub use injection::HeuristicInjectionScorer;
pub use sensitive::RegexSensitiveScorer;
