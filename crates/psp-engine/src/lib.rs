//! Rule evaluation engine for PSP package validation.
//!
//! A [`RuleSet`] holds the immutable definitions of one fDMF version. A
//! [`Validator`] runs its enabled sections against a package, one rule at a
//! time, through a per-run [`Engine`] that owns variables and caches.

pub mod contract;
pub mod engine;
pub mod error;
pub mod function;
pub mod outcome;
pub mod pattern;
pub mod progress;
pub mod ruleset;
pub mod runner;
pub mod scope;
pub mod value;

pub use contract::{
    Bindings, Contract, ParamValue, PatternParam, PatternSource, ValueParam, ValueParamSpec,
};
pub use engine::Engine;
pub use error::{ContractViolation, ContractViolations, EngineError, PatternError};
pub use function::{EvaluationFunction, EvaluationKind, ValidationFunction, ValidationKind};
pub use outcome::{RuleOutcome, RunOutcome, SectionOutcome};
pub use pattern::{Expression, Pattern, ResolvedPattern};
pub use progress::{NoProgress, ProgressListener};
pub use ruleset::{
    Rule, RuleId, RuleSet, RuleSetBuilder, RulesSection, SectionId, VariableDefinition,
};
pub use runner::{RuleExecutor, Validator};
pub use scope::{PSP_DIR, ProvidedValues, VariableScope};
pub use value::{Value, ValueEvaluation, ValueType};
