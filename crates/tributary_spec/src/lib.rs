//! Tributary Spec Validator
//!
//! Checks arbitrarily nested records against a composable rule tree.
//! A spec maps field names to rules; a rule is either a predicate over one
//! value or a nested spec. Every field named by a spec is required, and
//! evaluation stops at the first failing field.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod definition;
pub mod predicate;
pub mod rule;
pub mod spec;

pub use definition::{RuleDef, SpecDef, compile};
pub use predicate::Predicate;
pub use rule::{Cardinality, FieldRule, Rule};
pub use spec::{Filtered, RejectReason, Rejection, SpecBuilder, ValidationSpec, validate};
