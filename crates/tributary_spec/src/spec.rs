//! Validation specs and the recursive checker.

use crate::predicate::Predicate;
use crate::rule::{Cardinality, FieldRule, Rule};
use indexmap::IndexMap;
use serde_json::Value;
use tributary_core::Record;

/// Mapping of required field name to rule.
///
/// Fields are checked in insertion order and the first failure ends the
/// check, so later fields of a rejected record are never evaluated.
#[derive(Debug, Clone, Default)]
pub struct ValidationSpec {
    fields: IndexMap<String, FieldRule>,
}

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Required field absent
    Missing,
    /// Predicate returned false
    Failed,
    /// Nested spec applied to something other than a mapping
    NotAMapping,
    /// Repeated rule applied to something other than a sequence
    NotASequence,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Failed => write!(f, "failed check"),
            Self::NotAMapping => write!(f, "not a mapping"),
            Self::NotASequence => write!(f, "not a sequence"),
        }
    }
}

/// First failing field of a rejected record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Dotted path to the field, with `[i]` for sequence elements
    pub field: String,
    /// What went wrong there
    pub reason: RejectReason,
}

impl Rejection {
    fn at(field: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    fn under(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else if self.field.starts_with('[') {
            format!("{}{}", parent, self.field)
        } else {
            format!("{}.{}", parent, self.field)
        };
        self
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field '{}' {}", self.field, self.reason)
    }
}

/// Records split by a spec
#[derive(Debug, Clone, Default)]
pub struct Filtered {
    /// Records that passed, in input order
    pub accepted: Vec<Record>,
    /// Records that failed, with their first failure
    pub rejected: Vec<(Record, Rejection)>,
}

impl ValidationSpec {
    /// Start building a spec
    #[must_use]
    pub fn builder() -> SpecBuilder {
        SpecBuilder::default()
    }

    /// Field rules in evaluation order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of required fields at this level
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the spec requires nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `item` satisfies every rule
    #[must_use]
    pub fn check(&self, item: &Record) -> bool {
        self.first_rejection(item).is_none()
    }

    /// The first failing field of `item`, or `None` if it is valid
    #[must_use]
    pub fn first_rejection(&self, item: &Record) -> Option<Rejection> {
        for (key, field) in &self.fields {
            let Some(value) = item.get(key) else {
                return Some(Rejection::at(key.as_str(), RejectReason::Missing));
            };
            if let Some(rejection) = check_field(field, value) {
                return Some(rejection.under(key));
            }
        }
        None
    }

    /// Split records into accepted and rejected, preserving order
    #[must_use]
    pub fn filter(&self, records: Vec<Record>) -> Filtered {
        let mut out = Filtered::default();
        for record in records {
            match self.first_rejection(&record) {
                None => out.accepted.push(record),
                Some(rejection) => out.rejected.push((record, rejection)),
            }
        }
        out
    }
}

/// Check one record against a spec
#[must_use]
pub fn validate(spec: &ValidationSpec, item: &Record) -> bool {
    spec.check(item)
}

// Returned paths are relative to the field; the caller prefixes the key.
fn check_field(field: &FieldRule, value: &Value) -> Option<Rejection> {
    match field.cardinality {
        Cardinality::Single => check_rule(&field.rule, value),
        Cardinality::Repeated => {
            let Some(items) = value.as_array() else {
                return Some(Rejection::at("", RejectReason::NotASequence));
            };
            items.iter().enumerate().find_map(|(i, item)| {
                check_rule(&field.rule, item).map(|r| r.under(&format!("[{}]", i)))
            })
        }
    }
}

fn check_rule(rule: &Rule, value: &Value) -> Option<Rejection> {
    match rule {
        Rule::Predicate(predicate) => {
            (!predicate.test(value)).then(|| Rejection::at("", RejectReason::Failed))
        }
        Rule::Nested(spec) => match value.as_object() {
            Some(nested) => spec.first_rejection(nested),
            None => Some(Rejection::at("", RejectReason::NotAMapping)),
        },
    }
}

/// Builder for [`ValidationSpec`]
#[derive(Debug, Clone, Default)]
pub struct SpecBuilder {
    fields: IndexMap<String, FieldRule>,
}

impl SpecBuilder {
    /// Require a field satisfying a predicate
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.fields
            .insert(name.into(), FieldRule::single(Rule::Predicate(predicate)));
        self
    }

    /// Require a sequence field whose every element satisfies a predicate
    #[must_use]
    pub fn repeated(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.fields
            .insert(name.into(), FieldRule::repeated(Rule::Predicate(predicate)));
        self
    }

    /// Require a nested mapping satisfying a spec
    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, spec: ValidationSpec) -> Self {
        self.fields
            .insert(name.into(), FieldRule::single(Rule::Nested(spec)));
        self
    }

    /// Require a sequence of mappings each satisfying a spec
    #[must_use]
    pub fn repeated_nested(mut self, name: impl Into<String>, spec: ValidationSpec) -> Self {
        self.fields
            .insert(name.into(), FieldRule::repeated(Rule::Nested(spec)));
        self
    }

    /// Add an already-built field rule
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> ValidationSpec {
        ValidationSpec {
            fields: self.fields,
        }
    }
}
