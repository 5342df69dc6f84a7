//! Field rules: what to check and how many values to check it on.

use crate::predicate::Predicate;
use crate::spec::ValidationSpec;

/// What a field must satisfy
#[derive(Debug, Clone)]
pub enum Rule {
    /// Test applied to the value itself
    Predicate(Predicate),
    /// Spec applied recursively to a nested record
    Nested(ValidationSpec),
}

/// How many values a field holds.
///
/// Fixed when the spec is built so the validator never inspects the shape
/// of incoming data to decide how to apply a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    /// The rule applies to the value as-is
    #[default]
    Single,
    /// The value must be a sequence; the rule applies to every element
    Repeated,
}

/// A rule bound to a cardinality
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// What to check
    pub rule: Rule,
    /// How to apply it
    pub cardinality: Cardinality,
}

impl FieldRule {
    /// A single-valued rule
    #[must_use]
    pub fn single(rule: Rule) -> Self {
        Self {
            rule,
            cardinality: Cardinality::Single,
        }
    }

    /// A repeated rule
    #[must_use]
    pub fn repeated(rule: Rule) -> Self {
        Self {
            rule,
            cardinality: Cardinality::Repeated,
        }
    }
}

impl From<Predicate> for Rule {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

impl From<ValidationSpec> for Rule {
    fn from(spec: ValidationSpec) -> Self {
        Self::Nested(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::is_integer;

    #[test]
    fn test_default_cardinality() {
        assert_eq!(Cardinality::default(), Cardinality::Single);
    }

    #[test]
    fn test_field_rule_constructors() {
        let single = FieldRule::single(is_integer().into());
        assert_eq!(single.cardinality, Cardinality::Single);

        let repeated = FieldRule::repeated(ValidationSpec::builder().build().into());
        assert_eq!(repeated.cardinality, Cardinality::Repeated);
        assert!(matches!(repeated.rule, Rule::Nested(_)));
    }
}
