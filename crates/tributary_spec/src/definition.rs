//! Declarative rule definitions, as written in pipeline config files.
//!
//! A definition is data; [`compile`] turns it into a [`ValidationSpec`] and
//! rejects anything it does not understand before a single record is seen.

use crate::predicate::{self, Predicate};
use crate::rule::{FieldRule, Rule};
use crate::spec::ValidationSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tributary_core::{CoreError, CoreResult};

/// Field name to rule definition, in evaluation order
pub type SpecDef = IndexMap<String, RuleDef>;

/// One field's rule as written in config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    /// `integer`, `string`, `number`, `float`, `boolean` or `object`
    #[serde(rename = "type")]
    pub kind: String,
    /// Apply the rule to every element of a sequence
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeated: bool,
    /// Value must be strictly greater than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    /// Value must be at least this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// String must match this regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Nested rules, only for `object`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: SpecDef,
}

/// Compile a spec definition.
///
/// `owner` prefixes field paths in error messages.
///
/// # Errors
///
/// Returns a configuration error for an unknown rule type, an `object`
/// without fields, fields on a scalar type, a constraint that does not fit
/// the type, or a pattern that does not compile
pub fn compile(def: &SpecDef, owner: &str) -> CoreResult<ValidationSpec> {
    let mut builder = ValidationSpec::builder();
    for (name, rule_def) in def {
        let path = format!("{}.{}", owner, name);
        let rule = compile_rule(rule_def, &path)?;
        let field = if rule_def.repeated {
            FieldRule::repeated(rule)
        } else {
            FieldRule::single(rule)
        };
        builder = builder.rule(name.clone(), field);
    }
    Ok(builder.build())
}

fn compile_rule(def: &RuleDef, path: &str) -> CoreResult<Rule> {
    if def.kind == "object" {
        if def.fields.is_empty() {
            return Err(CoreError::config(path, "object rule needs at least one field"));
        }
        if def.exclusive_minimum.is_some() || def.minimum.is_some() || def.pattern.is_some() {
            return Err(CoreError::config(path, "object rule takes no value constraints"));
        }
        return Ok(Rule::Nested(compile(&def.fields, path)?));
    }

    if !def.fields.is_empty() {
        return Err(CoreError::config(
            path,
            format!("'{}' rule cannot have nested fields", def.kind),
        ));
    }

    let numeric = matches!(def.kind.as_str(), "integer" | "number" | "float");
    let mut rule = match def.kind.as_str() {
        "integer" => predicate::is_integer(),
        "number" => predicate::is_number(),
        "float" => predicate::is_float(),
        "string" => predicate::is_string(),
        "boolean" => predicate::is_bool(),
        other => {
            return Err(CoreError::config(
                path,
                format!("unsupported rule type '{}'", other),
            ));
        }
    };

    if let Some(bound) = def.exclusive_minimum {
        rule = rule.and(numeric_bound(numeric, path, || predicate::exclusive_minimum(bound))?);
    }
    if let Some(bound) = def.minimum {
        rule = rule.and(numeric_bound(numeric, path, || predicate::minimum(bound))?);
    }
    if let Some(pattern) = &def.pattern {
        if def.kind != "string" {
            return Err(CoreError::config(path, "pattern only applies to strings"));
        }
        let matcher = predicate::matches(pattern).map_err(|e| match e {
            CoreError::Configuration { reason, .. } => CoreError::config(path, reason),
            other => other,
        })?;
        rule = rule.and(matcher);
    }

    Ok(Rule::Predicate(rule))
}

fn numeric_bound(
    numeric: bool,
    path: &str,
    make: impl FnOnce() -> Predicate,
) -> CoreResult<Predicate> {
    if numeric {
        Ok(make())
    } else {
        Err(CoreError::config(path, "minimum only applies to numeric types"))
    }
}
