//! Predicates over single JSON values.

use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tributary_core::{CoreError, CoreResult};

type TestFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A named boolean test over one value
#[derive(Clone)]
pub struct Predicate {
    name: Cow<'static, str>,
    test: Arc<TestFn>,
}

impl Predicate {
    /// Wrap a closure as a predicate
    pub fn new<F>(name: impl Into<Cow<'static, str>>, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    /// Name used in logs and debug output
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the predicate
    #[must_use]
    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    /// Both predicates must hold; `other` is not evaluated if `self` fails
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        let name = format!("{} && {}", self.name, other.name);
        Predicate::new(name, move |v| self.test(v) && other.test(v))
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// Value is a JSON integer
#[must_use]
pub fn is_integer() -> Predicate {
    Predicate::new("integer", |v| v.is_i64() || v.is_u64())
}

/// Value is a JSON string
#[must_use]
pub fn is_string() -> Predicate {
    Predicate::new("string", Value::is_string)
}

/// Value is any JSON number
#[must_use]
pub fn is_number() -> Predicate {
    Predicate::new("number", Value::is_number)
}

/// Value is a JSON number written with a fractional part or exponent
#[must_use]
pub fn is_float() -> Predicate {
    Predicate::new("float", Value::is_f64)
}

/// Value is a JSON boolean
#[must_use]
pub fn is_bool() -> Predicate {
    Predicate::new("boolean", Value::is_boolean)
}

/// Integer strictly greater than zero
#[must_use]
pub fn positive_integer() -> Predicate {
    is_integer().and(exclusive_minimum(0.0))
}

/// Float strictly greater than zero
#[must_use]
pub fn positive_float() -> Predicate {
    is_float().and(exclusive_minimum(0.0))
}

/// Number strictly greater than `bound`; non-numbers fail
#[must_use]
pub fn exclusive_minimum(bound: f64) -> Predicate {
    Predicate::new(format!("> {}", bound), move |v| {
        v.as_f64().is_some_and(|n| n > bound)
    })
}

/// Number greater than or equal to `bound`; non-numbers fail
#[must_use]
pub fn minimum(bound: f64) -> Predicate {
    Predicate::new(format!(">= {}", bound), move |v| {
        v.as_f64().is_some_and(|n| n >= bound)
    })
}

/// String matching a regular expression; non-strings fail.
///
/// The pattern is used as written, anchor it to match the whole value.
///
/// # Errors
///
/// Returns a configuration error if the pattern does not compile
pub fn matches(pattern: &str) -> CoreResult<Predicate> {
    let re = regex::Regex::new(pattern)
        .map_err(|e| CoreError::config("pattern", format!("invalid regex '{}': {}", pattern, e)))?;
    Ok(Predicate::new(format!("~ /{}/", pattern), move |v| {
        v.as_str().is_some_and(|s| re.is_match(s))
    }))
}
