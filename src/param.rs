//! Parameter value storage types.

use std::collections::HashMap;

/// A named parameter assignment, as handed to the scoring function and
/// returned from the result accessors.
///
/// Keys are the names declared on the [`Domain`](crate::domain::Domain);
/// values carry the parameter's kind.
pub type Pars = HashMap<String, ParamValue>;

/// Represents a single scalar parameter value.
///
/// Continuous parameters hold `Float`, integer parameters hold `Int`.
/// Use [`as_f64`](ParamValue::as_f64) where a uniform numeric view is
/// needed (e.g. feeding values back into the surrogate's input space).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    /// A floating-point (continuous) parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
}

impl ParamValue {
    /// Returns the value as `f64` regardless of variant.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Float(v) => *v,
            ParamValue::Int(v) => *v as f64,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
        }
    }
}
