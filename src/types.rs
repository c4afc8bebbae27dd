//! Parameter type tags
//!
//! Every parameter carries a `ParamType` describing how raw string values
//! convert into its typed slot and how values found in a JSON config
//! document render back into the raw string form the rest of the pipeline
//! understands.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxedError;

/// Converts a JSON document value into the raw string form a parameter's
/// parser expects. [`json_string_as_is`] and [`json_string_unquote`] are the
/// two stock implementations.
pub type StringifyFn = Arc<dyn Fn(&Value) -> Result<String, BoxedError> + Send + Sync>;

/// Type tag of a configuration parameter
#[derive(Clone)]
pub enum ParamType {
    /// Plain string, used as-is
    String,
    /// 32-bit signed decimal integer
    Int,
    /// 64-bit signed decimal integer
    Int64,
    /// Boolean; the literal `"true"` is the only truthy raw value
    Bool,
    /// Duration in the grammar of [`parse_duration`](crate::parse_duration)
    Duration,
    /// Structured payload deserialized from a JSON string
    Json,
    /// Caller-registered type, produced by
    /// [`ConfigRegistry::register_param_type`](crate::ConfigRegistry::register_param_type)
    Custom(CustomKind),
}

impl ParamType {
    /// The tag string identifying this type
    pub fn tag(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Int64 => "int64",
            ParamType::Bool => "bool",
            ParamType::Duration => "duration",
            ParamType::Json => "json",
            ParamType::Custom(kind) => kind.tag(),
        }
    }

    /// Whether this is the boolean tag, which command-line token handling
    /// treats specially
    pub fn is_bool(&self) -> bool {
        matches!(self, ParamType::Bool)
    }

    /// Render a JSON document value into the raw string form this type's
    /// parser expects.
    ///
    /// String-like values (string, duration) must be JSON strings and are
    /// unquoted; everything else passes through as its JSON text.
    pub fn json_string(&self, value: &Value) -> Result<String, BoxedError> {
        match self {
            ParamType::String | ParamType::Duration => json_string_unquote(value),
            ParamType::Int | ParamType::Int64 | ParamType::Bool | ParamType::Json => {
                json_string_as_is(value)
            }
            ParamType::Custom(kind) => (kind.stringify)(value),
        }
    }

    pub(crate) fn is_known_tag(tag: &str) -> bool {
        matches!(tag, "string" | "int" | "int64" | "bool" | "duration" | "json")
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl PartialEq for ParamType {
    fn eq(&self, other: &Self) -> bool {
        // tags are identity: a tag can only be registered once per registry
        self.tag() == other.tag()
    }
}

impl Eq for ParamType {}

/// A caller-registered parameter type: its tag plus the stringify capability
/// the JSON file source needs
#[derive(Clone)]
pub struct CustomKind {
    tag: Arc<str>,
    stringify: StringifyFn,
}

impl CustomKind {
    pub(crate) fn new(tag: &str, stringify: StringifyFn) -> Self {
        Self {
            tag: Arc::from(tag),
            stringify,
        }
    }

    /// The tag string this type was registered under
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for CustomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomKind").field("tag", &self.tag).finish()
    }
}

/// Stringify a JSON value by passing its JSON text through unchanged.
///
/// Used for values whose flat-string form is the same as their JSON form,
/// like numbers and booleans: the raw string `10` and the JSON number `10`
/// read identically.
pub fn json_string_as_is(value: &Value) -> Result<String, BoxedError> {
    Ok(value.to_string())
}

/// Stringify a JSON value by unquoting it.
///
/// Used for values whose JSON form is a quoted string: a string parameter
/// arriving from the command line as `foo` appears in a JSON document as
/// `"foo"` and needs the quoting stripped.
pub fn json_string_unquote(value: &Value) -> Result<String, BoxedError> {
    match value.as_str() {
        Some(s) => Ok(s.to_owned()),
        None => Err(format!("expected json string, got: {}", value).into()),
    }
}

/// Convert a raw string into a boolean. The literal `"true"` is the only
/// truthy value; everything else, including the empty string, is false.
pub(crate) fn parse_bool(raw: &str) -> bool {
    raw == "true"
}
