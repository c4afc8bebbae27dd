//! Parameter declarations and value handles
//!
//! A [`Param`] is everything a source needs to know about one declared
//! configuration option. A [`ParamHandle`] is the caller's side of the
//! declaration: a cheaply clonable handle over the slot the resolution pass
//! fills in.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::types::ParamType;

/// Everything a source needs to know about a single declared configuration
/// parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Type tag controlling parsing and JSON stringification
    pub param_type: ParamType,

    /// Name of the parameter, e.g. "listen-addr" or "img-file"
    pub name: String,

    /// Default value of the param, as a string. If this param is going to be
    /// parsed as something else, like an int, the default string should also
    /// be parsable as that type.
    ///
    /// Boolean parameters use `"true"` for a true default and the empty
    /// string for a false one.
    pub default: String,

    /// Short description of the parameter's usage
    pub usage: String,

    /// True if the parameter must be provided by a source
    pub required: bool,
}

/// Handle to a declared parameter's value slot.
///
/// Returned by the declaration methods on
/// [`ConfigRegistry`](crate::ConfigRegistry). The slot is written during
/// [`parse`](crate::ConfigRegistry::parse) and read afterwards with
/// [`get`](ParamHandle::get). Clones share the same slot.
pub struct ParamHandle<T> {
    inner: Arc<HandleInner<T>>,
}

struct HandleInner<T> {
    name: String,
    cell: OnceLock<T>,
}

impl<T> ParamHandle<T> {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name: name.to_owned(),
                cell: OnceLock::new(),
            }),
        }
    }

    /// Name of the parameter this handle belongs to
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The resolved value.
    ///
    /// # Panics
    ///
    /// Panics if called before a resolution pass has filled the slot.
    pub fn get(&self) -> &T {
        match self.inner.cell.get() {
            Some(value) => value,
            None => panic!(
                "parameter {:?} read before it was resolved",
                self.inner.name
            ),
        }
    }

    /// The resolved value, or `None` if no resolution pass has filled the
    /// slot yet
    pub fn try_get(&self) -> Option<&T> {
        self.inner.cell.get()
    }

    /// Write the resolved value. Writes after the first are ignored; the
    /// slot is only offered a second value when a failed resolution pass is
    /// retried, in which case the first value stands.
    pub(crate) fn fill(&self, value: T) {
        let _ = self.inner.cell.set(value);
    }
}

impl<T> Clone for ParamHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ParamHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamHandle")
            .field("name", &self.inner.name)
            .field("value", &self.inner.cell.get())
            .finish()
    }
}

/// Join name segments with `-`, skipping empty segments.
///
/// Useful for building families of related parameter names:
///
/// ```
/// use windup::prefixed;
///
/// assert_eq!(prefixed(&["redis", "addr"]), "redis-addr");
/// assert_eq!(prefixed(&["", "addr"]), "addr");
/// ```
pub fn prefixed(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("-")
}
