//! Configuration sources
//!
//! A [`Source`] is a place configuration values come from: the command
//! line, the environment, a JSON file, or a fixed map in tests. Sources
//! produce a flat name-to-raw-string mapping; the registry turns raw
//! strings into typed values.

pub use cli::SourceCli;
pub use env::SourceEnv;
pub use json::SourceJson;

mod cli;
mod env;
mod json;

use std::collections::HashMap;

use crate::error::ConfigResult;
use crate::param::Param;

/// Provides raw values for declared configuration parameters
pub trait Source {
    /// Return the configured name → value pairs for the given declarations.
    ///
    /// Only parameters that the source actually found appear in the result;
    /// the registry applies defaults for the rest. The only truthy raw value
    /// for a bool parameter is `"true"`, every other value is false.
    fn resolve(&self, params: &[Param]) -> ConfigResult<HashMap<String, String>>;
}

/// Combines multiple sources into one.
///
/// Each source resolves in order and the results merge into a single map,
/// with later sources' values overwriting earlier ones on collision. Any
/// single source's failure aborts the whole resolution.
pub struct Sources(pub Vec<Box<dyn Source>>);

impl Source for Sources {
    fn resolve(&self, params: &[Param]) -> ConfigResult<HashMap<String, String>> {
        let mut vals = HashMap::new();
        for source in &self.0 {
            vals.extend(source.resolve(params)?);
        }
        Ok(vals)
    }
}

/// A source backed by a fixed map, for testing configuration handling
pub struct SourceStub(pub HashMap<String, String>);

impl SourceStub {
    /// Build a stub from (name, value) pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Source for SourceStub {
    fn resolve(&self, _params: &[Param]) -> ConfigResult<HashMap<String, String>> {
        Ok(self.0.clone())
    }
}
