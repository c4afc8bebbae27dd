//! JSON config file source
//!
//! Wraps an inner source and adds a `config-json-file` parameter naming a
//! JSON file to read further values out of. Values from the inner source
//! overwrite values found in the file, so environment and command-line
//! settings always win over file contents.

use std::collections::HashMap;
use std::fs;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::param::Param;
use crate::source::Source;
use crate::types::ParamType;

const FILE_PARAM: &str = "config-json-file";

/// Source layering a JSON config file underneath an inner source.
///
/// The file must hold a single JSON object. Each declared parameter is
/// looked up by its lower-cased name; a missing key or an explicit `null`
/// leaves the parameter untouched. Found values are rendered into raw
/// string form through the parameter's type.
pub struct SourceJson {
    inner: Box<dyn Source>,
}

impl SourceJson {
    /// Wrap an inner source, adding the `config-json-file` parameter to the
    /// declarations it resolves
    pub fn new<S: Source + 'static>(inner: S) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Source for SourceJson {
    fn resolve(&self, params: &[Param]) -> ConfigResult<HashMap<String, String>> {
        let mut extended = params.to_vec();
        extended.push(Param {
            param_type: ParamType::String,
            name: FILE_PARAM.to_owned(),
            default: String::new(),
            usage: "Name of json file to parse config object out of. Environment and CLI \
                    params overwrite json ones"
                .to_owned(),
            required: false,
        });

        let inner_vals = self.inner.resolve(&extended)?;

        let path = match inner_vals.get(FILE_PARAM) {
            Some(p) if !p.is_empty() => p.clone(),
            _ => return Ok(inner_vals),
        };

        log::debug!("reading config values from json file {:?}", path);
        let text =
            fs::read_to_string(&path).map_err(|e| ConfigError::file_read(path.as_str(), e))?;
        let doc: HashMap<String, Value> =
            serde_json::from_str(&text).map_err(|e| ConfigError::file_decode(path.as_str(), e))?;

        let mut vals = HashMap::with_capacity(doc.len());
        for p in &extended {
            // a key set to null is treated the same as an absent key
            let value = match doc.get(&p.name.to_lowercase()) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let raw = p
                .param_type
                .json_string(value)
                .map_err(|e| ConfigError::stringify(&p.name, e))?;
            vals.insert(p.name.clone(), raw);
        }

        // the inner source's values overwrite the file's
        vals.extend(inner_vals);
        Ok(vals)
    }
}
