//! Environment source
//!
//! Looks up declared parameters in the process environment. A parameter
//! name maps to its environment key by upper-casing it and replacing `-`
//! with `_`, so "listen-addr" reads from "LISTEN_ADDR".

use std::collections::HashMap;
use std::env;

use crate::error::{ConfigError, ConfigResult};
use crate::param::Param;
use crate::source::Source;

/// Source that pulls values from environment variables.
///
/// An environment variable that is set to the empty string is a real value:
/// it overrides the parameter's default with `""`.
pub struct SourceEnv;

impl SourceEnv {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SourceEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for SourceEnv {
    fn resolve(&self, params: &[Param]) -> ConfigResult<HashMap<String, String>> {
        let entries: Vec<String> = env::vars_os()
            .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
            .collect();
        scan_entries(&entries, params)
    }
}

/// Walk `KEY=VALUE` entries against the declared parameters.
///
/// Split out from `resolve` so tests can feed a synthetic environment. An
/// entry without a `=` separator is a hard failure.
fn scan_entries(entries: &[String], params: &[Param]) -> ConfigResult<HashMap<String, String>> {
    let by_key: HashMap<String, &Param> =
        params.iter().map(|p| (env_key(&p.name), p)).collect();

    let mut found = HashMap::new();
    for entry in entries {
        let (key, val) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::malformed_env_entry(entry))?;
        if let Some(param) = by_key.get(key) {
            found.insert(param.name.clone(), val.to_owned());
        }
    }
    Ok(found)
}

/// Environment key for a parameter name
pub(crate) fn env_key(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamType;

    fn param(param_type: ParamType, name: &str) -> Param {
        Param {
            param_type,
            name: name.to_owned(),
            default: String::new(),
            usage: String::new(),
            required: false,
        }
    }

    fn entries(ee: &[&str]) -> Vec<String> {
        ee.iter().map(|e| (*e).to_owned()).collect()
    }

    #[test]
    fn test_env_key_mangling() {
        assert_eq!(env_key("listen-addr"), "LISTEN_ADDR");
        assert_eq!(env_key("foo"), "FOO");
        assert_eq!(env_key("a-b-c"), "A_B_C");
    }

    #[test]
    fn test_scan_entries() {
        let params = [
            param(ParamType::String, "foo"),
            param(ParamType::String, "bar"),
            param(ParamType::Bool, "flag1"),
            param(ParamType::String, "foo-bar"),
        ];
        let vals = scan_entries(
            &entries(&[
                "FOO=",
                "BAR=bar",
                "FLAG1=true",
                "HOME=whatever",
                "FOO_BAR=okthen",
            ]),
            &params,
        )
        .unwrap();
        assert_eq!(vals.len(), 4);
        // an empty value is still a hit
        assert_eq!(vals["foo"], "");
        assert_eq!(vals["bar"], "bar");
        assert_eq!(vals["flag1"], "true");
        assert_eq!(vals["foo-bar"], "okthen");
    }

    #[test]
    fn test_value_may_contain_separator() {
        let params = [param(ParamType::String, "eq")];
        let vals = scan_entries(&entries(&["EQ=a=b=c"]), &params).unwrap();
        assert_eq!(vals["eq"], "a=b=c");
    }

    #[test]
    fn test_malformed_entry_fails() {
        let err = scan_entries(&entries(&["NOEQUALS"]), &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed environment variable: \"NOEQUALS\""
        );
    }
}
