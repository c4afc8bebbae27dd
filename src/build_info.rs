//! Build metadata
//!
//! Build information can be baked into binaries by exporting the
//! `WINDUP_BUILD_*` environment variables while compiling, e.g.
//! `WINDUP_BUILD_COMMIT=$(git rev-parse HEAD) cargo build`. The
//! `--version` output of the command-line source is rendered from these,
//! with `<unset>` placeholders for anything not provided.

use std::fmt;

/// Build metadata captured at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Source control commit, from `WINDUP_BUILD_COMMIT`
    pub commit: Option<&'static str>,
    /// Build timestamp, from `WINDUP_BUILD_DATE`
    pub date: Option<&'static str>,
    /// CI build number, from `WINDUP_BUILD_NUMBER`
    pub number: Option<&'static str>,
    /// Compiler version, from `WINDUP_BUILD_RUSTC`
    pub rustc: Option<&'static str>,
}

impl BuildInfo {
    /// The build metadata of the current compilation
    pub fn current() -> Self {
        Self {
            commit: option_env!("WINDUP_BUILD_COMMIT"),
            date: option_env!("WINDUP_BUILD_DATE"),
            number: option_env!("WINDUP_BUILD_NUMBER"),
            rustc: option_env!("WINDUP_BUILD_RUSTC"),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BuildCommit: {}", self.commit.unwrap_or("<unset>"))?;
        writeln!(f, "BuildDate: {}", self.date.unwrap_or("<unset>"))?;
        writeln!(f, "BuildNumber: {}", self.number.unwrap_or("<unset>"))?;
        writeln!(f, "BuildRustc: {}", self.rustc.unwrap_or("<unset>"))
    }
}

/// The version text printed by `--version` and `-V`
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_shape() {
        let text = version_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("BuildCommit: "));
        assert!(lines[1].starts_with("BuildDate: "));
        assert!(lines[2].starts_with("BuildNumber: "));
        assert!(lines[3].starts_with("BuildRustc: "));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_unset_placeholder() {
        let info = BuildInfo {
            commit: None,
            date: Some("2024-05-01"),
            number: None,
            rustc: None,
        };
        let text = info.to_string();
        assert!(text.starts_with("BuildCommit: <unset>\n"));
        assert!(text.contains("BuildDate: 2024-05-01\n"));
    }
}
