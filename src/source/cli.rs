//! Command-line source
//!
//! Recognizes `--name` and `--name=value` tokens for declared parameters
//! and handles `-h`/`--help` and `-V`/`--version` by printing the relevant
//! text and exiting. Unrecognized tokens and bare positionals are ignored.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::{env, io, process};

use crate::build_info;
use crate::error::ConfigResult;
use crate::param::Param;
use crate::source::Source;
use crate::types::ParamType;

/// Source that pulls values from the process command line.
///
/// Boolean parameters are flags: `--flag` alone means true (or false, when
/// the declared default is already `"true"`), and a following non-flag
/// token or an explicit `--flag=value` overrides that.
pub struct SourceCli {
    help_prefix: Option<String>,
}

impl SourceCli {
    pub fn new() -> Self {
        Self { help_prefix: None }
    }

    /// Set a banner printed before the parameter list in `--help` output
    pub fn with_help_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.help_prefix = Some(prefix.into());
        self
    }

    /// Render the `--help` text for the given declarations: every parameter
    /// sorted by name with its usage and default/required marker, followed
    /// by the built-in `help` and `version` entries.
    pub fn help_string(&self, params: &[Param]) -> String {
        let mut sorted: Vec<&Param> = params.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        if let Some(prefix) = self.help_prefix.as_deref() {
            if !prefix.is_empty() {
                out.push('\n');
                out.push_str(prefix);
                if !prefix.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push('\n');
        for p in sorted {
            push_param_help(&mut out, p);
        }
        push_param_help(
            &mut out,
            &Param {
                param_type: ParamType::Bool,
                name: "help".to_owned(),
                default: String::new(),
                usage: "Show this help message and exit".to_owned(),
                required: false,
            },
        );
        push_param_help(
            &mut out,
            &Param {
                param_type: ParamType::Bool,
                name: "version".to_owned(),
                default: String::new(),
                usage: "Print out a build string and exit".to_owned(),
                required: false,
            },
        );
        out
    }
}

impl Default for SourceCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for SourceCli {
    fn resolve(&self, params: &[Param]) -> ConfigResult<HashMap<String, String>> {
        let args: Vec<String> = env::args_os()
            .skip(1)
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        match scan_args(&args, params) {
            Scan::Values(vals) => Ok(vals),
            Scan::Help => print_and_exit(&self.help_string(params)),
            Scan::Version => print_and_exit(&build_info::version_string()),
        }
    }
}

enum Scan {
    Values(HashMap<String, String>),
    Help,
    Version,
}

/// Walk the argument tokens against the declared parameters.
///
/// Split out from `resolve` so token handling is testable without touching
/// the real process arguments or exiting.
fn scan_args(args: &[String], params: &[Param]) -> Scan {
    let by_flag: HashMap<String, &Param> = params
        .iter()
        .map(|p| (format!("--{}", p.name), p))
        .collect();

    let mut found = HashMap::new();
    let mut rest = args;
    while let Some((arg, tail)) = rest.split_first() {
        rest = tail;

        let (arg_name, mut arg_val) = match arg.split_once('=') {
            Some((name, val)) => (name, Some(val.to_owned())),
            None => (arg.as_str(), None),
        };

        if arg_name == "-h" || arg_name == "--help" {
            return Scan::Help;
        }
        if arg_name == "-V" || arg_name == "--version" {
            return Scan::Version;
        }

        let param = match by_flag.get(arg_name) {
            Some(p) => *p,
            None => continue,
        };

        if param.param_type.is_bool() {
            // a following token is only consumed as the value if it does
            // not look like another flag
            if arg_val.is_none() {
                if let Some((next, after)) = rest.split_first() {
                    if !next.starts_with('-') {
                        arg_val = Some(next.clone());
                        rest = after;
                    }
                }
            }
            let val = match arg_val {
                Some(v) => v,
                // bare flag: presence means true, unless the default is
                // already "true", in which case presence means false
                None if param.default == "true" => String::new(),
                None => "true".to_owned(),
            };
            found.insert(param.name.clone(), val);
            continue;
        }

        if arg_val.is_none() {
            if let Some((next, after)) = rest.split_first() {
                arg_val = Some(next.clone());
                rest = after;
            }
        }
        found.insert(param.name.clone(), arg_val.unwrap_or_default());
    }
    Scan::Values(found)
}

fn push_param_help(out: &mut String, p: &Param) {
    let _ = write!(out, "\t--{}", p.name);
    if p.param_type.is_bool() {
        out.push_str(" (flag)");
    }
    out.push('\n');

    if !p.usage.is_empty() {
        let _ = writeln!(out, "\t\t{}", p.usage);
    }

    if !p.default.is_empty() {
        let _ = writeln!(out, "\t\tDefault: {:?}", p.default);
    } else if p.required {
        out.push_str("\t\t(Required)\n");
    } else {
        out.push_str("\t\t(Optional)\n");
    }

    // every entry spans multiple lines, so separate them with a blank one
    out.push('\n');
}

fn print_and_exit(text: &str) -> ! {
    print!("{}", text);
    let _ = io::stdout().flush();
    process::exit(0);
}
