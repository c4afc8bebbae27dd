//! # Windup Configuration Library
//!
//! This library implements process-wide configuration for long-running
//! services. Parameters are declared right where they are used, resolved in
//! a single pass from layered sources (JSON config file, environment
//! variables, command line), and initialization work that depends on
//! resolved values is deferred until that pass has run.
//!
//! ## Core Components
//!
//! * `build_info` - Build metadata baked in at compile time and the `--version` text
//! * `duration` - Parsing and formatting of duration strings like `1h30m`
//! * `error` - Error types and handling
//! * `param` - Parameter declarations and typed value handles
//! * `registry` - The registry tying declarations, sources and callbacks together
//! * `scheduler` - Deferred-initialization callback scheduler
//! * `source` - Value sources: command line, environment, JSON file, test stubs
//! * `types` - Parameter type tags and raw-string conversion rules
//!
//! ## Architecture
//!
//! Any module may declare parameters on a shared [`ConfigRegistry`] at
//! startup and hold on to the returned [`ParamHandle`]s. The process entry
//! point calls [`configure`](ConfigRegistry::configure) (or
//! [`parse`](ConfigRegistry::parse) with a custom source) once, after which
//! every handle is readable and the callbacks queued with
//! [`defer_init`](ConfigRegistry::defer_init) run in registration order.
//!
//! Values found by later sources override earlier ones, and every parameter
//! falls back to its declared default; a required parameter no source sets
//! fails the whole pass. A parse consumes the current declaration
//! generation, so tests can declare, parse and reset repeatedly in one
//! process.

pub mod build_info;
pub mod duration;
pub mod error;
pub mod param;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use build_info::{version_string, BuildInfo};
pub use duration::{format_duration, parse_duration, DurationError};
pub use error::{BoxedError, ConfigError, ConfigResult};
pub use param::{prefixed, Param, ParamHandle};
pub use registry::ConfigRegistry;
pub use scheduler::InitScheduler;
pub use source::{Source, SourceCli, SourceEnv, SourceJson, SourceStub, Sources};
pub use types::{json_string_as_is, json_string_unquote, CustomKind, ParamType, StringifyFn};
