//! Configuration registry and resolution engine
//!
//! A [`ConfigRegistry`] collects parameter declarations from anywhere in
//! the process, resolves all of them in a single [`parse`] pass against a
//! [`Source`], and then releases the initialization callbacks queued with
//! [`defer_init`]. Declarations made after a parse are resolved by the
//! next parse, so a process can go through several configuration
//! generations (tests do this a lot).
//!
//! [`parse`]: ConfigRegistry::parse
//! [`defer_init`]: ConfigRegistry::defer_init

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::duration::{format_duration, parse_duration};
use crate::error::{BoxedError, ConfigError, ConfigResult};
use crate::param::{Param, ParamHandle};
use crate::scheduler::InitScheduler;
use crate::source::{Source, SourceCli, SourceEnv, SourceJson, Sources};
use crate::types::{self, CustomKind, ParamType, StringifyFn};

/// Parses a raw provider string and fills the declaring handle's slot.
type Writer = Box<dyn Fn(&str) -> Result<(), BoxedError> + Send + Sync>;

struct Entry {
    param: Param,
    /// A `ParamHandle<T>` behind `Any`, so one table can hold every
    /// declared value type.
    handle: Box<dyn Any + Send + Sync>,
    writer: Writer,
}

struct CustomTypeEntry {
    /// An `Arc<dyn Fn(&str) -> Result<T, BoxedError> + Send + Sync>`
    /// behind `Any`. A failed downcast means the tag was registered
    /// for a different value type than the caller is declaring.
    parse: Box<dyn Any + Send + Sync>,
    stringify: StringifyFn,
}

struct RegistryState {
    entries: HashMap<String, Entry>,
    custom_types: HashMap<String, CustomTypeEntry>,
}

/// Process configuration registry.
///
/// Parameters are declared up front through the typed constructors
/// ([`string`], [`int`], [`bool`], ...), each returning a [`ParamHandle`]
/// that becomes readable once [`parse`] has resolved the declaration
/// generation against a [`Source`]. Initialization work that needs
/// resolved configuration is queued with [`defer_init`] and runs at the
/// end of the first successful parse; callbacks queued after that run
/// immediately.
///
/// ```
/// use windup::{ConfigRegistry, SourceStub};
///
/// let config = ConfigRegistry::new();
/// let addr = config.string("db-addr", ":666", "Address the database listens on");
/// let pool = config.int("db-pool-size", 10, "Connections to keep open");
///
/// config
///     .parse(&SourceStub::new([("db-addr", "10.0.0.1:666")]))
///     .unwrap();
///
/// assert_eq!(addr.get(), "10.0.0.1:666");
/// assert_eq!(*pool.get(), 10);
/// ```
///
/// [`string`]: ConfigRegistry::string
/// [`int`]: ConfigRegistry::int
/// [`bool`]: ConfigRegistry::bool
/// [`parse`]: ConfigRegistry::parse
/// [`defer_init`]: ConfigRegistry::defer_init
pub struct ConfigRegistry {
    state: Mutex<RegistryState>,
    scheduler: InitScheduler,
}

impl ConfigRegistry {
    /// Creates an empty registry.
    ///
    /// Every registry carries one built-in parameter, `log-level`, whose
    /// resolved value is applied to the global [`log`] filter when the
    /// initialization callbacks drain.
    pub fn new() -> Self {
        let registry = Self {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                custom_types: HashMap::new(),
            }),
            scheduler: InitScheduler::new(),
        };
        let level = registry.string(
            "log-level",
            "info",
            "Log level to run with. Available levels are: trace, debug, info, warn, error",
        );
        registry.defer_init(move || apply_log_level(level.get()));
        registry
    }

    /// Declares a string parameter.
    pub fn string(&self, name: &str, default: &str, usage: &str) -> ParamHandle<String> {
        self.declare(
            Param {
                param_type: ParamType::String,
                name: name.to_owned(),
                default: default.to_owned(),
                usage: usage.to_owned(),
                required: false,
            },
            |raw| Ok(raw.to_owned()),
        )
    }

    /// Declares a string parameter that some source must set.
    pub fn required_string(&self, name: &str, usage: &str) -> ParamHandle<String> {
        self.declare(
            Param {
                param_type: ParamType::String,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| Ok(raw.to_owned()),
        )
    }

    /// Declares an i32 parameter.
    pub fn int(&self, name: &str, default: i32, usage: &str) -> ParamHandle<i32> {
        self.declare(
            Param {
                param_type: ParamType::Int,
                name: name.to_owned(),
                default: default.to_string(),
                usage: usage.to_owned(),
                required: false,
            },
            |raw| raw.parse::<i32>().map_err(BoxedError::from),
        )
    }

    /// Declares an i32 parameter that some source must set.
    pub fn required_int(&self, name: &str, usage: &str) -> ParamHandle<i32> {
        self.declare(
            Param {
                param_type: ParamType::Int,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| raw.parse::<i32>().map_err(BoxedError::from),
        )
    }

    /// Declares an i64 parameter.
    pub fn int64(&self, name: &str, default: i64, usage: &str) -> ParamHandle<i64> {
        self.declare(
            Param {
                param_type: ParamType::Int64,
                name: name.to_owned(),
                default: default.to_string(),
                usage: usage.to_owned(),
                required: false,
            },
            |raw| raw.parse::<i64>().map_err(BoxedError::from),
        )
    }

    /// Declares an i64 parameter that some source must set.
    pub fn required_int64(&self, name: &str, usage: &str) -> ParamHandle<i64> {
        self.declare(
            Param {
                param_type: ParamType::Int64,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| raw.parse::<i64>().map_err(BoxedError::from),
        )
    }

    /// Declares a bool parameter.
    ///
    /// A default of `true` is carried as the raw string `"true"` and a
    /// default of `false` as the empty string, which is what lets the
    /// command-line source flip a true-by-default flag off on bare
    /// `--name`.
    pub fn bool(&self, name: &str, default: bool, usage: &str) -> ParamHandle<bool> {
        let default = if default { "true" } else { "" };
        self.declare(
            Param {
                param_type: ParamType::Bool,
                name: name.to_owned(),
                default: default.to_owned(),
                usage: usage.to_owned(),
                required: false,
            },
            |raw| Ok(types::parse_bool(raw)),
        )
    }

    /// Declares a bool parameter that some source must set.
    pub fn required_bool(&self, name: &str, usage: &str) -> ParamHandle<bool> {
        self.declare(
            Param {
                param_type: ParamType::Bool,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| Ok(types::parse_bool(raw)),
        )
    }

    /// Declares a duration parameter, e.g. `"1h30m"` or `"250ms"`.
    pub fn duration(&self, name: &str, default: Duration, usage: &str) -> ParamHandle<Duration> {
        self.declare(
            Param {
                param_type: ParamType::Duration,
                name: name.to_owned(),
                default: format_duration(default),
                usage: usage.to_owned(),
                required: false,
            },
            |raw| parse_duration(raw).map_err(BoxedError::from),
        )
    }

    /// Declares a duration parameter that some source must set.
    pub fn required_duration(&self, name: &str, usage: &str) -> ParamHandle<Duration> {
        self.declare(
            Param {
                param_type: ParamType::Duration,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| parse_duration(raw).map_err(BoxedError::from),
        )
    }

    /// Declares a parameter deserialized from a JSON document.
    ///
    /// The default is serialized with [`serde_json`]; a default that
    /// cannot be serialized is a programming error and panics at
    /// declaration time.
    pub fn json<T>(&self, name: &str, default: &T, usage: &str) -> ParamHandle<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let default = serde_json::to_string(default).unwrap_or_else(|err| {
            panic!("default for param {:?} cannot be serialized: {}", name, err)
        });
        self.declare(
            Param {
                param_type: ParamType::Json,
                name: name.to_owned(),
                default,
                usage: usage.to_owned(),
                required: false,
            },
            |raw| serde_json::from_str::<T>(raw).map_err(BoxedError::from),
        )
    }

    /// Declares a JSON parameter that some source must set.
    pub fn required_json<T>(&self, name: &str, usage: &str) -> ParamHandle<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.declare(
            Param {
                param_type: ParamType::Json,
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            |raw| serde_json::from_str::<T>(raw).map_err(BoxedError::from),
        )
    }

    /// Registers a new parameter type under `tag` and returns the
    /// [`ParamType`] to declare parameters of that type with.
    ///
    /// `parse` turns a raw provider string into a `T`; `stringify` turns
    /// a JSON document value into the raw string form (the JSON file
    /// source needs it). Registering a tag twice, or shadowing a
    /// built-in tag, panics.
    pub fn register_param_type<T, P, S>(&self, tag: &str, parse: P, stringify: S) -> ParamType
    where
        T: Send + Sync + 'static,
        P: Fn(&str) -> Result<T, BoxedError> + Send + Sync + 'static,
        S: Fn(&Value) -> Result<String, BoxedError> + Send + Sync + 'static,
    {
        let parse: Arc<dyn Fn(&str) -> Result<T, BoxedError> + Send + Sync> = Arc::new(parse);
        let stringify: StringifyFn = Arc::new(stringify);

        let taken = {
            let mut state = self.state.lock().unwrap();
            if ParamType::is_known_tag(tag) || state.custom_types.contains_key(tag) {
                true
            } else {
                state.custom_types.insert(
                    tag.to_owned(),
                    CustomTypeEntry {
                        parse: Box::new(parse),
                        stringify: stringify.clone(),
                    },
                );
                false
            }
        };
        if taken {
            panic!("param type already defined: {}", tag);
        }
        ParamType::Custom(CustomKind::new(tag, stringify))
    }

    /// Declares a parameter of a type previously registered with
    /// [`register_param_type`]. The default is rendered with [`Display`].
    ///
    /// [`register_param_type`]: ConfigRegistry::register_param_type
    pub fn custom<T>(&self, param_type: &ParamType, name: &str, default: &T, usage: &str) -> ParamHandle<T>
    where
        T: Display + Send + Sync + 'static,
    {
        let parse = self.custom_parse_fn::<T>(param_type);
        self.declare(
            Param {
                param_type: param_type.clone(),
                name: name.to_owned(),
                default: default.to_string(),
                usage: usage.to_owned(),
                required: false,
            },
            move |raw| parse(raw),
        )
    }

    /// Declares a custom-typed parameter that some source must set.
    pub fn required_custom<T>(&self, param_type: &ParamType, name: &str, usage: &str) -> ParamHandle<T>
    where
        T: Send + Sync + 'static,
    {
        let parse = self.custom_parse_fn::<T>(param_type);
        self.declare(
            Param {
                param_type: param_type.clone(),
                name: name.to_owned(),
                default: String::new(),
                usage: usage.to_owned(),
                required: true,
            },
            move |raw| parse(raw),
        )
    }

    /// Queues `callback` to run once configuration has been resolved.
    ///
    /// Before the first successful [`parse`](ConfigRegistry::parse),
    /// callbacks accumulate in declaration order; afterwards they run
    /// inline on the calling thread. A callback must not declare
    /// parameters or call `parse` on the same registry, since the
    /// registry lock is held while the queue drains.
    pub fn defer_init<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.register(callback);
    }

    /// Resolves every declared parameter against `source`, fills the
    /// handles, and drains the initialization queue.
    ///
    /// For each declaration the provider value is used when present,
    /// otherwise the default; a required parameter with no provider value
    /// fails the whole parse. On success the declaration generation is
    /// cleared so a later parse starts fresh. On failure everything is
    /// left declared and no callback runs, so the same generation can be
    /// parsed again.
    pub fn parse(&self, source: &dyn Source) -> ConfigResult<()> {
        let mut state = self.state.lock().unwrap();
        let params: Vec<Param> = state.entries.values().map(|e| e.param.clone()).collect();

        let vals = source.resolve(&params)?;
        for param in &params {
            let raw = match vals.get(&param.name) {
                Some(val) => val.clone(),
                None if param.required => {
                    return Err(ConfigError::required_missing(param.name.clone()))
                }
                None => param.default.clone(),
            };
            let entry = &state.entries[&param.name];
            (entry.writer)(&raw)
                .map_err(|err| ConfigError::invalid_value(param.name.clone(), err))?;
        }

        log::debug!(
            "resolved {} configuration parameters, draining init callbacks",
            params.len()
        );
        // Drained under the registry lock so that a parse on another
        // thread cannot interleave with the callbacks.
        self.scheduler.drain();
        state.entries.clear();
        Ok(())
    }

    /// Resolves configuration from the standard process sources:
    /// a JSON config file (named by `config-json-file`), overridden by
    /// environment variables, overridden by command-line arguments.
    pub fn configure(&self) -> ConfigResult<()> {
        let inner = Sources(vec![Box::new(SourceEnv::new()), Box::new(SourceCli::new())]);
        self.parse(&SourceJson::new(inner))
    }

    /// Discards all declarations and queued callbacks and re-arms the
    /// initialization queue. Custom parameter types stay registered.
    ///
    /// Handles returned by earlier declarations are dangling after a
    /// reset: no parse will ever fill them. Panics if called while the
    /// initialization queue is draining.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        self.scheduler.reset();
    }

    fn declare<T, P>(&self, param: Param, parse: P) -> ParamHandle<T>
    where
        T: Send + Sync + 'static,
        P: Fn(&str) -> Result<T, BoxedError> + Send + Sync + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.entries.get(&param.name) {
            if existing.param != param {
                drop(state);
                panic!(
                    "param named {:?} already exists and differs from this new one",
                    param.name
                );
            }
            // Same declaration twice shares one slot. A failed downcast
            // means the two declarations want different value types,
            // which only JSON and custom params can express.
            let handle = existing.handle.downcast_ref::<ParamHandle<T>>().cloned();
            drop(state);
            return match handle {
                Some(handle) => handle,
                None => panic!(
                    "param named {:?} already exists and differs from this new one",
                    param.name
                ),
            };
        }

        let handle = ParamHandle::new(&param.name);
        let writer_handle = handle.clone();
        let writer: Writer = Box::new(move |raw| {
            writer_handle.fill(parse(raw)?);
            Ok(())
        });
        let name = param.name.clone();
        state.entries.insert(
            name,
            Entry {
                param,
                handle: Box::new(handle.clone()),
                writer,
            },
        );
        handle
    }

    fn custom_parse_fn<T>(&self, param_type: &ParamType) -> Arc<dyn Fn(&str) -> Result<T, BoxedError> + Send + Sync>
    where
        T: Send + Sync + 'static,
    {
        let tag = param_type.tag().to_owned();
        let found = {
            let state = self.state.lock().unwrap();
            state.custom_types.get(&tag).map(|entry| {
                entry
                    .parse
                    .downcast_ref::<Arc<dyn Fn(&str) -> Result<T, BoxedError> + Send + Sync>>()
                    .cloned()
            })
        };
        match found {
            None => panic!("param type not defined: {}", tag),
            Some(None) => panic!("param type {} is registered for a different value type", tag),
            Some(Some(parse)) => parse,
        }
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_log_level(level: &str) {
    match log::LevelFilter::from_str(level) {
        Ok(filter) => log::set_max_level(filter),
        Err(err) => log::error!(
            "invalid log-level {:?}, keeping the current level: {}",
            level,
            err
        ),
    }
}
