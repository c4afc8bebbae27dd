use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use windup::{BoxedError, ConfigError, ConfigRegistry, SourceStub};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SemVer {
    major: u32,
    minor: u32,
    patch: u32,
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn empty() -> SourceStub {
    SourceStub(Default::default())
}

fn parse_semver(raw: &str) -> Result<SemVer, BoxedError> {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return Err(format!("expected MAJOR.MINOR.PATCH, got {:?}", raw).into());
    }
    Ok(SemVer {
        major: parts[0].parse()?,
        minor: parts[1].parse()?,
        patch: parts[2].parse()?,
    })
}

#[test]
fn test_full_resolution_cycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = ConfigRegistry::new();
    let addr = config.string("listen-addr", ":8080", "Address to listen on");
    let pool = config.int("pool-size", 8, "Worker pool size");
    let cache = config.int64("cache-bytes", 1 << 30, "Cache budget in bytes");
    let debug = config.bool("debug", false, "Enable debug output");
    let timeout = config.duration("timeout", Duration::from_secs(30), "Request timeout");
    let token = config.required_string("api-token", "Upstream API token");

    config
        .parse(&SourceStub::new([
            ("api-token", "hunter2"),
            ("pool-size", "32"),
            ("timeout", "1m30s"),
            ("debug", "true"),
        ]))
        .unwrap();

    assert_eq!(addr.get(), ":8080");
    assert_eq!(*pool.get(), 32);
    assert_eq!(*cache.get(), 1 << 30);
    assert!(*debug.get());
    assert_eq!(*timeout.get(), Duration::from_secs(90));
    assert_eq!(token.get(), "hunter2");
}

#[test]
fn test_duration_default_survives_formatting() {
    let config = ConfigRegistry::new();
    // the default travels through the registry as the string "1m30s"
    let window = config.duration("window", Duration::from_secs(90), "");
    config.parse(&empty()).unwrap();
    assert_eq!(*window.get(), Duration::from_secs(90));
}

#[test]
fn test_required_param_missing() {
    let config = ConfigRegistry::new();
    let _ = config.required_int("shard-count", "Number of shards");

    let err = config.parse(&empty()).unwrap_err();
    assert!(matches!(err, ConfigError::RequiredMissing { .. }));
    assert_eq!(
        err.to_string(),
        "parameter \"shard-count\" required but not set"
    );
}

#[test]
fn test_invalid_value_reports_param_name() {
    let config = ConfigRegistry::new();
    let _ = config.duration("timeout", Duration::from_secs(1), "");

    let err = config
        .parse(&SourceStub::new([("timeout", "90 bananas")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
    assert!(err.to_string().starts_with("error parsing parameter timeout:"));
}

#[test]
fn test_custom_type_end_to_end() {
    let config = ConfigRegistry::new();
    let semver = config.register_param_type::<SemVer, _, _>(
        "semver",
        parse_semver,
        windup::json_string_unquote,
    );
    let min = config.custom(
        &semver,
        "min-version",
        &SemVer { major: 1, minor: 0, patch: 0 },
        "Oldest protocol version accepted",
    );
    let max = config.required_custom::<SemVer>(&semver, "max-version", "Newest version accepted");

    config
        .parse(&SourceStub::new([("max-version", "2.3.4")]))
        .unwrap();

    assert_eq!(*min.get(), SemVer { major: 1, minor: 0, patch: 0 });
    assert_eq!(*max.get(), SemVer { major: 2, minor: 3, patch: 4 });
}

#[test]
fn test_custom_type_bad_value() {
    let config = ConfigRegistry::new();
    let semver = config.register_param_type::<SemVer, _, _>(
        "semver",
        parse_semver,
        windup::json_string_unquote,
    );
    let _ = config.custom(&semver, "min-version", &SemVer { major: 1, minor: 0, patch: 0 }, "");

    let err = config
        .parse(&SourceStub::new([("min-version", "not.a.version")]))
        .unwrap_err();
    assert!(err.to_string().starts_with("error parsing parameter min-version:"));
}

#[test]
fn test_declarations_from_multiple_threads() {
    let config = Arc::new(ConfigRegistry::new());

    let mut joins = Vec::new();
    for i in 0..8 {
        let config = Arc::clone(&config);
        joins.push(thread::spawn(move || {
            config.string(&format!("worker-{}-name", i), "idle", "")
        }));
    }
    let handles: Vec<_> = joins.into_iter().map(|j| j.join().unwrap()).collect();

    config.parse(&SourceStub::new([("worker-3-name", "busy")])).unwrap();

    for (i, handle) in handles.iter().enumerate() {
        let expected = if i == 3 { "busy" } else { "idle" };
        assert_eq!(handle.get(), expected, "worker {}", i);
    }
}

#[test]
fn test_two_generations() {
    let config = ConfigRegistry::new();

    let first = config.string("endpoint", "http://first", "");
    config.parse(&empty()).unwrap();
    assert_eq!(first.get(), "http://first");

    let second = config.string("endpoint", "http://second", "");
    config
        .parse(&SourceStub::new([("endpoint", "http://live")]))
        .unwrap();
    assert_eq!(second.get(), "http://live");
    // the first generation's handle keeps the value it resolved to
    assert_eq!(first.get(), "http://first");
}

#[test]
fn test_defer_init_ordering() {
    let config = ConfigRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        let order = Arc::clone(&order);
        config.defer_init(move || order.lock().unwrap().push(i));
    }
    assert!(order.lock().unwrap().is_empty());

    config.parse(&empty()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);

    // after the first parse, callbacks run at registration time
    for i in 5..7 {
        let order = Arc::clone(&order);
        config.defer_init(move || order.lock().unwrap().push(i));
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_defer_init_sees_resolved_values() {
    let config = ConfigRegistry::new();
    let addr = config.string("bind-addr", ":9999", "");

    let seen = Arc::new(Mutex::new(None));
    let cb_addr = addr.clone();
    let cb_seen = Arc::clone(&seen);
    config.defer_init(move || {
        *cb_seen.lock().unwrap() = Some(cb_addr.get().clone());
    });

    config
        .parse(&SourceStub::new([("bind-addr", "0.0.0.0:7777")]))
        .unwrap();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("0.0.0.0:7777"));
}

#[test]
fn test_prefixed_declarations() {
    let config = ConfigRegistry::new();
    let addr = config.string(&windup::prefixed(&["redis", "addr"]), "localhost:6379", "");
    let pool = config.int(&windup::prefixed(&["redis", "pool-size"]), 4, "");

    config
        .parse(&SourceStub::new([("redis-addr", "cache.prod:6379")]))
        .unwrap();
    assert_eq!(addr.get(), "cache.prod:6379");
    assert_eq!(*pool.get(), 4);
}

#[test]
#[should_panic(expected = "read before it was resolved")]
fn test_handle_read_before_parse_panics() {
    let config = ConfigRegistry::new();
    let addr = config.string("addr", ":666", "");
    let _ = addr.get();
}

#[test]
#[should_panic(expected = "already exists and differs")]
fn test_conflicting_declaration_panics() {
    let config = ConfigRegistry::new();
    let _ = config.int("budget", 10, "Spend budget");
    let _ = config.int64("budget", 10, "Spend budget");
}
