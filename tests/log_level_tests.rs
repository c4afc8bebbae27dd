use windup::{ConfigRegistry, SourceStub};

// This file holds the single test that observes the process-global log
// filter, so nothing else in its binary can race it.

#[test]
fn test_log_level_param_applies_on_parse() {
    let config = ConfigRegistry::new();
    config
        .parse(&SourceStub::new([("log-level", "warn")]))
        .unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Warn);

    // an unknown level is reported and the previous filter kept
    let config = ConfigRegistry::new();
    config
        .parse(&SourceStub::new([("log-level", "shouty")]))
        .unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Warn);
}
