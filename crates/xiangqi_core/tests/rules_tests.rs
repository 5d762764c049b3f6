//! Integration tests for the rule registry and the asynchronous
//! change notifier.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use xiangqi_core::{RuleChange, RuleConfig, RuleKey, RuleListener, RuleSource, RuleValue};

/// Enables a key after recursively enabling its dependencies.
fn enable_with_deps(config: &RuleConfig, key: RuleKey) {
    for &dep in key.spec().requires {
        enable_with_deps(config, dep);
    }
    assert!(
        config.set(key, RuleValue::Bool(true), RuleSource::Api),
        "could not enable {key}"
    );
}

#[test]
fn test_every_declared_conflict_rejects_the_second_enable() {
    for key in RuleKey::iter() {
        for &foe in key.spec().conflicts {
            let config = RuleConfig::new();
            enable_with_deps(&config, foe);

            assert!(
                !config.set(key, RuleValue::Bool(true), RuleSource::Api),
                "{key} enabled despite conflicting {foe}"
            );
            assert!(!config.enabled(key));
            assert!(config.enabled(foe));
        }
    }
}

#[test]
fn test_every_declared_dependency_blocks_early_enable() {
    for key in RuleKey::iter() {
        if key.spec().requires.is_empty() {
            continue;
        }
        let config = RuleConfig::new();
        let attempt = match key.spec().default {
            RuleValue::Bool(_) => RuleValue::Bool(true),
            RuleValue::Count(_) => RuleValue::Count(4),
        };
        assert!(
            !config.set(key, attempt, RuleSource::Api),
            "{key} accepted before its dependencies"
        );
        assert_eq!(config.get(key), key.spec().default);

        // With dependencies in place the same change goes through.
        for &dep in key.spec().requires {
            enable_with_deps(&config, dep);
        }
        assert!(config.set(key, attempt, RuleSource::Api));
    }
}

struct Recorder {
    seen: Arc<Mutex<Vec<RuleChange>>>,
}

impl RuleListener for Recorder {
    fn on_rule_changed(&self, change: RuleChange) {
        self.seen.lock().unwrap().push(change);
    }
}

struct Panicker;

impl RuleListener for Panicker {
    fn on_rule_changed(&self, _change: RuleChange) {
        panic!("listener failure");
    }
}

struct Sleeper;

impl RuleListener for Sleeper {
    fn on_rule_changed(&self, _change: RuleChange) {
        // Far beyond the listener slot.
        std::thread::sleep(Duration::from_secs(2));
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition never reached");
}

#[tokio::test]
async fn test_listener_hears_accepted_change() {
    let config = Arc::new(RuleConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    config.add_listener(Arc::new(Recorder { seen: seen.clone() }));

    assert!(config.set(RuleKey::HorseUnblockLeg, RuleValue::Bool(true), RuleSource::Ui));

    wait_until(|| !seen.lock().unwrap().is_empty()).await;
    let change = seen.lock().unwrap()[0];
    assert_eq!(change.key, RuleKey::HorseUnblockLeg);
    assert_eq!(change.old, RuleValue::Bool(false));
    assert_eq!(change.new, RuleValue::Bool(true));
    assert_eq!(change.source, RuleSource::Ui);
}

#[tokio::test]
async fn test_rejected_change_emits_no_event() {
    let config = Arc::new(RuleConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    config.add_listener(Arc::new(Recorder { seen: seen.clone() }));

    // Rejected: dependency missing.
    assert!(!config.set(RuleKey::ChariotWrap, RuleValue::Bool(true), RuleSource::Ui));
    // Accepted afterwards; only this one should arrive.
    assert!(config.set(RuleKey::NoRiverLimit, RuleValue::Bool(true), RuleSource::Ui));

    wait_until(|| !seen.lock().unwrap().is_empty()).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].key, RuleKey::NoRiverLimit);
}

#[tokio::test]
async fn test_panicking_listener_does_not_block_peers() {
    let config = Arc::new(RuleConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    config.add_listener(Arc::new(Panicker));
    config.add_listener(Arc::new(Recorder { seen: seen.clone() }));

    assert!(config.set(RuleKey::HorseUnblockLeg, RuleValue::Bool(true), RuleSource::Api));

    wait_until(|| !seen.lock().unwrap().is_empty()).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_hung_listener_is_abandoned_and_mutator_unblocked() {
    let config = Arc::new(RuleConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    config.add_listener(Arc::new(Sleeper));
    config.add_listener(Arc::new(Recorder { seen: seen.clone() }));

    let start = Instant::now();
    assert!(config.set(RuleKey::HorseUnblockLeg, RuleValue::Bool(true), RuleSource::Network));
    // The caller returns immediately; dispatch happens elsewhere.
    assert!(start.elapsed() < Duration::from_millis(200));

    // The sleeper overran its slot; the recorder still got the event
    // well before the sleeper would have finished.
    wait_until(|| !seen.lock().unwrap().is_empty()).await;
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_snapshot_apply_notifies_changed_keys_once() {
    let config = Arc::new(RuleConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    config.add_listener(Arc::new(Recorder { seen: seen.clone() }));

    let mut snapshot = config.snapshot();
    snapshot.insert(RuleKey::LeftRightConnected, RuleValue::Bool(true));
    snapshot.insert(RuleKey::ChariotWrap, RuleValue::Bool(true));
    config
        .apply_snapshot(&snapshot, RuleSource::Api)
        .expect("snapshot is consistent");

    wait_until(|| seen.lock().unwrap().len() >= 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let keys: Vec<RuleKey> = seen.iter().map(|c| c.key).collect();
    assert!(keys.contains(&RuleKey::LeftRightConnected));
    assert!(keys.contains(&RuleKey::ChariotWrap));
}
