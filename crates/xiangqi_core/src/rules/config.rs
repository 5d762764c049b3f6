//! The validated rule store and its asynchronous change notifier.
//!
//! A [`RuleConfig`] is an explicitly owned object shared by handle
//! (`Arc`) with every consumer; there is no process-wide singleton.
//! Mutations are validated against the static registry before they
//! take effect. Accepted changes are handed to a single serializing
//! dispatch task, which fans each listener invocation out to a
//! bounded-time execution slot so that a slow or failing listener
//! never blocks the mutator or its peers.

use super::key::{RuleKey, RuleSource, RuleValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// How long one listener invocation may run before it is abandoned.
const LISTENER_SLOT: Duration = Duration::from_millis(300);

/// An accepted rule change, as delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleChange {
    /// The key that changed.
    pub key: RuleKey,
    /// Value before the change.
    pub old: RuleValue,
    /// Value after the change.
    pub new: RuleValue,
    /// Where the change originated.
    pub source: RuleSource,
}

/// Receives rule-change notifications on the notifier task.
pub trait RuleListener: Send + Sync {
    /// Called once per accepted change. Runs in a bounded execution
    /// slot; a panic or overrun is logged and the listener skipped.
    fn on_rule_changed(&self, change: RuleChange);
}

/// A serializable copy of the entire rule set.
pub type RuleSnapshot = BTreeMap<RuleKey, RuleValue>;

/// Error applying a rule snapshot.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RuleError {
    /// A key in the snapshot violates its dependency constraints.
    #[display("rule {_0} requires {_1}, which the snapshot leaves disabled")]
    MissingDependency(RuleKey, RuleKey),
    /// Two enabled keys in the snapshot conflict.
    #[display("rule {_0} conflicts with enabled rule {_1}")]
    Conflict(RuleKey, RuleKey),
    /// A toggle got a count, or a count got a toggle.
    #[display("rule {_0} given a value of the wrong kind")]
    TypeMismatch(RuleKey),
}

impl std::error::Error for RuleError {}

/// The rule-variant configuration store.
pub struct RuleConfig {
    values: Mutex<HashMap<RuleKey, RuleValue>>,
    listeners: Arc<Mutex<Vec<Arc<dyn RuleListener>>>>,
    events: OnceLock<mpsc::UnboundedSender<RuleChange>>,
}

impl RuleConfig {
    /// Creates a config with every rule at its registry default.
    pub fn new() -> Self {
        let values = RuleKey::default_snapshot().into_iter().collect();
        Self {
            values: Mutex::new(values),
            listeners: Arc::new(Mutex::new(Vec::new())),
            events: OnceLock::new(),
        }
    }

    /// Current value of a rule.
    pub fn get(&self, key: RuleKey) -> RuleValue {
        self.values.lock().unwrap()[&key]
    }

    /// Whether a toggle rule is enabled.
    pub fn enabled(&self, key: RuleKey) -> bool {
        self.get(key).enabled()
    }

    /// The count of a count-valued rule, zero for toggles.
    pub fn count(&self, key: RuleKey) -> u8 {
        self.get(key).count()
    }

    /// Attempts to change one rule.
    ///
    /// The change is validated against the registry: enabling requires
    /// every dependency enabled and every conflict disabled; disabling
    /// is rejected while another enabled rule depends on this key. A
    /// rejected change leaves the prior value in place and returns
    /// `false`; callers may also simply re-read the value.
    #[instrument(skip(self))]
    pub fn set(&self, key: RuleKey, value: RuleValue, source: RuleSource) -> bool {
        let mut values = self.values.lock().unwrap();
        let old = values[&key];
        if old == value {
            return true;
        }
        if let Err(err) = Self::validate_change(&values, key, value) {
            warn!(%key, %value, %err, "rule change rejected");
            return false;
        }
        values.insert(key, value);
        drop(values);

        info!(%key, %old, %value, ?source, "rule changed");
        self.notify(RuleChange {
            key,
            old,
            new: value,
            source,
        });
        true
    }

    /// Serializes the entire rule set.
    pub fn snapshot(&self) -> RuleSnapshot {
        self.values
            .lock()
            .unwrap()
            .iter()
            .map(|(&k, &v)| (k, v))
            .collect()
    }

    /// Restores the entire rule set atomically.
    ///
    /// Keys absent from the snapshot revert to their defaults. The
    /// proposed set is checked in a single consistency pass; on any
    /// violation nothing changes. Listeners are notified once per key
    /// that actually changed, after the swap, so no transient invalid
    /// intermediate state is ever observable.
    #[instrument(skip(self, snapshot), fields(keys = snapshot.len()))]
    pub fn apply_snapshot(
        &self,
        snapshot: &RuleSnapshot,
        source: RuleSource,
    ) -> Result<(), RuleError> {
        let proposed: HashMap<RuleKey, RuleValue> = RuleKey::iter()
            .map(|key| (key, snapshot.get(&key).copied().unwrap_or(key.spec().default)))
            .collect();
        Self::validate_set(&proposed)?;

        let mut values = self.values.lock().unwrap();
        let changes: Vec<RuleChange> = proposed
            .iter()
            .filter(|(key, &new)| values[key] != new)
            .map(|(&key, &new)| RuleChange {
                key,
                old: values[&key],
                new,
                source,
            })
            .collect();
        *values = proposed;
        drop(values);

        info!(changed = changes.len(), ?source, "rule snapshot applied");
        for change in changes {
            self.notify(change);
        }
        Ok(())
    }

    /// Registers a change listener.
    ///
    /// The first registration spawns the notifier task and therefore
    /// must happen inside a Tokio runtime.
    pub fn add_listener(&self, listener: Arc<dyn RuleListener>) {
        self.listeners.lock().unwrap().push(listener);
        self.ensure_notifier();
    }

    /// The value kinds (toggle vs count) of a key's default and a
    /// proposed value must agree.
    fn kind_matches(key: RuleKey, value: RuleValue) -> bool {
        matches!(
            (key.spec().default, value),
            (RuleValue::Bool(_), RuleValue::Bool(_)) | (RuleValue::Count(_), RuleValue::Count(_))
        )
    }

    /// Validates a single-key change against the current values.
    fn validate_change(
        values: &HashMap<RuleKey, RuleValue>,
        key: RuleKey,
        value: RuleValue,
    ) -> Result<(), RuleError> {
        let spec = key.spec();
        if !Self::kind_matches(key, value) {
            return Err(RuleError::TypeMismatch(key));
        }
        // Enabling, or adjusting a count parameter, needs the rule's
        // own dependencies satisfied and conflicts clear.
        if value.enabled() || matches!(value, RuleValue::Count(_)) {
            for &dep in spec.requires {
                if !values[&dep].enabled() {
                    return Err(RuleError::MissingDependency(key, dep));
                }
            }
        }
        if value.enabled() {
            for &foe in spec.conflicts {
                if values[&foe].enabled() {
                    return Err(RuleError::Conflict(key, foe));
                }
            }
        }
        // Disabling is rejected while a dependent rule is still on.
        if !value.enabled() && values[&key].enabled() {
            for other in RuleKey::iter() {
                if values[&other].enabled() && other.spec().requires.contains(&key) {
                    return Err(RuleError::MissingDependency(other, key));
                }
            }
        }
        Ok(())
    }

    /// Validates a complete rule set in one pass.
    fn validate_set(values: &HashMap<RuleKey, RuleValue>) -> Result<(), RuleError> {
        for key in RuleKey::iter() {
            let value = values[&key];
            if !Self::kind_matches(key, value) {
                return Err(RuleError::TypeMismatch(key));
            }
            if !value.enabled() {
                continue;
            }
            for &dep in key.spec().requires {
                if !values[&dep].enabled() {
                    return Err(RuleError::MissingDependency(key, dep));
                }
            }
            for &foe in key.spec().conflicts {
                if values[&foe].enabled() {
                    return Err(RuleError::Conflict(key, foe));
                }
            }
        }
        Ok(())
    }

    /// Hands an accepted change to the notifier task, if one exists.
    fn notify(&self, change: RuleChange) {
        if let Some(events) = self.events.get() {
            // The notifier only stops when the config is dropped.
            let _ = events.send(change);
        }
    }

    /// Spawns the serializing dispatch task on first use.
    fn ensure_notifier(&self) {
        self.events.get_or_init(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<RuleChange>();
            let listeners = Arc::clone(&self.listeners);
            tokio::spawn(async move {
                while let Some(change) = rx.recv().await {
                    let current: Vec<Arc<dyn RuleListener>> =
                        listeners.lock().unwrap().clone();
                    for listener in current {
                        let handle =
                            tokio::task::spawn_blocking(move || listener.on_rule_changed(change));
                        match tokio::time::timeout(LISTENER_SLOT, handle).await {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => {
                                warn!(key = %change.key, error = %err, "rule listener panicked")
                            }
                            Err(_) => {
                                warn!(key = %change.key, "rule listener overran its slot; abandoned")
                            }
                        }
                    }
                    debug!(key = %change.key, "rule change dispatched");
                }
            });
            tx
        });
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleConfig")
            .field("values", &self.values.lock().unwrap())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_all_disabled() {
        let config = RuleConfig::new();
        assert!(!config.enabled(RuleKey::Stacking));
        assert_eq!(config.get(RuleKey::StackingLimit), RuleValue::Count(3));
    }

    #[test]
    fn test_dependency_rejects_out_of_order_enable() {
        let config = RuleConfig::new();
        assert!(!config.set(
            RuleKey::StackSelect,
            RuleValue::Bool(true),
            RuleSource::Api
        ));
        assert!(!config.enabled(RuleKey::StackSelect));

        assert!(config.set(RuleKey::Stacking, RuleValue::Bool(true), RuleSource::Api));
        assert!(config.set(
            RuleKey::StackSelect,
            RuleValue::Bool(true),
            RuleSource::Api
        ));
    }

    #[test]
    fn test_conflict_rejects_second_enable() {
        let config = RuleConfig::new();
        assert!(config.set(RuleKey::Stacking, RuleValue::Bool(true), RuleSource::Api));
        assert!(!config.set(
            RuleKey::CaptureConversion,
            RuleValue::Bool(true),
            RuleSource::Api
        ));
        assert!(!config.enabled(RuleKey::CaptureConversion));
    }

    #[test]
    fn test_disable_rejected_while_dependent_enabled() {
        let config = RuleConfig::new();
        config.set(RuleKey::Stacking, RuleValue::Bool(true), RuleSource::Api);
        config.set(RuleKey::StackSelect, RuleValue::Bool(true), RuleSource::Api);

        assert!(!config.set(RuleKey::Stacking, RuleValue::Bool(false), RuleSource::Api));
        assert!(config.enabled(RuleKey::Stacking));

        config.set(RuleKey::StackSelect, RuleValue::Bool(false), RuleSource::Api);
        assert!(config.set(RuleKey::Stacking, RuleValue::Bool(false), RuleSource::Api));
    }

    #[test]
    fn test_count_change_requires_dependency() {
        let config = RuleConfig::new();
        assert!(!config.set(
            RuleKey::StackingLimit,
            RuleValue::Count(5),
            RuleSource::Ui
        ));

        config.set(RuleKey::Stacking, RuleValue::Bool(true), RuleSource::Ui);
        assert!(config.set(
            RuleKey::StackingLimit,
            RuleValue::Count(5),
            RuleSource::Ui
        ));
        assert_eq!(config.count(RuleKey::StackingLimit), 5);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let config = RuleConfig::new();
        config.set(RuleKey::LeftRightConnected, RuleValue::Bool(true), RuleSource::Ui);
        config.set(RuleKey::ChariotWrap, RuleValue::Bool(true), RuleSource::Ui);

        let snapshot = config.snapshot();
        let restored = RuleConfig::new();
        restored.apply_snapshot(&snapshot, RuleSource::Api).unwrap();
        assert!(restored.enabled(RuleKey::ChariotWrap));
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_invalid_snapshot_rejected_whole() {
        let config = RuleConfig::new();
        let mut snapshot = config.snapshot();
        // Dependent without its dependency.
        snapshot.insert(RuleKey::ChariotWrap, RuleValue::Bool(true));

        let before = config.snapshot();
        assert!(config.apply_snapshot(&snapshot, RuleSource::Api).is_err());
        assert_eq!(config.snapshot(), before);
    }
}
