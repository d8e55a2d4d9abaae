#![forbid(unsafe_code)]

//! Broker and runtime configuration.
//!
//! Defaults suit an interactive UI thread. Every knob can be overridden
//! from the environment:
//!
//! | Variable                  | Field                                   | Default |
//! |---------------------------|-----------------------------------------|---------|
//! | `TETHER_PURGE_ON_ADD`     | [`BrokerConfig::purge_on_add`]          | off     |
//! | `TETHER_SWEEP_ALIVE`      | [`BrokerConfig::sweep_alive_on_cleanup`]| on      |
//! | `TETHER_CLEANUP_ON_IDLE`  | [`RuntimeConfig::cleanup_on_idle`]      | on      |
//!
//! Truthy values are `1`, `true`, `yes`, `on` (case-insensitive); anything
//! else is false. Unset variables keep the default.

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn flag_from<F>(get_env: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    get_env(key).map_or(default, |v| env_flag(&v))
}

/// Per-broker behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokerConfig {
    /// When a cleanup is pending, purge the source's sink list before
    /// appending a new subscription to it.
    pub purge_on_add: bool,
    /// Cleanup passes also drop listener entries whose target is dead.
    pub sweep_alive_on_cleanup: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            purge_on_add: false,
            sweep_alive_on_cleanup: true,
        }
    }
}

impl BrokerConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides using a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            purge_on_add: flag_from(&get_env, "TETHER_PURGE_ON_ADD", defaults.purge_on_add),
            sweep_alive_on_cleanup: flag_from(
                &get_env,
                "TETHER_SWEEP_ALIVE",
                defaults.sweep_alive_on_cleanup,
            ),
        }
    }

    #[must_use]
    pub fn with_purge_on_add(mut self, enabled: bool) -> Self {
        self.purge_on_add = enabled;
        self
    }

    #[must_use]
    pub fn with_sweep_alive_on_cleanup(mut self, enabled: bool) -> Self {
        self.sweep_alive_on_cleanup = enabled;
        self
    }
}

/// Configuration for a [`UiContext`](crate::context::UiContext).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeConfig {
    /// Config handed to every broker the context creates.
    pub broker: BrokerConfig,
    /// Run scheduled cleanups from [`UiContext::process_idle`](crate::context::UiContext::process_idle).
    pub cleanup_on_idle: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            cleanup_on_idle: true,
        }
    }
}

impl RuntimeConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides using a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            cleanup_on_idle: flag_from(&get_env, "TETHER_CLEANUP_ON_IDLE", defaults.cleanup_on_idle),
            broker: BrokerConfig::from_env_with(get_env),
        }
    }

    #[must_use]
    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }

    #[must_use]
    pub fn with_cleanup_on_idle(mut self, enabled: bool) -> Self {
        self.cleanup_on_idle = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_flag_truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(env_flag(v), "{v:?} should be truthy");
        }
        for v in ["0", "false", "off", "", "maybe"] {
            assert!(!env_flag(v), "{v:?} should be falsy");
        }
    }

    #[test]
    fn unset_env_keeps_defaults() {
        let cfg = RuntimeConfig::from_env_with(|_| None);
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = RuntimeConfig::from_env_with(lookup(&[
            ("TETHER_PURGE_ON_ADD", "yes"),
            ("TETHER_SWEEP_ALIVE", "0"),
            ("TETHER_CLEANUP_ON_IDLE", "off"),
        ]));
        assert!(cfg.broker.purge_on_add);
        assert!(!cfg.broker.sweep_alive_on_cleanup);
        assert!(!cfg.cleanup_on_idle);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn runtime_config_serde_roundtrip() {
        let cfg = RuntimeConfig::default().with_cleanup_on_idle(false);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"cleanup_on_idle\":false"));
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn builders_chain() {
        let cfg = RuntimeConfig::default()
            .with_cleanup_on_idle(false)
            .with_broker(BrokerConfig::default().with_purge_on_add(true).with_sweep_alive_on_cleanup(false));
        assert!(!cfg.cleanup_on_idle);
        assert!(cfg.broker.purge_on_add);
        assert!(!cfg.broker.sweep_alive_on_cleanup);
    }
}
