//! Configuration types for the sentsync system

use serde::{Deserialize, Serialize};

/// Main sentsync configuration
///
/// One process tracks exactly one Sentinel master and one Endpoints resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sentinel address to query (host:port)
    #[serde(default = "default_sentinel_addr")]
    pub sentinel_addr: String,

    /// Logical name of the Redis master, as known to Sentinel
    #[serde(default = "default_master_name")]
    pub master_name: String,

    /// Kubernetes API server address (host:port)
    #[serde(default = "default_kube_api_addr")]
    pub kube_api_addr: String,

    /// Name of the Endpoints resource to keep in sync
    pub service_name: String,

    /// Loop settings
    #[serde(default)]
    pub loop_settings: LoopConfig,
}

impl SyncConfig {
    /// Create a configuration for the given service name, everything else defaulted
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            sentinel_addr: default_sentinel_addr(),
            master_name: default_master_name(),
            kube_api_addr: default_kube_api_addr(),
            service_name: service_name.into(),
            loop_settings: LoopConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Runs once at startup; any failure here is fatal before the loop starts.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.service_name.is_empty() {
            return Err(crate::Error::config("service name must be set"));
        }
        if self.master_name.is_empty() {
            return Err(crate::Error::config("master name must be set"));
        }
        validate_host_port("sentinel address", &self.sentinel_addr)?;
        validate_host_port("kube api address", &self.kube_api_addr)?;
        self.loop_settings.validate()?;
        Ok(())
    }
}

/// Reconciliation loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Fixed interval between cycles, in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Consecutive unchanged cycles before a forced re-publish
    ///
    /// The Sentinel answer can stay constant while the Endpoints resource is
    /// reset behind our back, so periodic re-publication is a correctness
    /// safeguard, not an optimization.
    #[serde(default = "default_resync_threshold")]
    pub resync_threshold: u32,

    /// Capacity of the reconciler event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl LoopConfig {
    /// Validate the loop settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("loop interval must be > 0"));
        }
        if self.resync_threshold == 0 {
            return Err(crate::Error::config("resync threshold must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            resync_threshold: default_resync_threshold(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Check that a string looks like host:port with a valid port
///
/// Hostnames are accepted without resolving them; DNS may legitimately only
/// work inside the cluster.
fn validate_host_port(what: &str, value: &str) -> Result<(), crate::Error> {
    let Some((host, port)) = value.rsplit_once(':') else {
        return Err(crate::Error::config(format!(
            "{what} '{value}' must be host:port"
        )));
    };
    if host.is_empty() {
        return Err(crate::Error::config(format!(
            "{what} '{value}' has an empty host"
        )));
    }
    if port.parse::<u16>().is_err() {
        return Err(crate::Error::config(format!(
            "{what} '{value}' has an invalid port"
        )));
    }
    Ok(())
}

fn default_sentinel_addr() -> String {
    "127.0.0.1:26379".to_string()
}

fn default_master_name() -> String {
    "mymaster".to_string()
}

fn default_kube_api_addr() -> String {
    "kubernetes.default.svc:443".to_string()
}

fn default_interval_secs() -> u64 {
    1
}

fn default_resync_threshold() -> u32 {
    15
}

fn default_event_channel_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SyncConfig::new("redis-master");
        assert!(config.validate().is_ok());
        assert_eq!(config.loop_settings.interval_secs, 1);
        assert_eq!(config.loop_settings.resync_threshold, 15);
    }

    #[test]
    fn empty_service_name_rejected() {
        let config = SyncConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_sentinel_addr_rejected() {
        let mut config = SyncConfig::new("redis-master");
        config.sentinel_addr = "no-port-here".to_string();
        assert!(config.validate().is_err());

        config.sentinel_addr = "host:99999".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn hostname_addresses_accepted_without_resolution() {
        let mut config = SyncConfig::new("redis-master");
        config.kube_api_addr = "kubernetes.default.svc:443".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = SyncConfig::new("redis-master");
        config.loop_settings.interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
