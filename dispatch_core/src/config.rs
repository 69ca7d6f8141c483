//! Client configuration.

use std::time::Duration;

/// Interval between status polls while a simulation is running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Maximum number of location nodes drawn on the map.
pub const DEFAULT_MAX_NODES: usize = 20;

/// Point count used for the map before any configuration has been accepted.
pub const FALLBACK_POINTS: u32 = 6;

/// Configuration for a monitor client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dispatch service (default: http://localhost:8080)
    pub backend_url: String,

    /// Status poll cadence (default: 2000 ms)
    pub poll_interval: Duration,

    /// Per-request timeout for backend calls (default: 10 s)
    pub request_timeout: Duration,

    /// Map node cap (default: 20)
    pub max_nodes: usize,

    /// Map point count when no config is active (default: 6)
    pub fallback_points: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(10),
            max_nodes: DEFAULT_MAX_NODES,
            fallback_points: FALLBACK_POINTS,
        }
    }
}

impl ClientConfig {
    /// Sets the backend URL.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the map node cap.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.max_nodes, 20);
        assert_eq!(config.fallback_points, 6);
        assert_eq!(config.backend_url, "http://localhost:8080");
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_backend_url("http://sim:9000")
            .with_poll_interval(Duration::from_millis(500))
            .with_max_nodes(12);
        assert_eq!(config.backend_url, "http://sim:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_nodes, 12);
    }
}
