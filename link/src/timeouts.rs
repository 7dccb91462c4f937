//! Timeout and transport-wide option configuration.
//!
//! Timeouts apply to every request of a kind (read or write); they are not
//! configurable per query.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout configuration for the HTTP transport.
///
/// # Examples
///
/// ```rust
/// use clickhouse_link::TransportTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = TransportTimeouts::default();
///
/// // Long-running analytical reads
/// let timeouts = TransportTimeouts::builder()
///     .read_timeout(Duration::from_secs(600))
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = TransportTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Total timeout of one read request, including streaming the response.
    /// Default: 50 seconds
    pub read_timeout: Duration,

    /// Total timeout of one write request, including uploading the body.
    /// Default: 100 seconds
    pub write_timeout: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(50),
            write_timeout: Duration::from_secs(100),
        }
    }
}

impl TransportTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> TransportTimeoutsBuilder {
        TransportTimeoutsBuilder::new()
    }

    /// Create timeouts suited to a server on localhost.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
        }
    }

    /// Zero means "no timeout".
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero()
    }
}

/// Builder for creating custom [`TransportTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct TransportTimeoutsBuilder {
    timeouts: TransportTimeouts,
}

impl TransportTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: TransportTimeouts::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.write_timeout = timeout;
        self
    }

    pub fn build(self) -> TransportTimeouts {
        self.timeouts
    }
}

/// Transport-wide options.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::{TransportOptions, TransportTimeouts};
///
/// let options = TransportOptions::new()
///     .with_deflate(false)
///     .with_timeouts(TransportTimeouts::fast());
/// assert!(!options.deflate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Gzip request bodies (SQL text and write payloads).
    /// Default: true
    #[serde(default = "default_deflate")]
    pub deflate: bool,

    #[serde(default)]
    pub timeouts: TransportTimeouts,
}

fn default_deflate() -> bool {
    true
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            deflate: default_deflate(),
            timeouts: TransportTimeouts::default(),
        }
    }
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deflate(mut self, deflate: bool) -> Self {
        self.deflate = deflate;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TransportTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = TransportTimeouts::default();
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.read_timeout, Duration::from_secs(50));
        assert_eq!(timeouts.write_timeout, Duration::from_secs(100));
    }

    #[test]
    fn test_builder() {
        let timeouts = TransportTimeouts::builder()
            .connect_timeout(Duration::from_secs(1))
            .read_timeout(Duration::from_secs(120))
            .build();

        assert_eq!(timeouts.connect_timeout, Duration::from_secs(1));
        assert_eq!(timeouts.read_timeout, Duration::from_secs(120));
        assert_eq!(timeouts.write_timeout, Duration::from_secs(100));
    }

    #[test]
    fn test_fast_preset() {
        let timeouts = TransportTimeouts::fast();
        assert!(timeouts.connect_timeout <= Duration::from_secs(5));
        assert!(timeouts.read_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_options_default_deflate() {
        let options = TransportOptions::default();
        assert!(options.deflate);
        assert!(!TransportTimeouts::is_no_timeout(options.timeouts.read_timeout));
        assert!(TransportTimeouts::is_no_timeout(Duration::ZERO));
    }
}
