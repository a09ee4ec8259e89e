//! Configuration for the eventing client.
//!
//! One struct controls renewal scheduling, the outbound transport, and
//! the callback ports advertised to publishers.

use std::time::Duration;

use gena_transport::TransportConfig;

use crate::error::GenaError;

/// Configuration for a [`GenaClient`](crate::GenaClient).
#[derive(Debug, Clone)]
pub struct GenaConfig {
    /// How many seconds before expiry a renewal fires.
    ///
    /// 0 disables automatic renewal: the timer instead delivers a
    /// `SubscriptionExpired` upcall when the granted duration elapses.
    /// Default: 10
    pub auto_renew_margin_secs: u32,

    /// Floor for finite requested subscription timeouts.
    /// Default: 1800 seconds, the UPnP control-point minimum
    pub min_subscription_secs: u32,

    /// Bounded total time for one outbound HTTP round-trip.
    /// Default: 30 seconds
    pub http_timeout: Duration,

    /// Port advertised in callback URLs for IPv4 publishers.
    /// Default: 49152
    pub local_port_v4: u16,

    /// Port advertised in callback URLs for IPv6 publishers.
    /// Default: 49153
    pub local_port_v6: u16,

    /// `USER-AGENT` value for outbound requests.
    /// Default: OS/arch plus the library version
    pub user_agent: String,
}

impl Default for GenaConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            auto_renew_margin_secs: 10,
            min_subscription_secs: transport.min_subscription_secs,
            http_timeout: transport.http_timeout,
            local_port_v4: transport.local_port_v4,
            local_port_v6: transport.local_port_v6,
            user_agent: transport.user_agent,
        }
    }
}

impl GenaConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with automatic renewal disabled.
    ///
    /// Expiring subscriptions are reported through the
    /// `SubscriptionExpired` upcall instead of being renewed.
    pub fn no_auto_renew() -> Self {
        Self {
            auto_renew_margin_secs: 0,
            ..Default::default()
        }
    }

    /// Set the renewal margin in seconds.
    pub fn with_auto_renew_margin(mut self, secs: u32) -> Self {
        self.auto_renew_margin_secs = secs;
        self
    }

    /// Set the floor for requested subscription timeouts.
    pub fn with_min_subscription_secs(mut self, secs: u32) -> Self {
        self.min_subscription_secs = secs;
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the callback ports advertised to publishers.
    pub fn with_callback_ports(mut self, v4: u16, v6: u16) -> Self {
        self.local_port_v4 = v4;
        self.local_port_v6 = v6;
        self
    }

    /// Set the `USER-AGENT` header value.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GenaError> {
        if self.min_subscription_secs == 0 {
            return Err(GenaError::Configuration(
                "minimum subscription time must be greater than 0".to_string(),
            ));
        }
        if self.auto_renew_margin_secs >= self.min_subscription_secs {
            return Err(GenaError::Configuration(
                "renewal margin must be below the minimum subscription time".to_string(),
            ));
        }
        if self.http_timeout == Duration::ZERO {
            return Err(GenaError::Configuration(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }
        if self.user_agent.is_empty() {
            return Err(GenaError::Configuration(
                "user agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The transport-level slice of this configuration.
    pub(crate) fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            user_agent: self.user_agent.clone(),
            http_timeout: self.http_timeout,
            min_subscription_secs: self.min_subscription_secs,
            local_port_v4: self.local_port_v4,
            local_port_v6: self.local_port_v6,
        }
    }
}
