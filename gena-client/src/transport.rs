//! The seam between the subscription manager and the HTTP issuer.
//!
//! The manager talks to publishers through this trait so tests can
//! substitute stub transports; the production implementation is
//! [`gena_transport::GenaHttpClient`].

use gena_transport::{GenaHttpClient, SubscriptionGrant, Timeout};

use crate::error::Result;

/// Synchronous outbound SUBSCRIBE/UNSUBSCRIBE issuer.
///
/// Calls may block up to the transport's HTTP timeout and are always
/// made with the manager's locks released (except for the global
/// subscribe serialization, which is a dedicated lock).
pub trait SubscribeTransport: Send + Sync {
    /// Issue a SUBSCRIBE. `renewal_sid` is `None` for an initial
    /// subscription and the current SID for a renewal.
    fn subscribe(
        &self,
        event_url: &str,
        timeout: Timeout,
        renewal_sid: Option<&str>,
    ) -> Result<SubscriptionGrant>;

    /// Issue an UNSUBSCRIBE for an existing subscription.
    fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<()>;
}

impl SubscribeTransport for GenaHttpClient {
    fn subscribe(
        &self,
        event_url: &str,
        timeout: Timeout,
        renewal_sid: Option<&str>,
    ) -> Result<SubscriptionGrant> {
        GenaHttpClient::subscribe(self, event_url, timeout, renewal_sid).map_err(Into::into)
    }

    fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<()> {
        GenaHttpClient::unsubscribe(self, event_url, sid).map_err(Into::into)
    }
}
