//! Minimal blocking HTTP client for GENA subscription management.
//!
//! This crate issues the two outbound request types of UPnP eventing,
//! SUBSCRIBE and UNSUBSCRIBE, and knows nothing about subscription
//! lifecycles: it builds the request headers, applies the configured
//! timeout floor, picks a local callback address for initial
//! subscriptions, and maps HTTP outcomes to a small error taxonomy.
//! Everything stateful lives in the `gena-client` crate on top.

mod error;
mod timeout;

pub use error::{Result, TransportError};
pub use timeout::Timeout;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use url::Url;

/// Configuration for the outbound GENA request issuer.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Value of the `USER-AGENT` header on every request
    pub user_agent: String,
    /// Bounded total time for one HTTP round-trip
    pub http_timeout: Duration,
    /// Floor applied to finite requested timeouts
    pub min_subscription_secs: u32,
    /// Port advertised in the callback URL for IPv4 publishers
    pub local_port_v4: u16,
    /// Port advertised in the callback URL for IPv6 publishers
    pub local_port_v6: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            http_timeout: Duration::from_secs(30),
            min_subscription_secs: 1800,
            local_port_v4: 49152,
            local_port_v6: 49153,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "{}/{} UPnP/1.1 gena-transport/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    )
}

/// Response to a successful SUBSCRIBE, initial or renewal.
#[derive(Debug, Clone)]
pub struct SubscriptionGrant {
    /// Subscription ID issued (or re-issued) by the publisher
    pub sid: String,
    /// Duration actually granted by the publisher
    pub timeout: Timeout,
}

/// A blocking GENA request issuer over a shared HTTP agent.
///
/// Cloning is cheap: clones share the underlying agent and its
/// connection pool.
#[derive(Debug, Clone)]
pub struct GenaHttpClient {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl GenaHttpClient {
    /// Create a client with the given configuration.
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.http_timeout)
            .build();
        Self { agent, config }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send a SUBSCRIBE request and extract the granted SID and timeout.
    ///
    /// With `renewal_sid == None` this is an initial subscription: the
    /// request carries `CALLBACK` and `NT` headers and the publisher
    /// issues a fresh SID. With `Some(sid)` it is a renewal: the request
    /// carries only the `SID` header and the publisher may rotate the
    /// SID in its answer.
    ///
    /// Finite requested timeouts below the configured minimum are raised
    /// to it before the request is sent.
    pub fn subscribe(
        &self,
        event_url: &str,
        timeout: Timeout,
        renewal_sid: Option<&str>,
    ) -> Result<SubscriptionGrant> {
        let url = parse_event_url(event_url)?;
        let timeout = timeout.with_floor(self.config.min_subscription_secs);

        let mut request = self.agent.request("SUBSCRIBE", url.as_str());
        match renewal_sid {
            None => {
                let callback = self.callback_url(&url)?;
                tracing::debug!(url = %url, callback = %callback, %timeout, "SUBSCRIBE (initial)");
                request = request
                    .set("CALLBACK", &format!("<{callback}>"))
                    .set("NT", "upnp:event");
            }
            Some(sid) => {
                tracing::debug!(url = %url, sid, %timeout, "SUBSCRIBE (renewal)");
                request = request.set("SID", sid);
            }
        }
        let response = request
            .set("TIMEOUT", &timeout.to_string())
            .set("USER-AGENT", &self.config.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    tracing::debug!(code, "SUBSCRIBE refused");
                    TransportError::SubscribeUnaccepted(code)
                }
                other => TransportError::SocketConnect(other.to_string()),
            })?;

        let sid = response
            .header("SID")
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| TransportError::BadResponse("no SID header in answer".into()))?
            .to_string();
        let granted = response
            .header("TIMEOUT")
            .ok_or_else(|| TransportError::BadResponse("no TIMEOUT header in answer".into()))
            .and_then(Timeout::parse_header)?;

        tracing::debug!(sid = %sid, %granted, "SUBSCRIBE ok");
        Ok(SubscriptionGrant {
            sid,
            timeout: granted,
        })
    }

    /// Send an UNSUBSCRIBE request for an existing subscription.
    pub fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<()> {
        let url = parse_event_url(event_url)?;
        tracing::debug!(url = %url, sid, "UNSUBSCRIBE");

        self.agent
            .request("UNSUBSCRIBE", url.as_str())
            .set("SID", sid)
            .set("USER-AGENT", &self.config.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => TransportError::UnsubscribeUnaccepted(code),
                other => TransportError::SocketConnect(other.to_string()),
            })?;
        Ok(())
    }

    /// Build the callback URL to advertise to a publisher.
    ///
    /// The local address is chosen by a connected-UDP routing probe
    /// toward the publisher: the socket never sends anything, it only
    /// asks the routing table which source address would be used. IPv6
    /// literals are bracketed and each family gets its configured port.
    fn callback_url(&self, dest: &Url) -> Result<String> {
        let dest_addr = resolve_host(dest)?;
        let local = local_address_for(dest_addr)?;
        Ok(match local {
            IpAddr::V4(ip) => format!("http://{}:{}/", ip, self.config.local_port_v4),
            IpAddr::V6(ip) => format!("http://[{}]:{}/", ip, self.config.local_port_v6),
        })
    }
}

impl Default for GenaHttpClient {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

/// Validate an event URL: absolute, http(s), with a host.
fn parse_event_url(event_url: &str) -> Result<Url> {
    let url =
        Url::parse(event_url).map_err(|e| TransportError::InvalidUrl(format!("{event_url}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TransportError::InvalidUrl(format!(
            "{event_url}: unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(TransportError::InvalidUrl(format!("{event_url}: no host")));
    }
    Ok(url)
}

/// Resolve the URL host to one socket address.
fn resolve_host(url: &Url) -> Result<SocketAddr> {
    url.socket_addrs(|| None)
        .map_err(|e| TransportError::SocketConnect(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::SocketConnect(format!("no address for {url}")))
}

/// The source address the routing table would use to reach `dest`.
fn local_address_for(dest: SocketAddr) -> Result<IpAddr> {
    let bind_addr = match dest {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(dest)?;
        Ok(socket.local_addr()?.ip())
    };
    probe().map_err(|e| {
        TransportError::SocketConnect(format!("no local address to reach {dest}: {e}"))
    })
}
