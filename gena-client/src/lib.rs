//! Control-point side of UPnP eventing (GENA).
//!
//! A control point subscribes to a publisher's event URL, the publisher
//! pushes NOTIFY messages carrying an XML property set, and the
//! subscription must be renewed before it expires or cancelled with
//! UNSUBSCRIBE. This crate implements that lifecycle: the subscription
//! table, timed automatic renewals, validation and dispatch of inbound
//! notifications, and the upcalls that deliver events to user code.
//!
//! The HTTP server receiving NOTIFYs is not part of this crate; it
//! hands each transaction over as a [`NotifyRequest`] and answers with
//! the status the dispatcher chooses. Outbound requests go through
//! [`gena_transport`], or through any [`SubscribeTransport`]
//! implementation in tests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gena_client::{ClientEvent, GenaClient, GenaConfig, Timeout};
//!
//! # fn main() -> Result<(), gena_client::GenaError> {
//! let client = GenaClient::new(GenaConfig::default())?;
//! let handle = client.register_client(Arc::new(|event| {
//!     if let ClientEvent::Received(record) = event {
//!         println!("{}: {} variables", record.sid, record.changed_variables.len());
//!     }
//! }));
//!
//! let grant = client.subscribe(
//!     handle,
//!     "http://10.0.0.5:49152/svc/evt",
//!     Timeout::Seconds(1800),
//! )?;
//! // ... NOTIFYs arrive through dispatch_notify, renewals are automatic ...
//! client.unsubscribe(handle, &grant.sid)?;
//! client.unregister_client(handle)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod manager;
mod notify;
mod propset;
mod scheduler;
mod table;
mod transport;

pub use config::GenaConfig;
pub use error::{GenaError, Result};
pub use events::{ClientEvent, EventCallback, EventRecord};
pub use manager::GenaClient;
pub use notify::{NotifyRequest, NotifyStatus};
pub use propset::PropertySet;
pub use table::{ClientHandle, SubscriptionSnapshot};
pub use transport::SubscribeTransport;

// The wire-level types callers need alongside the client.
pub use gena_transport::{SubscriptionGrant, Timeout};
