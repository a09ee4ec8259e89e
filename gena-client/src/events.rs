//! Upcalls delivered to user code.

use std::sync::Arc;

use gena_transport::Timeout;
use serde::Serialize;

use crate::error::GenaError;
use crate::propset::PropertySet;

/// One notification as delivered to the user callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Subscription the notification belongs to
    pub sid: String,
    /// Sequence number from the `SEQ` header; 0 for the initial event.
    /// Publishers wrap from 2^32-1 back to 1.
    pub event_key: u32,
    /// Variables that changed, with their new values
    pub changed_variables: PropertySet,
}

/// Everything the client reports to user code.
///
/// Callbacks are invoked from whichever thread triggered the event (a
/// notification thread or the renewal timer thread) and never with a
/// client lock held, so a callback may call back into the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A NOTIFY was accepted and parsed
    Received(EventRecord),

    /// Automatic renewal is disabled and the subscription's granted
    /// duration has elapsed
    SubscriptionExpired {
        /// Subscription that expired
        sid: String,
        /// Event URL the subscription was made against
        publisher_url: String,
        /// Duration that was granted
        timeout: Timeout,
    },

    /// A timer-driven renewal failed; the subscription has been dropped
    /// from the table
    AutoRenewalFailed {
        /// Subscription that could not be renewed
        sid: String,
        /// Event URL the renewal was sent to
        publisher_url: String,
        /// Duration the renewal asked for
        timeout: Timeout,
        /// Why the renewal failed
        error: GenaError,
    },
}

/// User callback invoked for every [`ClientEvent`].
pub type EventCallback = Arc<dyn Fn(ClientEvent) + Send + Sync>;
