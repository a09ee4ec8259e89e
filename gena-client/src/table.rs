//! The client handle table and per-client subscription lists.
//!
//! One process-wide table maps small integer handles to client state.
//! All access goes through the manager's handle lock; nothing here
//! performs I/O or blocks.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::events::EventCallback;
use crate::scheduler::TimerId;

/// Opaque identifier for a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClientHandle(pub(crate) u32);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// One active subscription owned by a client.
#[derive(Debug, Clone)]
pub(crate) struct ClientSubscription {
    /// Publisher-issued subscription ID; never empty while tabled
    pub sid: String,
    /// Absolute URL renewals and unsubscribes are sent to
    pub event_url: String,
    /// Pending renewal timer, if one is armed
    pub renew_timer: Option<TimerId>,
}

/// Value-copy view of a subscription, safe to hand out.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSnapshot {
    /// Publisher-issued subscription ID
    pub sid: String,
    /// Absolute URL renewals and unsubscribes are sent to
    pub event_url: String,
    /// Whether a renewal timer is currently armed
    pub auto_renew: bool,
}

/// Per-client state: the user callback and the subscription list.
pub(crate) struct ClientState {
    pub callback: EventCallback,
    pub subscriptions: Vec<ClientSubscription>,
}

impl ClientState {
    pub fn find(&self, sid: &str) -> Option<&ClientSubscription> {
        self.subscriptions.iter().find(|s| s.sid == sid)
    }

    pub fn find_mut(&mut self, sid: &str) -> Option<&mut ClientSubscription> {
        self.subscriptions.iter_mut().find(|s| s.sid == sid)
    }

    /// Drop the subscription with this SID, returning it if present.
    pub fn remove(&mut self, sid: &str) -> Option<ClientSubscription> {
        let index = self.subscriptions.iter().position(|s| s.sid == sid)?;
        Some(self.subscriptions.swap_remove(index))
    }

    /// Detach any one subscription, used by client teardown.
    pub fn pop(&mut self) -> Option<ClientSubscription> {
        self.subscriptions.pop()
    }
}

/// The process-wide handle table.
pub(crate) struct HandleTable {
    clients: HashMap<u32, ClientState>,
    next_handle: u32,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn register(&mut self, callback: EventCallback) -> ClientHandle {
        let handle = ClientHandle(self.next_handle);
        self.next_handle += 1;
        self.clients.insert(
            handle.0,
            ClientState {
                callback,
                subscriptions: Vec::new(),
            },
        );
        handle
    }

    pub fn contains(&self, handle: ClientHandle) -> bool {
        self.clients.contains_key(&handle.0)
    }

    pub fn get(&self, handle: ClientHandle) -> Option<&ClientState> {
        self.clients.get(&handle.0)
    }

    pub fn get_mut(&mut self, handle: ClientHandle) -> Option<&mut ClientState> {
        self.clients.get_mut(&handle.0)
    }

    pub fn remove(&mut self, handle: ClientHandle) -> Option<ClientState> {
        self.clients.remove(&handle.0)
    }

    /// The single active client, if one is registered.
    ///
    /// NOTIFY correlation assumes at most one control-point client per
    /// process; with several registered, the lowest handle wins so the
    /// choice is at least deterministic.
    pub fn active_client(&mut self) -> Option<(ClientHandle, &mut ClientState)> {
        let handle = self.clients.keys().copied().min()?;
        self.clients
            .get_mut(&handle)
            .map(|state| (ClientHandle(handle), state))
    }
}
