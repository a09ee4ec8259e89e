//! Subscription lifecycle management.
//!
//! [`GenaClient`] owns the handle table, the renewal timer thread, and
//! the outbound transport, and implements subscribe, renew, unsubscribe
//! and client teardown on top of them, plus the dispatch of inbound
//! NOTIFY transactions.
//!
//! # Locking
//!
//! Two locks coordinate everything:
//!
//! - the handle lock guards the handle table and every per-client
//!   subscription list. Critical sections are short and it is never
//!   held across an outbound HTTP call: operations snapshot what they
//!   need, drop the lock, do the round-trip, re-acquire and re-find.
//! - the subscribe serialization lock is held from the start of an
//!   initial SUBSCRIBE until its SID is recorded in the table. Its one
//!   purpose is the first-notification race: a publisher may deliver
//!   the `SEQ: 0` NOTIFY before its SUBSCRIBE response is processed,
//!   and the NOTIFY path queues on this lock instead of rejecting the
//!   unknown SID.
//!
//! When both are needed the serialization lock is taken first; taking
//! them in the other order would deadlock against the NOTIFY recovery
//! path. User callbacks run with no lock held, so they may call back
//! into the client.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use gena_transport::{GenaHttpClient, SubscriptionGrant, Timeout};

use crate::config::GenaConfig;
use crate::error::{GenaError, Result};
use crate::events::{ClientEvent, EventCallback, EventRecord};
use crate::notify::{parse_notify, NotifyRequest, NotifyStatus};
use crate::scheduler::{Scheduler, TimerId};
use crate::table::{ClientHandle, ClientSubscription, HandleTable, SubscriptionSnapshot};
use crate::transport::SubscribeTransport;

/// The control-point side of UPnP eventing.
///
/// Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct GenaClient {
    inner: Arc<Inner>,
}

struct Inner {
    auto_renew_margin_secs: u32,
    transport: Arc<dyn SubscribeTransport>,
    /// Handle lock: guards the table, never held across I/O
    handles: Mutex<HandleTable>,
    /// Serializes initial SUBSCRIBEs with the seq==0 NOTIFY retry
    subscribe_serial: Mutex<()>,
    scheduler: Scheduler,
}

impl GenaClient {
    /// Create a client using the real HTTP transport.
    pub fn new(config: GenaConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(GenaHttpClient::new(config.transport_config()));
        Self::with_transport(config, transport)
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(
        config: GenaConfig,
        transport: Arc<dyn SubscribeTransport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                auto_renew_margin_secs: config.auto_renew_margin_secs,
                transport,
                handles: Mutex::new(HandleTable::new()),
                subscribe_serial: Mutex::new(()),
                scheduler: Scheduler::new()?,
            }),
        })
    }

    /// Register a client and obtain the handle used by every other
    /// operation. The callback receives all upcalls for this client.
    pub fn register_client(&self, callback: EventCallback) -> ClientHandle {
        let handle = self.inner.handles.lock().unwrap().register(callback);
        tracing::debug!(%handle, "client registered");
        handle
    }

    /// Tear down a client: unsubscribe everything it holds, cancel its
    /// renewal timers, and invalidate the handle.
    ///
    /// UNSUBSCRIBE failures are logged and ignored; the publisher will
    /// expire those subscriptions on its own.
    pub fn unregister_client(&self, handle: ClientHandle) -> Result<()> {
        loop {
            let sub = {
                let mut table = self.inner.handles.lock().unwrap();
                let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
                match state.pop() {
                    Some(sub) => sub,
                    None => break,
                }
            };
            if let Err(error) = self.inner.transport.unsubscribe(&sub.event_url, &sub.sid) {
                tracing::warn!(sid = %sub.sid, %error, "UNSUBSCRIBE failed during client teardown");
            }
            if let Some(timer) = sub.renew_timer {
                self.inner.scheduler.cancel(timer);
            }
        }

        // Final sweep: removing the state also clears any subscription
        // that raced in while the lock was released above.
        self.inner.handles.lock().unwrap().remove(handle);
        tracing::debug!(%handle, "client unregistered");
        Ok(())
    }

    /// Subscribe to a publisher's event URL.
    ///
    /// On success the subscription is recorded in the table, a renewal
    /// timer is armed (unless the grant is infinite), and the
    /// publisher's SID and granted duration are returned.
    pub fn subscribe(
        &self,
        handle: ClientHandle,
        event_url: &str,
        timeout: Timeout,
    ) -> Result<SubscriptionGrant> {
        if !self.inner.handles.lock().unwrap().contains(handle) {
            return Err(GenaError::BadHandle);
        }

        // Held across the round-trip so a first notification racing the
        // response waits until the SID is in the table.
        let _serial = self.inner.subscribe_serial.lock().unwrap();
        let grant = self.inner.transport.subscribe(event_url, timeout, None)?;

        let mut table = self.inner.handles.lock().unwrap();
        // The client may have been torn down during the round-trip.
        let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
        state.subscriptions.push(ClientSubscription {
            sid: grant.sid.clone(),
            event_url: event_url.to_string(),
            renew_timer: None,
        });
        let timer =
            Inner::schedule_auto_renew(&self.inner, handle, &grant.sid, event_url, grant.timeout)?;
        if let Some(sub) = state.find_mut(&grant.sid) {
            sub.renew_timer = timer;
        }
        tracing::debug!(%handle, sid = %grant.sid, granted = %grant.timeout, "subscribed");
        Ok(grant)
    }

    /// Renew an existing subscription.
    ///
    /// The publisher may rotate the SID; the table entry is updated in
    /// place. If the renewal fails over the network the entry is
    /// removed, because the publisher may already have forgotten it.
    pub fn renew(&self, handle: ClientHandle, sid: &str, timeout: Timeout) -> Result<Timeout> {
        Inner::renew(&self.inner, handle, sid, timeout)
    }

    /// Unsubscribe and remove a subscription.
    ///
    /// The UNSUBSCRIBE itself is best-effort: the local entry is
    /// removed whether or not the publisher accepted it.
    pub fn unsubscribe(&self, handle: ClientHandle, sid: &str) -> Result<()> {
        let (event_url, timer) = {
            let mut table = self.inner.handles.lock().unwrap();
            let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
            let sub = state.find(sid).ok_or(GenaError::BadSid)?;
            (sub.event_url.clone(), sub.renew_timer)
        };

        if let Err(error) = self.inner.transport.unsubscribe(&event_url, sid) {
            tracing::warn!(sid, %error, "UNSUBSCRIBE failed; removing local subscription anyway");
        }
        if let Some(timer) = timer {
            self.inner.scheduler.cancel(timer);
        }

        let mut table = self.inner.handles.lock().unwrap();
        let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
        state.remove(sid);
        tracing::debug!(%handle, sid, "unsubscribed");
        Ok(())
    }

    /// Value-copies of the client's current subscriptions.
    pub fn subscriptions(&self, handle: ClientHandle) -> Result<Vec<SubscriptionSnapshot>> {
        let table = self.inner.handles.lock().unwrap();
        let state = table.get(handle).ok_or(GenaError::BadHandle)?;
        Ok(state
            .subscriptions
            .iter()
            .map(|sub| SubscriptionSnapshot {
                sid: sub.sid.clone(),
                event_url: sub.event_url.clone(),
                auto_renew: sub.renew_timer.is_some(),
            })
            .collect())
    }

    /// Process one inbound NOTIFY transaction.
    ///
    /// `respond` is invoked exactly once with the HTTP status to answer
    /// on the transaction, before the user callback runs, so a slow
    /// callback cannot stall the publisher. The callback itself is
    /// invoked with no lock held.
    pub fn dispatch_notify<R>(&self, request: &NotifyRequest, respond: R)
    where
        R: FnOnce(NotifyStatus),
    {
        let parsed = match parse_notify(request) {
            Ok(parsed) => parsed,
            Err(status) => {
                respond(status);
                return;
            }
        };

        let callback = match self.inner.lookup_notify_target(&parsed.sid) {
            NotifyLookup::Found(callback) => callback,
            NotifyLookup::NoClient => {
                tracing::debug!("NOTIFY with no client registered");
                respond(NotifyStatus::PreconditionFailed);
                return;
            }
            NotifyLookup::NotFound if parsed.event_key == 0 => {
                // The first notification can outrun its SUBSCRIBE
                // response. Queue on the subscribe serialization lock so
                // an in-flight subscribe finishes recording its SID,
                // then look again.
                let serial = self.inner.subscribe_serial.lock().unwrap();
                match self.inner.lookup_notify_target(&parsed.sid) {
                    NotifyLookup::Found(callback) => callback,
                    _ => {
                        drop(serial);
                        tracing::debug!(
                            sid = %parsed.sid,
                            "initial NOTIFY matches no subscription"
                        );
                        respond(NotifyStatus::PreconditionFailed);
                        return;
                    }
                }
            }
            NotifyLookup::NotFound => {
                tracing::debug!(
                    sid = %parsed.sid,
                    seq = parsed.event_key,
                    "NOTIFY for unknown subscription"
                );
                respond(NotifyStatus::PreconditionFailed);
                return;
            }
        };

        respond(NotifyStatus::Ok);
        callback(ClientEvent::Received(EventRecord {
            sid: parsed.sid,
            event_key: parsed.event_key,
            changed_variables: parsed.changed_variables,
        }));
    }
}

/// Outcome of correlating a NOTIFY SID against the handle table.
enum NotifyLookup {
    /// No client is registered at all
    NoClient,
    /// A client exists but holds no subscription with this SID
    NotFound,
    /// The subscription exists; its client's callback, cloned under lock
    Found(EventCallback),
}

impl Inner {
    /// One correlation attempt for a NOTIFY, entirely under the handle
    /// lock; only owned data leaves.
    fn lookup_notify_target(&self, sid: &str) -> NotifyLookup {
        let mut table = self.handles.lock().unwrap();
        match table.active_client() {
            None => NotifyLookup::NoClient,
            Some((_, state)) => match state.find(sid) {
                Some(_) => NotifyLookup::Found(state.callback.clone()),
                None => NotifyLookup::NotFound,
            },
        }
    }

    /// Renew under the snapshot / call / re-acquire / re-find protocol.
    ///
    /// Free-standing over `Arc<Inner>` so renewal timer jobs can run it
    /// without keeping the public client alive.
    fn renew(
        inner: &Arc<Inner>,
        handle: ClientHandle,
        sid: &str,
        timeout: Timeout,
    ) -> Result<Timeout> {
        let event_url = {
            let mut table = inner.handles.lock().unwrap();
            let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
            let sub = state.find_mut(sid).ok_or(GenaError::BadSid)?;
            if let Some(timer) = sub.renew_timer.take() {
                inner.scheduler.cancel(timer);
            }
            sub.event_url.clone()
        };

        let result = inner.transport.subscribe(&event_url, timeout, Some(sid));

        let mut table = inner.handles.lock().unwrap();
        let state = table.get_mut(handle).ok_or(GenaError::BadHandle)?;
        let grant = match result {
            Ok(grant) => grant,
            Err(error) => {
                // The publisher may already have dropped this SID.
                state.remove(sid);
                tracing::debug!(sid, %error, "renewal failed, subscription dropped");
                return Err(error);
            }
        };

        let Some(sub) = state.find_mut(sid) else {
            // A concurrent unsubscribe removed the entry while the
            // renewal was on the wire; its side effects are void.
            return Err(GenaError::BadSid);
        };
        sub.sid = grant.sid.clone();

        match Inner::schedule_auto_renew(inner, handle, &grant.sid, &event_url, grant.timeout) {
            Ok(timer) => {
                if let Some(sub) = state.find_mut(&grant.sid) {
                    sub.renew_timer = timer;
                }
                tracing::debug!(sid = %grant.sid, granted = %grant.timeout, "renewed");
                Ok(grant.timeout)
            }
            Err(error) => {
                state.remove(&grant.sid);
                Err(error)
            }
        }
    }

    /// Arm the one-shot renewal timer for a granted subscription.
    ///
    /// Infinite grants get no timer. The job owns value-copies of the
    /// handle, SID and URL; it re-correlates against the live table
    /// through `renew` when it fires.
    fn schedule_auto_renew(
        inner: &Arc<Inner>,
        handle: ClientHandle,
        sid: &str,
        event_url: &str,
        granted: Timeout,
    ) -> Result<Option<TimerId>> {
        let secs = match granted {
            Timeout::Infinite => return Ok(None),
            Timeout::Seconds(secs) => secs,
        };
        let delay = Duration::from_secs(u64::from(
            secs.saturating_sub(inner.auto_renew_margin_secs),
        ));

        let weak: Weak<Inner> = Arc::downgrade(inner);
        let sid = sid.to_string();
        let event_url = event_url.to_string();
        let timer = inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::auto_renew_fired(&inner, handle, &sid, &event_url, granted);
                }
            }),
        )?;
        Ok(Some(timer))
    }

    /// Body of a fired renewal timer.
    fn auto_renew_fired(
        inner: &Arc<Inner>,
        handle: ClientHandle,
        sid: &str,
        event_url: &str,
        granted: Timeout,
    ) {
        if inner.auto_renew_margin_secs == 0 {
            // Auto-renew disabled: report the expiry instead.
            tracing::info!(sid, "subscription expired");
            let callback = {
                let mut table = inner.handles.lock().unwrap();
                let Some(state) = table.get_mut(handle) else {
                    return;
                };
                if let Some(sub) = state.find_mut(sid) {
                    sub.renew_timer = None;
                }
                state.callback.clone()
            };
            callback(ClientEvent::SubscriptionExpired {
                sid: sid.to_string(),
                publisher_url: event_url.to_string(),
                timeout: granted,
            });
            return;
        }

        tracing::debug!(sid, "auto-renewing subscription");
        match Inner::renew(inner, handle, sid, granted) {
            Ok(_) => {}
            // The subscription was torn down between scheduling and
            // firing; nothing to report.
            Err(GenaError::BadSid) | Err(GenaError::BadHandle) => {}
            Err(error) => {
                tracing::warn!(sid, %error, "automatic renewal failed");
                let callback = {
                    let table = inner.handles.lock().unwrap();
                    let Some(state) = table.get(handle) else {
                        return;
                    };
                    state.callback.clone()
                };
                callback(ClientEvent::AutoRenewalFailed {
                    sid: sid.to_string(),
                    publisher_url: event_url.to_string(),
                    timeout: granted,
                    error,
                });
            }
        }
    }
}
