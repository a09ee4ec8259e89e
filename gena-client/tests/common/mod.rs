//! Shared helpers: a scriptable transport stub and an event collector.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gena_client::{
    ClientEvent, EventCallback, GenaClient, GenaError, NotifyRequest, Result, SubscribeTransport,
    SubscriptionGrant, Timeout,
};

/// One recorded SUBSCRIBE call: url, requested timeout, renewal SID.
pub type SubscribeCall = (String, Timeout, Option<String>);

/// A transport whose answers are scripted by the test.
///
/// Each SUBSCRIBE pops the next scripted response; an exhausted script
/// fails the call. UNSUBSCRIBEs always succeed unless told otherwise,
/// and every call is recorded for assertions.
pub struct StubTransport {
    responses: Mutex<VecDeque<Result<SubscriptionGrant>>>,
    subscribe_delay: Duration,
    fail_unsubscribe: bool,
    pub subscribe_calls: Mutex<Vec<SubscribeCall>>,
    pub unsubscribe_calls: Mutex<Vec<(String, String)>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    /// A stub whose SUBSCRIBE blocks for `delay` before answering,
    /// imitating a slow publisher.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            subscribe_delay: delay,
            fail_unsubscribe: false,
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_unsubscribe() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            subscribe_delay: Duration::ZERO,
            fail_unsubscribe: true,
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
        })
    }

    /// Script a successful grant.
    pub fn push_grant(&self, sid: &str, timeout: Timeout) {
        self.responses.lock().unwrap().push_back(Ok(SubscriptionGrant {
            sid: sid.to_string(),
            timeout,
        }));
    }

    /// Script a failure.
    pub fn push_error(&self, error: GenaError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }
}

impl SubscribeTransport for StubTransport {
    fn subscribe(
        &self,
        event_url: &str,
        timeout: Timeout,
        renewal_sid: Option<&str>,
    ) -> Result<SubscriptionGrant> {
        // Record before any delay so tests can observe an in-flight call.
        self.subscribe_calls.lock().unwrap().push((
            event_url.to_string(),
            timeout,
            renewal_sid.map(str::to_string),
        ));
        if !self.subscribe_delay.is_zero() {
            std::thread::sleep(self.subscribe_delay);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenaError::SocketConnect("stub script exhausted".into())))
    }

    fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<()> {
        self.unsubscribe_calls
            .lock()
            .unwrap()
            .push((event_url.to_string(), sid.to_string()));
        if self.fail_unsubscribe {
            Err(GenaError::UnsubscribeUnaccepted(500))
        } else {
            Ok(())
        }
    }
}

/// Collects every upcall a client delivers.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> EventCallback {
        let events = Arc::clone(&self.events);
        Arc::new(move |event| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Poll until `predicate` matches some recorded event or `timeout`
    /// elapses; true when a match was seen.
    pub fn wait_for<P>(&self, timeout: Duration, predicate: P) -> bool
    where
        P: Fn(&ClientEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if self.events.lock().unwrap().iter().any(&predicate) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Run one NOTIFY through the client and return the HTTP status sent.
pub fn dispatch(client: &GenaClient, request: &NotifyRequest) -> u16 {
    let mut status = None;
    client.dispatch_notify(request, |s| status = Some(s.code()));
    status.expect("dispatch_notify must answer the transaction")
}

pub const PROPSET_FOO: &str = "<e:propertyset xmlns:e=\"urn:schemas-upnp-org:event-1-0\">\
                               <e:property><Foo>1</Foo></e:property></e:propertyset>";

/// A well-formed NOTIFY for `sid` with the given sequence number.
pub fn notify_request(sid: &str, seq: u32) -> NotifyRequest {
    let seq = seq.to_string();
    NotifyRequest::new(
        [
            ("SID", sid),
            ("SEQ", seq.as_str()),
            ("NT", "upnp:event"),
            ("NTS", "upnp:propchange"),
            ("CONTENT-TYPE", "text/xml; charset=\"utf-8\""),
        ],
        PROPSET_FOO.as_bytes().to_vec(),
    )
}
