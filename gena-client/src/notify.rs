//! Validation of inbound NOTIFY transactions.
//!
//! The HTTP server owning the callback socket hands each NOTIFY over as
//! a [`NotifyRequest`]; this module runs the header checks and body
//! parse and produces either the parsed notification or the status the
//! server must answer with. Correlation against the subscription table
//! happens in the manager, not here.

use crate::propset::PropertySet;

/// An inbound NOTIFY transaction: headers plus body.
///
/// Header lookup is case-insensitive, as header names on the wire are.
#[derive(Debug, Clone, Default)]
pub struct NotifyRequest {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl NotifyRequest {
    /// Build a request from header pairs and a body.
    pub fn new<I, N, V>(headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            body,
        }
    }

    /// First header value with the given name, compared without case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// HTTP status answered on a NOTIFY transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    /// The notification was accepted
    Ok,
    /// A required header was missing or malformed, or the body was not
    /// a parseable XML property set
    BadRequest,
    /// The notification does not match a known, eventable subscription
    PreconditionFailed,
}

impl NotifyStatus {
    /// The numeric HTTP status code.
    pub fn code(self) -> u16 {
        match self {
            NotifyStatus::Ok => 200,
            NotifyStatus::BadRequest => 400,
            NotifyStatus::PreconditionFailed => 412,
        }
    }
}

/// A NOTIFY that passed validation and parsing.
#[derive(Debug, Clone)]
pub(crate) struct ParsedNotify {
    pub sid: String,
    pub event_key: u32,
    pub changed_variables: PropertySet,
}

/// Run the validation pipeline; first failure wins.
pub(crate) fn parse_notify(request: &NotifyRequest) -> Result<ParsedNotify, NotifyStatus> {
    let sid = match request.header("SID") {
        Some(sid) => sid.to_string(),
        None => {
            tracing::debug!("NOTIFY without SID");
            return Err(NotifyStatus::PreconditionFailed);
        }
    };

    let event_key = request
        .header("SEQ")
        .and_then(|seq| seq.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            tracing::debug!("NOTIFY without usable SEQ");
            NotifyStatus::BadRequest
        })?;

    let (nt, nts) = match (request.header("NT"), request.header("NTS")) {
        (Some(nt), Some(nts)) => (nt, nts),
        _ => {
            tracing::debug!("NOTIFY without NT/NTS");
            return Err(NotifyStatus::BadRequest);
        }
    };
    if nt != "upnp:event" || nts != "upnp:propchange" {
        tracing::debug!(nt, nts, "NOTIFY with wrong NT/NTS");
        return Err(NotifyStatus::PreconditionFailed);
    }

    let is_xml = request
        .header("CONTENT-TYPE")
        .is_some_and(is_xml_media_type);
    if !is_xml || request.body().is_empty() {
        tracing::debug!("NOTIFY body empty or not XML");
        return Err(NotifyStatus::BadRequest);
    }

    let changed_variables = PropertySet::parse(request.body()).map_err(|e| {
        tracing::debug!(error = %e, "NOTIFY body failed to parse");
        NotifyStatus::BadRequest
    })?;

    Ok(ParsedNotify {
        sid,
        event_key,
        changed_variables,
    })
}

/// Whether a `Content-Type` value names an XML payload.
///
/// Accepts `text/xml`, `application/xml` and any `+xml` suffix type;
/// parameters such as `charset` are ignored.
fn is_xml_media_type(value: &str) -> bool {
    let media_type = value.split(';').next().unwrap_or("").trim();
    media_type.eq_ignore_ascii_case("text/xml")
        || media_type.eq_ignore_ascii_case("application/xml")
        || media_type
            .rsplit('+')
            .next()
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case("xml") && media_type.contains('/'))
}
