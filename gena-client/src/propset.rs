//! UPnP property-set documents.
//!
//! A NOTIFY body is an XML document of the shape
//!
//! ```xml
//! <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
//!   <e:property><Variable>value</Variable></e:property>
//! </e:propertyset>
//! ```
//!
//! The parser is a streaming walk over the events: any element whose
//! immediate parent is named `property` (compared without case, with
//! namespace prefixes ignored) contributes one variable. Variable names
//! keep their original case; character data is concatenated across text
//! events and trimmed; duplicate names overwrite.

use std::collections::HashMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::GenaError;

const PROPERTYSET_NS: &str = "urn:schemas-upnp-org:event-1-0";

/// The changed variables carried by one notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    variables: HashMap<String, String>,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a property-set document.
    pub fn parse(body: &[u8]) -> Result<Self, GenaError> {
        let mut reader = Reader::from_reader(body);
        let mut set = PropertySet::new();

        // Open-element path and the character data accumulated since the
        // last close, mirroring a classic SAX propertyset walk.
        let mut path: Vec<String> = Vec::new();
        let mut chardata = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    path.push(local_name(e.local_name().as_ref())?);
                }
                Ok(Event::End(_)) => {
                    let name = path
                        .pop()
                        .ok_or_else(|| GenaError::ParseFailed("unbalanced end tag".to_string()))?;
                    if parent_is_property(&path) {
                        set.insert(name, chardata.trim().to_string());
                    }
                    chardata.clear();
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(e.local_name().as_ref())?;
                    if path.last().is_some_and(|p| p.eq_ignore_ascii_case("property")) {
                        set.insert(name, chardata.trim().to_string());
                    }
                    chardata.clear();
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| GenaError::ParseFailed(e.to_string()))?;
                    chardata.push_str(&text);
                }
                Ok(Event::CData(c)) => {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| GenaError::ParseFailed(e.to_string()))?;
                    chardata.push_str(text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(GenaError::ParseFailed(e.to_string())),
            }
            buf.clear();
        }

        if !path.is_empty() {
            return Err(GenaError::ParseFailed("unterminated document".to_string()));
        }
        Ok(set)
    }

    /// Record a variable; an existing value under the same name is
    /// replaced.
    pub fn insert<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.variables.insert(name.into(), value.into());
    }

    /// The value of a variable, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Number of distinct variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the set carries no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Emit a canonical property-set document for these variables.
    pub fn to_xml(&self) -> String {
        let mut out = format!("<e:propertyset xmlns:e=\"{PROPERTYSET_NS}\">");
        for (name, value) in &self.variables {
            out.push_str("<e:property><");
            out.push_str(name);
            out.push('>');
            out.push_str(&escape(value));
            out.push_str("</");
            out.push_str(name);
            out.push_str("></e:property>");
        }
        out.push_str("</e:propertyset>");
        out
    }
}

impl FromIterator<(String, String)> for PropertySet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

/// A tag's local name, prefix stripped, original case kept.
fn local_name(raw: &[u8]) -> Result<String, GenaError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| GenaError::ParseFailed(e.to_string()))
}

fn parent_is_property(path: &[String]) -> bool {
    path.last().is_some_and(|p| p.eq_ignore_ascii_case("property"))
}
