//! The GENA `TIMEOUT` header value.
//!
//! Subscriptions carry a duration in the `TIMEOUT: Second-<N>` header,
//! where `<N>` is a number of seconds or the literal `infinite`.

use std::fmt;

use crate::error::TransportError;

/// A subscription duration as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// A finite duration in seconds
    Seconds(u32),
    /// The subscription never expires on its own
    Infinite,
}

impl Timeout {
    /// Build a timeout from a signed second count.
    ///
    /// Negative values select `Infinite`, matching the classic UPnP
    /// client convention where a caller passes -1 to request an
    /// unbounded subscription.
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Timeout::Infinite
        } else {
            Timeout::Seconds(secs.min(u32::MAX as i64) as u32)
        }
    }

    /// Parse a `TIMEOUT` header value such as `Second-1800`.
    ///
    /// The `Second-` prefix and the `infinite` literal are matched
    /// case-insensitively; publishers are not consistent about casing.
    pub fn parse_header(value: &str) -> Result<Self, TransportError> {
        let value = value.trim();
        let rest = value
            .get(.."Second-".len())
            .filter(|p| p.eq_ignore_ascii_case("Second-"))
            .map(|_| &value["Second-".len()..])
            .ok_or_else(|| {
                TransportError::BadResponse(format!("unrecognized TIMEOUT value: {value:?}"))
            })?;

        if rest.eq_ignore_ascii_case("infinite") {
            return Ok(Timeout::Infinite);
        }
        rest.parse::<u32>().map(Timeout::Seconds).map_err(|_| {
            TransportError::BadResponse(format!("unrecognized TIMEOUT value: {value:?}"))
        })
    }

    /// Raise a finite value below `min_secs` up to `min_secs`.
    ///
    /// `Infinite` is left alone. Publishers are allowed to grant less
    /// than requested, but a control point must not ask for less than
    /// the UPnP minimum.
    pub fn with_floor(self, min_secs: u32) -> Self {
        match self {
            Timeout::Seconds(n) if n < min_secs => Timeout::Seconds(min_secs),
            other => other,
        }
    }

    /// The finite second count, if any.
    pub fn as_secs(self) -> Option<u32> {
        match self {
            Timeout::Seconds(n) => Some(n),
            Timeout::Infinite => None,
        }
    }

    /// Whether this timeout ever elapses.
    pub fn is_finite(self) -> bool {
        matches!(self, Timeout::Seconds(_))
    }
}

impl fmt::Display for Timeout {
    /// Canonical header form: `Second-1800` or `Second-infinite`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Seconds(n) => write!(f, "Second-{n}"),
            Timeout::Infinite => write!(f, "Second-infinite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_finite_seconds() {
        assert_eq!(
            Timeout::parse_header("Second-1800").unwrap(),
            Timeout::Seconds(1800)
        );
    }

    #[test]
    fn parse_infinite() {
        assert_eq!(
            Timeout::parse_header("Second-infinite").unwrap(),
            Timeout::Infinite
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            Timeout::parse_header("second-300").unwrap(),
            Timeout::Seconds(300)
        );
        assert_eq!(
            Timeout::parse_header("SECOND-INFINITE").unwrap(),
            Timeout::Infinite
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timeout::parse_header("1800").is_err());
        assert!(Timeout::parse_header("Second-").is_err());
        assert!(Timeout::parse_header("Second--5").is_err());
        assert!(Timeout::parse_header("Second-12x").is_err());
        assert!(Timeout::parse_header("").is_err());
    }

    #[test]
    fn display_round_trips() {
        for t in [Timeout::Seconds(0), Timeout::Seconds(1800), Timeout::Infinite] {
            assert_eq!(Timeout::parse_header(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn negative_seconds_select_infinite() {
        assert_eq!(Timeout::from_secs(-1), Timeout::Infinite);
        assert_eq!(Timeout::from_secs(1800), Timeout::Seconds(1800));
    }

    #[test]
    fn floor_raises_small_values_only() {
        assert_eq!(
            Timeout::Seconds(60).with_floor(1800),
            Timeout::Seconds(1800)
        );
        assert_eq!(
            Timeout::Seconds(3600).with_floor(1800),
            Timeout::Seconds(3600)
        );
        assert_eq!(Timeout::Infinite.with_floor(1800), Timeout::Infinite);
    }
}
