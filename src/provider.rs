//! Injected time and identity sources.
//!
//! Export output depends on "now" (the `dcterms:modified` stamp) and on a
//! freshly generated book identifier. Both come from these traits so tests
//! and callers can pin them.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Parse an RFC 3339 timestamp, e.g. `2025-05-21T13:01:49Z`.
    pub fn parse(rfc3339: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|t| FixedClock(t.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of new unique book identifiers.
pub trait IdentifierSource: Send + Sync {
    fn new_identifier(&self) -> String;
}

/// Random `urn:uuid:` identifiers (UUID v4).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdentifierSource for UuidSource {
    fn new_identifier(&self) -> String {
        format!("urn:uuid:{}", Uuid::new_v4())
    }
}

/// Always hands out the same identifier.
#[derive(Debug, Clone)]
pub struct FixedIdentifier(pub String);

impl IdentifierSource for FixedIdentifier {
    fn new_identifier(&self) -> String {
        self.0.clone()
    }
}

/// Format a timestamp the way `dcterms:modified` requires (`CCYY-MM-DDThh:mm:ssZ`).
pub fn modified_stamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
