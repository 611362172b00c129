//! Build metadata: version, revision, build date, toolchain
//!
//! A [`BuildInfo`] is constructed once at process start and is read-only
//! thereafter. The values are typically injected by the release pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

const MAP_VERSION: &str = "buildinfo-version";
const MAP_DATE: &str = "buildinfo-date";
const MAP_RUST: &str = "buildinfo-rust";
const MAP_REVISION: &str = "buildinfo-revision";
const MAP_LOCATION: &str = "buildinfo-location";

/// Immutable build information.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
    version: String,
    revision: String,
    rust_version: String,
    timezone: Tz,
    date: DateTime<Utc>,
}

impl BuildInfo {
    /// Starts from the given version, the sentinel build date, UTC, and the
    /// toolchain this crate was compiled with. Refine with the fallible
    /// `with_*` setters; later setters override earlier ones.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            revision: String::new(),
            rust_version: toolchain_version().to_string(),
            timezone: Tz::UTC,
            date: sentinel_date(),
        }
    }

    /// Sets the commit revision. The revision must be at least 8 characters
    /// long; only the first 8 are retained (short-hash convention).
    pub fn with_revision(mut self, revision: &str) -> Result<Self> {
        if revision.chars().count() < 8 {
            return Err(Error::RevisionTooShort);
        }
        self.revision = revision.chars().take(8).collect();
        Ok(self)
    }

    /// Sets the build date from a strict RFC3339 string.
    pub fn with_date_str(mut self, date: &str) -> Result<Self> {
        self.date = DateTime::parse_from_rfc3339(date)?.with_timezone(&Utc);
        Ok(self)
    }

    /// Sets the build date directly.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Sets the timezone the build date is rendered in, by IANA name.
    pub fn with_timezone(mut self, name: &str) -> Result<Self> {
        self.timezone = name
            .parse()
            .map_err(|_| Error::UnknownTimezone(name.to_string()))?;
        Ok(self)
    }

    pub fn version_str(&self) -> &str {
        &self.version
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn rust_version(&self) -> &str {
        &self.rust_version
    }

    /// The build date rendered as RFC3339 in the configured timezone.
    pub fn date_rfc3339(&self) -> String {
        self.date.with_timezone(&self.timezone).to_rfc3339()
    }

    /// Projects into the [`Version`] view for the given program name.
    pub fn version(&self, program: &str) -> Version {
        Version {
            program: program.to_string(),
            version: self.version.clone(),
            revision: self.revision.clone(),
            date: self.date_rfc3339(),
            rust_version: self.rust_version.clone(),
        }
    }

    /// Serializes into a flat string map under the given key prefix, for
    /// propagation. The timezone location is only included for non-empty
    /// prefixes.
    pub fn as_map(&self, prefix: &str) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert(format!("{prefix}{MAP_VERSION}"), self.version.clone());
        m.insert(format!("{prefix}{MAP_DATE}"), self.date_rfc3339());
        m.insert(format!("{prefix}{MAP_RUST}"), self.rust_version.clone());
        m.insert(format!("{prefix}{MAP_REVISION}"), self.revision.clone());
        if !prefix.is_empty() {
            m.insert(
                format!("{prefix}{MAP_LOCATION}"),
                self.timezone.name().to_string(),
            );
        }
        m
    }

    /// Reconstructs build information from a map written by [`as_map`].
    ///
    /// Returns `None` when the version key is absent (no build info was
    /// attached). A malformed date or location is tolerated best-effort as
    /// the Unix epoch / UTC, since the map may come from a build that never
    /// carried them.
    ///
    /// [`as_map`]: BuildInfo::as_map
    pub fn from_map(prefix: &str, m: &BTreeMap<String, String>) -> Option<BuildInfo> {
        let version = m.get(&format!("{prefix}{MAP_VERSION}"))?.clone();

        let date = match m.get(&format!("{prefix}{MAP_DATE}")) {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(d) => d.with_timezone(&Utc),
                Err(err) => {
                    warn!(%raw, %err, "malformed build date in map, using epoch");
                    DateTime::UNIX_EPOCH
                }
            },
            None => DateTime::UNIX_EPOCH,
        };

        let timezone = match m.get(&format!("{prefix}{MAP_LOCATION}")) {
            Some(raw) => match raw.parse() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(%raw, "unknown timezone in map, using UTC");
                    Tz::UTC
                }
            },
            None => Tz::UTC,
        };

        Some(BuildInfo {
            version,
            revision: m
                .get(&format!("{prefix}{MAP_REVISION}"))
                .cloned()
                .unwrap_or_default(),
            rust_version: m
                .get(&format!("{prefix}{MAP_RUST}"))
                .cloned()
                .unwrap_or_default(),
            timezone,
            date,
        })
    }
}

/// Read-only projection of [`BuildInfo`] plus a target program name.
#[derive(Debug, Clone, Serialize)]
pub struct Version {
    pub program: String,
    pub version: String,
    pub revision: String,
    pub date: String,
    pub rust_version: String,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, version {} (revision: {})\n  build date:       {}\n  rust version:     {}",
            self.program, self.version, self.revision, self.date, self.rust_version
        )
    }
}

fn toolchain_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or(env!("CARGO_PKG_RUST_VERSION"))
}

fn sentinel_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1977, 5, 25, 0, 0, 0)
        .single()
        .expect("valid sentinel build date")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> BuildInfo {
        BuildInfo::new("1.0.0")
            .with_revision("123456789")
            .expect("revision")
            .with_date_str("2020-09-22T11:11:10+02:00")
            .expect("date")
    }

    #[test]
    fn revision_shorter_than_8_chars_fails() {
        assert!(matches!(
            BuildInfo::new("1.0.0").with_revision("1234567"),
            Err(Error::RevisionTooShort)
        ));
    }

    #[test]
    fn revision_is_truncated_to_8_chars() {
        assert_eq!(build().revision(), "12345678");
    }

    #[test]
    fn malformed_date_fails_construction() {
        assert!(BuildInfo::new("1.0.0").with_date_str("not-a-date").is_err());
    }

    #[test]
    fn unknown_timezone_fails_construction() {
        assert!(matches!(
            BuildInfo::new("1.0.0").with_timezone("Mars/Olympus"),
            Err(Error::UnknownTimezone(_))
        ));
    }

    #[test]
    fn version_renders_fixed_template() {
        let b = build().with_timezone("Europe/Zurich").expect("timezone");
        let rendered = b.version("test").to_string();
        let expected = format!(
            "test, version 1.0.0 (revision: 12345678)\n  \
             build date:       2020-09-22T11:11:10+02:00\n  \
             rust version:     {}",
            b.rust_version()
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn date_renders_in_configured_timezone() {
        let b = build().with_timezone("Europe/Zurich").expect("timezone");
        assert_eq!(b.date_rfc3339(), "2020-09-22T11:11:10+02:00");

        let utc = build();
        assert_eq!(utc.date_rfc3339(), "2020-09-22T09:11:10+00:00");
    }

    #[test]
    fn later_setters_override_earlier_ones() {
        let b = BuildInfo::new("1.0.0")
            .with_date_str("2020-01-01T00:00:00Z")
            .expect("first date")
            .with_date_str("2021-01-01T00:00:00Z")
            .expect("second date");
        assert_eq!(b.date_rfc3339(), "2021-01-01T00:00:00+00:00");
    }

    #[test]
    fn as_map_includes_location_only_with_prefix() {
        let b = build().with_timezone("Europe/Zurich").expect("timezone");

        let prefixed = b.as_map("app_");
        assert_eq!(prefixed.get("app_buildinfo-version").map(String::as_str), Some("1.0.0"));
        assert_eq!(
            prefixed.get("app_buildinfo-location").map(String::as_str),
            Some("Europe/Zurich")
        );

        let bare = b.as_map("");
        assert_eq!(bare.get("buildinfo-revision").map(String::as_str), Some("12345678"));
        assert!(!bare.contains_key("buildinfo-location"));
    }

    #[test]
    fn from_map_round_trips() {
        let b = build().with_timezone("Europe/Zurich").expect("timezone");
        let restored = BuildInfo::from_map("app_", &b.as_map("app_")).expect("restored");
        assert_eq!(restored, b);
    }

    #[test]
    fn from_map_without_version_key_is_absent() {
        assert!(BuildInfo::from_map("", &BTreeMap::new()).is_none());
    }

    #[test]
    fn from_map_tolerates_malformed_date_and_location() {
        let mut m = BTreeMap::new();
        m.insert("buildinfo-version".to_string(), "1.0.0".to_string());
        m.insert("buildinfo-date".to_string(), "garbage".to_string());
        m.insert("buildinfo-location".to_string(), "Nowhere/At-All".to_string());

        let restored = BuildInfo::from_map("", &m).expect("restored");
        assert_eq!(restored.version_str(), "1.0.0");
        assert_eq!(restored.date_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
