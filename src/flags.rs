//! Flag snapshots and redaction
//!
//! A [`FlagMap`] is a snapshot of a parse pass's resolved flag values, taken
//! fresh per logging/export call. Every transformation returns a new map; the
//! chain stays composable and side-effect-free.

use std::collections::BTreeMap;

use clap::{Arg, ArgAction, ArgMatches, Command};
use regex::Regex;

use crate::build_info::BuildInfo;
use crate::value::Value;

pub(crate) const REDACT_CHAR: char = '*';

/// A redaction-aware, orderable snapshot of flag names and values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagMap {
    values: BTreeMap<String, Value>,
    build_info: Option<BuildInfo>,
}

impl FlagMap {
    /// Snapshots every defined argument's current value and applies the
    /// given redaction patterns. When build info is supplied it is embedded
    /// (excluded from enumeration) and additionally flattened into the map
    /// under its standard sub-keys with an empty prefix.
    pub fn new(
        cmd: &Command,
        matches: &ArgMatches,
        build_info: Option<&BuildInfo>,
        patterns: &[Regex],
    ) -> FlagMap {
        let mut values = BTreeMap::new();
        for arg in cmd.get_arguments() {
            let id = arg.get_id().as_str();
            if id == "help" {
                continue;
            }
            values.insert(id.to_string(), snapshot_value(arg, matches));
        }

        let mut map = FlagMap {
            values,
            build_info: build_info.cloned(),
        }
        .redact(patterns);

        let flattened = map.build_info.as_ref().map(|b| b.as_map(""));
        if let Some(entries) = flattened {
            for (k, v) in entries {
                map.values.insert(k, Value::Str(v));
            }
        }

        map
    }

    /// Returns a new map with the given flat `key, value, key, value, ...`
    /// pairs merged in, overwriting existing keys. A dangling unpaired
    /// trailing element is dropped.
    pub fn add<S: AsRef<str>>(&self, key_vals: &[S]) -> FlagMap {
        let mut values = self.values.clone();
        for pair in key_vals.chunks_exact(2) {
            values.insert(
                pair[0].as_ref().to_string(),
                Value::Str(pair[1].as_ref().to_string()),
            );
        }
        FlagMap {
            values,
            build_info: self.build_info.clone(),
        }
    }

    /// Returns a new map with the named keys absent.
    pub fn rm<S: AsRef<str>>(&self, keys: &[S]) -> FlagMap {
        let mut values = self.values.clone();
        for key in keys {
            values.remove(key.as_ref());
        }
        FlagMap {
            values,
            build_info: self.build_info.clone(),
        }
    }

    /// Returns a new map with string values of matching keys replaced by the
    /// redaction marker repeated to the original's length. Patterns match
    /// case-insensitively against the key name, never the value; non-string
    /// values pass through untouched.
    pub fn redact(&self, patterns: &[Regex]) -> FlagMap {
        let values = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), redact_value(k, v, patterns)))
            .collect();
        FlagMap {
            values,
            build_info: self.build_info.clone(),
        }
    }

    /// Returns the entry for a key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Keys in ascending lexicographic order, excluding the reserved
    /// build-info embedding.
    pub fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Key/value pairs sorted ascending by key, suitable for structured
    /// logging. The reserved build-info embedding is excluded; its flattened
    /// `buildinfo-*` string entries are not.
    pub fn list(&self) -> Vec<(&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }

    /// The embedded build info, if any was attached at snapshot time.
    pub fn build_info(&self) -> Option<&BuildInfo> {
        self.build_info.as_ref()
    }
}

fn snapshot_value(arg: &Arg, matches: &ArgMatches) -> Value {
    let id = arg.get_id().as_str();
    match arg.get_action() {
        ArgAction::SetTrue | ArgAction::SetFalse => Value::Bool(matches.get_flag(id)),
        ArgAction::Count => Value::Int(i64::from(matches.get_count(id))),
        _ => {
            let raw = matches
                .get_raw(id)
                .map(|vals| {
                    vals.map(|v| v.to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default();
            Value::Str(raw)
        }
    }
}

fn redact_value(key: &str, value: &Value, patterns: &[Regex]) -> Value {
    let Value::Str(s) = value else {
        return value.clone();
    };

    let lowered = key.to_lowercase();
    if patterns.iter().any(|p| p.is_match(&lowered)) {
        Value::Str(REDACT_CHAR.to_string().repeat(s.chars().count()))
    } else {
        value.clone()
    }
}

/// True when the value is a string consisting solely of the redaction
/// marker. Detection is an exact-length-match heuristic: a coincidentally
/// all-marker string is indistinguishable from an actually-redacted one, and
/// the empty string counts as redacted.
pub(crate) fn is_redacted(value: &Value) -> bool {
    match value {
        Value::Str(s) => s.chars().all(|c| c == REDACT_CHAR),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlagMap {
        FlagMap::default().add(&[
            "listen", "127.0.0.1:8080", //
            "password", "hunter22", //
            "token", "abc123",
        ])
    }

    fn patterns(exprs: &[&str]) -> Vec<Regex> {
        exprs.iter().map(|e| Regex::new(e).expect("pattern")).collect()
    }

    #[test]
    fn snapshot_covers_flag_types() {
        let cmd = Command::new("t")
            .arg(Arg::new("name").long("name"))
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
            .arg(Arg::new("level").long("level").action(ArgAction::Count))
            .arg(Arg::new("unset").long("unset"));
        let matches = cmd
            .clone()
            .try_get_matches_from(["t", "--name", "alice", "--verbose", "--level", "--level"])
            .expect("parse");

        let map = FlagMap::new(&cmd, &matches, None, &[]);
        assert_eq!(map.get("name"), Some(&Value::from("alice")));
        assert_eq!(map.get("verbose"), Some(&Value::Bool(true)));
        assert_eq!(map.get("level"), Some(&Value::Int(2)));
        assert_eq!(map.get("unset"), Some(&Value::from("")));
    }

    #[test]
    fn redact_masks_matching_string_values_to_length() {
        let map = sample().redact(&patterns(&["password"]));
        assert_eq!(map.get("password"), Some(&Value::from("********")));
        assert_eq!(map.get("listen"), Some(&Value::from("127.0.0.1:8080")));
    }

    #[test]
    fn redact_matches_key_names_case_insensitively() {
        let map = FlagMap::default().add(&["API-Token", "secret"]).redact(&patterns(&["api-token"]));
        assert_eq!(map.get("API-Token"), Some(&Value::from("******")));
    }

    #[test]
    fn redact_is_idempotent() {
        let once = sample().redact(&patterns(&["password"]));
        let twice = once.redact(&patterns(&["password"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn redact_never_touches_non_string_values() {
        let cmd = Command::new("t").arg(Arg::new("secure").long("secure").action(ArgAction::SetTrue));
        let matches = cmd.clone().try_get_matches_from(["t", "--secure"]).expect("parse");
        let map = FlagMap::new(&cmd, &matches, None, &patterns(&["secure"]));
        assert_eq!(map.get("secure"), Some(&Value::Bool(true)));
    }

    #[test]
    fn add_then_rm_round_trips() {
        let original = sample();
        let round_tripped = original.add(&["extra", "value"]).rm(&["extra"]);
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn add_drops_dangling_trailing_element() {
        let map = FlagMap::default().add(&["a", "1", "dangling"]);
        assert_eq!(map.get("a"), Some(&Value::from("1")));
        assert_eq!(map.get("dangling"), None);
    }

    #[test]
    fn list_is_sorted_by_key() {
        let map = FlagMap::default().add(&["zeta", "3", "alpha", "1", "mid", "2"]);
        let keys: Vec<&str> = map.list().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn embedded_build_info_is_flattened_but_not_enumerated() {
        let b = BuildInfo::new("1.0.0")
            .with_revision("deadbeef123")
            .expect("revision");
        let cmd = Command::new("t").arg(Arg::new("listen").long("listen"));
        let matches = cmd.clone().try_get_matches_from(["t"]).expect("parse");

        let map = FlagMap::new(&cmd, &matches, Some(&b), &[]);
        assert!(map.build_info().is_some());
        assert_eq!(map.get("buildinfo-version"), Some(&Value::from("1.0.0")));
        assert_eq!(map.get("buildinfo-revision"), Some(&Value::from("deadbeef")));
        assert!(!map.keys().contains(&"buildinfo-location"));
    }

    #[test]
    fn is_redacted_uses_exact_marker_heuristic() {
        assert!(is_redacted(&Value::from("****")));
        assert!(is_redacted(&Value::from("")));
        assert!(!is_redacted(&Value::from("**x*")));
        assert!(!is_redacted(&Value::Bool(true)));
    }
}
