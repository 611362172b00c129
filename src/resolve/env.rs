//! Environment variable resolver

use std::collections::HashSet;
use std::env;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::resolve::Resolver;
use crate::value::Value;

/// Flag names that are never resolved from the environment, to avoid
/// surprising overrides of built-in flags.
static DEFAULT_IGNORED: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["help", "env-help"].into_iter().collect());

/// Resolves flag values from environment variables.
///
/// The variable name is `<PROGRAM>_<FLAG>` with the program name uppercased
/// and hyphens in the flag name replaced by underscores before uppercasing.
/// An empty program name omits the prefix entirely.
pub struct EnvResolver {
    program: String,
    ignored: HashSet<String>,
}

impl EnvResolver {
    /// Creates a resolver with the default ignore set (`help`, `env-help`).
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_ignored(program, DEFAULT_IGNORED.iter().copied())
    }

    /// Creates a resolver with an explicit ignore set.
    pub fn with_ignored<I, S>(program: impl Into<String>, ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the environment variable name for a flag. Hyphens are
    /// replaced with underscores in the flag name only; the program prefix
    /// is uppercased as-is.
    pub fn var_name(program: &str, flag: &str) -> String {
        let mut name = String::new();
        if !program.is_empty() {
            name.push_str(program);
            name.push('_');
        }
        name.push_str(&flag.replace('-', "_"));
        name.to_uppercase()
    }
}

impl Resolver for EnvResolver {
    fn resolve(&self, flag: &str) -> Option<Value> {
        if self.ignored.contains(flag) {
            return None;
        }

        let name = Self::var_name(&self.program, flag);
        let raw = env::var(&name).ok()?;
        debug!(flag, variable = %name, "resolved flag from environment");
        Some(Value::Str(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_name_uppercases_and_replaces_hyphens() {
        assert_eq!(EnvResolver::var_name("test", "from-flag"), "TEST_FROM_FLAG");
        assert_eq!(EnvResolver::var_name("app", "listen"), "APP_LISTEN");
    }

    #[test]
    fn var_name_keeps_hyphens_in_program_prefix() {
        assert_eq!(EnvResolver::var_name("my-app", "listen"), "MY-APP_LISTEN");
        assert_eq!(EnvResolver::var_name("my-app", "from-flag"), "MY-APP_FROM_FLAG");
    }

    #[test]
    fn var_name_omits_prefix_for_empty_program() {
        assert_eq!(EnvResolver::var_name("", "from-flag"), "FROM_FLAG");
    }

    #[test]
    fn resolves_set_variable() {
        env::set_var("ENVRES_SOME_FLAG", "from-env");
        let r = EnvResolver::new("envres");
        assert_eq!(r.resolve("some-flag"), Some(Value::from("from-env")));
        env::remove_var("ENVRES_SOME_FLAG");
    }

    #[test]
    fn unset_variable_is_a_soft_miss() {
        let r = EnvResolver::new("envres");
        assert_eq!(r.resolve("never-set-flag"), None);
    }

    #[test]
    fn ignored_flags_are_never_resolved() {
        env::set_var("ENVIGN_HELP", "yes");
        env::set_var("ENVIGN_ENV_HELP", "yes");
        let r = EnvResolver::new("envign");
        assert_eq!(r.resolve("help"), None);
        assert_eq!(r.resolve("env-help"), None);
        env::remove_var("ENVIGN_HELP");
        env::remove_var("ENVIGN_ENV_HELP");
    }

    #[test]
    fn custom_ignore_set_replaces_default() {
        env::set_var("ENVCUS_HELP", "yes");
        let r = EnvResolver::with_ignored("envcus", ["other"]);
        assert_eq!(r.resolve("help"), Some(Value::from("yes")));
        env::remove_var("ENVCUS_HELP");
    }
}
