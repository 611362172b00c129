//! Value resolvers and the precedence chain
//!
//! A resolver maps a flag's logical name to an optional raw value from one
//! configuration source. Resolvers never fail at lookup time: an absent value
//! is a soft miss that defers to the next-lower-precedence source.

pub mod env;
pub mod file;

pub use env::EnvResolver;
pub use file::{FileFormat, FileResolver};

use crate::value::Value;

/// A single configuration source.
pub trait Resolver {
    /// Looks up the flag's logical name. `None` means "defer to the next
    /// source", never an error.
    fn resolve(&self, flag: &str) -> Option<Value>;
}

/// Consults resolvers in precedence order and returns the first hit.
pub fn first_hit(resolvers: &[Box<dyn Resolver>], flag: &str) -> Option<Value> {
    resolvers.iter().find_map(|r| r.resolve(flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<Value>);

    impl Resolver for Fixed {
        fn resolve(&self, _flag: &str) -> Option<Value> {
            self.0.clone()
        }
    }

    #[test]
    fn first_hit_stops_at_first_resolving_source() {
        let resolvers: Vec<Box<dyn Resolver>> = vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(Value::from("second")))),
            Box::new(Fixed(Some(Value::from("third")))),
        ];
        assert_eq!(first_hit(&resolvers, "any"), Some(Value::from("second")));
    }

    #[test]
    fn first_hit_misses_when_no_source_resolves() {
        let resolvers: Vec<Box<dyn Resolver>> = vec![Box::new(Fixed(None))];
        assert_eq!(first_hit(&resolvers, "any"), None);
    }
}
