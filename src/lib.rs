//! flagstone: conventional behaviors for clap-based CLIs
//!
//! This crate augments a [`clap`] command with the behaviors most services
//! wire up by hand:
//!
//! - **Layered resolution** — an explicit command-line flag beats an
//!   environment variable (`<APP>_<FLAG>`), which beats the first matching
//!   YAML/TOML configuration file, which beats the compiled-in default.
//! - **Redaction** — flag snapshots for structured logging mask sensitive
//!   string values by name pattern, irreversibly.
//! - **Metrics** — surviving flag/value pairs and build info export as
//!   constant-value Prometheus gauges.
//! - **Diagnostics** — built-in `--version` and `--show-config` flags that
//!   print and exit.
//!
//! ```no_run
//! use clap::{Arg, Command};
//! use flagstone::{App, BuildInfo};
//!
//! fn main() -> flagstone::Result<()> {
//!     let build = BuildInfo::new("1.0.0")
//!         .with_revision("1234567890ab")?
//!         .with_date_str("2020-09-22T11:11:10+02:00")?;
//!
//!     let app = App::new("demo", "A demo application.").build_info(build);
//!     let cmd = app.command(
//!         Command::new("demo")
//!             .arg(Arg::new("listen").long("listen").help("Listen address."))
//!             .arg(Arg::new("password").long("password").help("Upstream password.")),
//!     )?;
//!
//!     let matches = cmd.clone().get_matches();
//!     app.handle_builtin_flags(&matches)?;
//!
//!     let redact = regex::Regex::new("password").expect("pattern");
//!     let flags = app.flag_map(&cmd, &matches, &[redact]);
//!     for (name, value) in flags.list() {
//!         tracing::info!(name, %value, "flag");
//!     }
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod build_info;
pub mod error;
pub mod flags;
mod metrics;
pub mod resolve;
pub mod value;

pub use app::{default_config_paths, App, ConfigStatus};
pub use build_info::{BuildInfo, Version};
pub use error::{Error, Result};
pub use flags::FlagMap;
pub use resolve::{EnvResolver, FileFormat, FileResolver, Resolver};
pub use value::Value;
