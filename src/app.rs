//! Application wiring: config discovery, resolution overlay, diagnostics
//!
//! [`App`] holds the conventional pieces an application attaches to its
//! `clap::Command`: the app name and description, optional build info, and
//! the configuration file search path. [`App::command`] decorates the
//! consumer's command and overlays the resolution chain so that an explicit
//! command-line flag beats an environment variable, which beats the first
//! matching configuration file, which beats the compiled-in default.

use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use regex::Regex;
use tracing::debug;

use crate::build_info::BuildInfo;
use crate::error::{Error, Result};
use crate::flags::FlagMap;
use crate::resolve::{first_hit, EnvResolver, FileFormat, FileResolver, Resolver};

pub(crate) const VERSION_FLAG: &str = "version";
pub(crate) const SHOW_CONFIG_FLAG: &str = "show-config";

/// Default configuration file candidates for an application name, in search
/// order: working directory, user config directory, system directory.
pub fn default_config_paths(name: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(format!("./{name}.yaml")),
        PathBuf::from(format!("~/.config/{name}/config.yaml")),
        PathBuf::from(format!("/etc/{name}/config.yaml")),
    ]
}

/// Per-path outcome of the show-configuration diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Parsed,
    NotFound,
    PermissionDenied,
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigStatus::Parsed => "parsed",
            ConfigStatus::NotFound => "not found",
            ConfigStatus::PermissionDenied => "permission denied",
        };
        f.write_str(s)
    }
}

/// Conventional behaviors attached to a clap-based application.
pub struct App {
    name: String,
    description: String,
    build_info: Option<BuildInfo>,
    config_paths: Option<Vec<PathBuf>>,
}

impl App {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> App {
        App {
            name: name.into(),
            description: description.into(),
            build_info: None,
            config_paths: None,
        }
    }

    /// Attaches build information, enabling the `--version` flag and the
    /// build-info embedding in flag maps.
    pub fn build_info(mut self, build_info: BuildInfo) -> App {
        self.build_info = Some(build_info);
        self
    }

    /// Overrides the default configuration file candidates.
    pub fn config_paths<I, P>(mut self, paths: I) -> App
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved absolute configuration file candidates.
    pub fn config_files(&self) -> Vec<PathBuf> {
        let paths = self
            .config_paths
            .clone()
            .unwrap_or_else(|| default_config_paths(&self.name));
        paths
            .iter()
            .map(|p| {
                let expanded = expand_tilde(p);
                std::path::absolute(&expanded).unwrap_or(expanded)
            })
            .collect()
    }

    /// Decorates and augments the consumer's command: sets name and
    /// description, appends the environment variable to every argument's
    /// help text, adds the built-in `--version` and `--show-config` flags,
    /// and overlays the resolution chain. The first environment or
    /// config-file hit for an argument becomes its default value, so an
    /// explicit command-line flag always wins and the compiled-in default
    /// only applies when no source resolves.
    ///
    /// Missing configuration files are skipped; malformed ones abort with
    /// the decode error.
    pub fn command(&self, cmd: Command) -> Result<Command> {
        let mut cmd = cmd.name(self.name.clone()).about(self.description.clone());
        cmd = self.add_builtin_flags(cmd);
        cmd = self.decorate_help(cmd);

        let resolvers = self.resolvers()?;
        let ids: Vec<String> = cmd
            .get_arguments()
            .map(|a| a.get_id().to_string())
            .filter(|id| !is_builtin(id))
            .collect();

        for id in ids {
            if let Some(value) = first_hit(&resolvers, &id) {
                debug!(flag = %id, %value, "overlaying resolved value as default");
                cmd = cmd.mut_arg(id, |a| a.default_value(value.to_string()));
            }
        }

        Ok(cmd)
    }

    /// Acts on the built-in flags after parsing: `--version` prints the
    /// rendered version to stdout and exits 0, `--show-config` prints the
    /// configuration file table to stderr and exits 0.
    pub fn handle_builtin_flags(&self, matches: &ArgMatches) -> Result<()> {
        if let Some(rendered) = self.render_version() {
            if matches.get_flag(VERSION_FLAG) {
                println!("{rendered}");
                process::exit(0);
            }
        }

        if matches.get_flag(SHOW_CONFIG_FLAG) {
            let mut stderr = io::stderr();
            self.write_config_report(&mut stderr)?;
            process::exit(0);
        }

        Ok(())
    }

    /// The version text for this application, when build info is attached.
    pub fn render_version(&self) -> Option<String> {
        self.build_info
            .as_ref()
            .map(|b| b.version(&self.name).to_string())
    }

    /// Reports, per configuration file candidate, whether it exists and is
    /// readable. Errors other than not-found and permission-denied
    /// propagate.
    pub fn config_report(&self) -> Result<Vec<(PathBuf, ConfigStatus)>> {
        let mut report = Vec::new();
        for path in self.config_files() {
            let status = match fs::File::open(&path) {
                Ok(_) => ConfigStatus::Parsed,
                Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigStatus::NotFound,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    ConfigStatus::PermissionDenied
                }
                Err(source) => return Err(Error::ReadConfig { path, source }),
            };
            report.push((path, status));
        }
        Ok(report)
    }

    /// Renders the config-file status table.
    pub fn write_config_report(&self, w: &mut dyn Write) -> Result<()> {
        let report = self.config_report()?;
        let width = report
            .iter()
            .map(|(p, _)| p.display().to_string().len())
            .max()
            .unwrap_or(0);

        writeln!(w, "Configuration files:")?;
        for (path, status) in &report {
            let path = path.display().to_string();
            writeln!(w, "  {path:<width$} {status}")?;
        }
        Ok(())
    }

    /// Snapshots the current flag state, wiring in this application's build
    /// info.
    pub fn flag_map(&self, cmd: &Command, matches: &ArgMatches, patterns: &[Regex]) -> FlagMap {
        FlagMap::new(cmd, matches, self.build_info.as_ref(), patterns)
    }

    fn add_builtin_flags(&self, mut cmd: Command) -> Command {
        if self.build_info.is_some() {
            cmd = cmd.arg(
                Arg::new(VERSION_FLAG)
                    .long("version")
                    .action(ArgAction::SetTrue)
                    .help("Show version information."),
            );
        }
        cmd.arg(
            Arg::new(SHOW_CONFIG_FLAG)
                .long("show-config")
                .action(ArgAction::SetTrue)
                .help("Show configuration file status."),
        )
    }

    // Built-ins are excluded from resolution, so their help must not
    // advertise an environment variable.
    fn decorate_help(&self, mut cmd: Command) -> Command {
        let args: Vec<(String, Option<String>)> = cmd
            .get_arguments()
            .filter(|a| !is_builtin(a.get_id().as_str()))
            .map(|a| (a.get_id().to_string(), a.get_help().map(|h| h.to_string())))
            .collect();

        for (id, help) in args {
            let suffix = format!("(${})", EnvResolver::var_name(&self.name, &id));
            let decorated = match help.as_deref() {
                None | Some("") => suffix,
                Some(h) if h.ends_with('.') => format!("{} {}.", &h[..h.len() - 1], suffix),
                Some(h) => format!("{h} {suffix}"),
            };
            cmd = cmd.mut_arg(id, |a| a.help(decorated));
        }
        cmd
    }

    fn resolvers(&self) -> Result<Vec<Box<dyn Resolver>>> {
        let mut resolvers: Vec<Box<dyn Resolver>> =
            vec![Box::new(EnvResolver::new(self.name.clone()))];

        for path in self.config_files() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let resolver = FileResolver::parse(FileFormat::for_path(&path), &content)
                        .map_err(|e| Error::InvalidConfig {
                            path: path.clone(),
                            message: e.to_string(),
                        })?;
                    debug!(path = %path.display(), "loaded configuration file");
                    resolvers.push(Box::new(resolver));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "configuration file not found, skipping");
                }
                Err(source) => return Err(Error::ReadConfig { path, source }),
            }
        }

        Ok(resolvers)
    }
}

fn is_builtin(id: &str) -> bool {
    id == "help" || id == VERSION_FLAG || id == SHOW_CONFIG_FLAG
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
