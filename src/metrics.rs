//! Prometheus export of flags and build info

use prometheus::{Gauge, Opts, Registry};

use crate::build_info::BuildInfo;
use crate::error::Result;
use crate::flags::{is_redacted, FlagMap};

const FLAG_METRIC: &str = "flag";
const FLAG_HELP: &str = "A metric with a constant '1' value labeled by program, flag name and value";
const BUILD_INFO_METRIC: &str = "build_info";
const BUILD_INFO_HELP: &str =
    "A metric with a constant '1' value labeled by program, version, rust, date and revision";

impl FlagMap {
    /// Registers one constant-value gauge per surviving flag/value pair,
    /// skipping entries currently in redacted form and the derived
    /// `buildinfo-*` sub-keys. An embedded build info registers one
    /// additional `build_info` gauge.
    ///
    /// Registration conflicts (duplicate metrics) propagate as errors and
    /// must not be ignored.
    pub fn register(&self, program: &str, registry: &Registry) -> Result<()> {
        if let Some(build_info) = self.build_info() {
            register_build_info(build_info, program, registry)?;
        }

        for (name, value) in self.list() {
            if is_redacted(value) || name.starts_with("buildinfo-") {
                continue;
            }

            let gauge = Gauge::with_opts(
                Opts::new(FLAG_METRIC, FLAG_HELP)
                    .const_label("program", program)
                    .const_label("name", name)
                    .const_label("value", value.to_string()),
            )?;
            gauge.set(1.0);
            registry.register(Box::new(gauge))?;
        }

        Ok(())
    }
}

fn register_build_info(build_info: &BuildInfo, program: &str, registry: &Registry) -> Result<()> {
    let gauge = Gauge::with_opts(
        Opts::new(BUILD_INFO_METRIC, BUILD_INFO_HELP)
            .const_label("program", program)
            .const_label("version", build_info.version_str())
            .const_label("rust", build_info.rust_version())
            .const_label("date", build_info.date_rfc3339())
            .const_label("revision", build_info.revision()),
    )?;
    gauge.set(1.0);
    registry.register(Box::new(gauge))?;
    Ok(())
}
