//! Config CLI command.

use crate::config::BundleConfig;
use std::io::{self, Write};

/// Config command handler.
pub struct ConfigCommand;

impl ConfigCommand {
    /// Creates a new config command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Writes the configuration when `show` is set, or a usage hint.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn run<W: Write>(
        &self,
        config: &BundleConfig,
        show: bool,
        writer: &mut W,
    ) -> io::Result<()> {
        if show {
            write_config(writer, config)
        } else {
            writeln!(writer, "Use --show to display current configuration")
        }
    }
}

impl Default for ConfigCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the resolved configuration as TOML.
///
/// The output is itself a valid config file.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized or writing
/// fails.
pub fn write_config<W: Write>(writer: &mut W, config: &BundleConfig) -> io::Result<()> {
    let rendered = toml::to_string_pretty(config).map_err(io::Error::other)?;
    writeln!(writer, "# Current configuration")?;
    write!(writer, "{rendered}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_config_round_trips() {
        let config = BundleConfig::new().with_staging_dir("/tmp/stage");
        let mut out = Vec::new();
        write_config(&mut out, &config).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("# Current configuration"));
        assert!(out.contains("/tmp/stage"));
        assert!(!out.contains("file ="));

        let reloaded = BundleConfig::from_toml(&out).unwrap();
        assert_eq!(reloaded.staging_dir, config.staging_dir);
        assert_eq!(reloaded.extraction_dir, config.extraction_dir);
        assert_eq!(reloaded.naming, config.naming);
        assert_eq!(reloaded.logging, config.logging);
    }

    #[test]
    fn test_run_without_show() {
        let mut out = Vec::new();
        ConfigCommand::new()
            .run(&BundleConfig::new(), false, &mut out)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("--show"));
    }
}
