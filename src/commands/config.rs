//! Config command handler.
//!
//! Contains the implementation of the `config` CLI command.

#![allow(clippy::print_stdout)]

use heritage_kg::config::HeritageConfig;

/// Config command.
///
/// `--show` prints the effective configuration (file, then environment
/// overrides) as TOML. Secrets are redacted.
pub fn cmd_config(config: &HeritageConfig, show: bool) -> anyhow::Result<()> {
    if show {
        println!("# Effective configuration");
        println!();
        print!("{}", config.to_toml()?);
    } else {
        println!("Use --show to display the effective configuration");
    }
    Ok(())
}
