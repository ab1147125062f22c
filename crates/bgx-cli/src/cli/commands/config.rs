//! `bgx config` – show the config path and effective settings.

use anyhow::{Context, Result};
use bgx_core::config;

pub fn run_config() -> Result<()> {
    let path = config::config_path()?;
    let cfg = config::load_or_init()?;
    let rendered = toml::to_string_pretty(&cfg).context("rendering config")?;
    println!("# {}", path.display());
    print!("{rendered}");
    Ok(())
}
