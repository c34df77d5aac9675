use std::path::PathBuf;

use clap::Args;
use log::info;

use crate::{
    types::Result,
    OptProcess,
    Settings,
};


#[derive(Debug, Args)]
/// Print the effective settings in TOML format.
///
/// Settings are layered: built-in defaults, then `~/.rssoc.toml`, then `RSSOC_*` environment
/// variables (use `__` to reach nested keys, e.g. `RSSOC_POTENTIAL__REAL`).
pub struct Config {
    #[arg(long, short = 'c')]
    /// Settings file to use instead of `~/.rssoc.toml`.
    config: Option<PathBuf>,

    #[arg(long)]
    /// Print the built-in defaults only, useful as a template.
    template: bool,
}


impl OptProcess for Config {
    fn process(&self) -> Result<()> {
        let settings = if self.template {
            Settings::default()
        } else {
            if let Some(p) = Settings::config_path() {
                info!("Default config path: {:?}", p);
            }
            Settings::load(self.config.as_deref())?
        };

        print!("{}", settings.to_toml()?);
        Ok(())
    }
}
