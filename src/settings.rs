use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context;
use directories::BaseDirs;
use figment::{
    Figment,
    providers::{
        Env,
        Format,
        Serialized,
        Toml,
    },
};
use log::debug;
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    soc::SocOptions,
    spectral::Indexing,
    types::Result,
};


const CONFIG_FNAME: &str = ".rssoc.toml";
const ENV_PREFIX: &str = "RSSOC_";


/// Dataset names of the reciprocal-space potential in its HDF5 file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PotentialDatasets {
    pub real: String,
    pub imag: Option<String>,
}

impl Default for PotentialDatasets {
    fn default() -> Self {
        Self {
            real: "potential_real".to_string(),
            imag: Some("potential_imag".to_string()),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    pub potential:        PotentialDatasets,
    pub gvector_indexing: Indexing,
    pub spinor:           usize,
}


impl Settings {
    /// `~/.rssoc.toml`
    pub fn config_path() -> Option<PathBuf> {
        BaseDirs::new().map(|d| d.home_dir().join(CONFIG_FNAME))
    }

    fn figment_with(path: Option<&Path>) -> Figment {
        let mut fig = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            debug!("Loading settings from {:?}", path);
            fig = fig.merge(Toml::file(path));
        }
        fig.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Defaults, then `~/.rssoc.toml` if present, then `RSSOC_*` environment variables.
    pub fn from_default() -> Result<Self> {
        let path = Self::config_path();
        Self::figment_with(path.as_deref())
            .extract()
            .context("Failed to load the settings.")
    }

    /// Defaults overridden by the given TOML file and the environment.
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file {:?} not found.", path);
        }
        Self::figment_with(Some(path))
            .extract()
            .with_context(|| format!("Failed to load settings from {:?}.", path))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None    => Self::from_default(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn soc_options(&self) -> SocOptions {
        SocOptions {
            spinor:   self.spinor,
            indexing: self.gvector_indexing,
        }
    }
}
