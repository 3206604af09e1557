use std::{env, fs, path::PathBuf};

use directories::ProjectDirs;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "https://castiq.onrender.com";

const BACKEND_URL_VAR: &str = "CASTIQ_BACKEND_URL";
const USER_ID_VAR: &str = "CASTIQ_USER_ID";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not determine a config directory for this platform")]
    NoConfigDir,

    #[error("Could not read config file")]
    Read(#[source] std::io::Error),

    #[error("Could not write config file")]
    Write(#[source] std::io::Error),

    #[error("Could not parse config file")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Could not serialize config")]
    Serialize(#[from] ron::Error),
}

/// Configuration for this crate.
///
/// Stored as RON in the platform config directory. The first run writes a
/// fresh file with the default backend and a newly generated user id; the
/// id is what scopes every backend call, so losing it means losing access
/// to the logged catches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend_url: String,
    pub user_id: String,
}

impl Config {
    /// Load the config file, creating it on first run. The environment
    /// variables `CASTIQ_BACKEND_URL` and `CASTIQ_USER_ID` override the
    /// stored values without touching the file.
    pub fn load() -> Result<Self, Error> {
        let path = config_path()?;

        let mut config = match fs::read_to_string(&path) {
            Ok(raw) => ron::from_str(&raw)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::generate();
                config.save()?;
                info!("created new config at {}", path.display());
                config
            }
            Err(error) => return Err(Error::Read(error)),
        };

        if let Ok(url) = env::var(BACKEND_URL_VAR) {
            config.backend_url = url;
        }
        if let Ok(user_id) = env::var(USER_ID_VAR) {
            config.user_id = user_id;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), Error> {
        let path = config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Write)?;
        }

        let raw = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(&path, raw).map_err(Error::Write)
    }

    fn generate() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            user_id: random_user_id(),
        }
    }
}

// The original client kept a random UUID in browser local storage; a random
// 128-bit hex string fills the same role here.
fn random_user_id() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}

fn config_path() -> Result<PathBuf, Error> {
    let dirs = ProjectDirs::from("com", "CastIQ", "castiq").ok_or(Error::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.ron"))
}
