use std::fs;
use std::path::{Path, PathBuf};

use scrim_config::api::ApiConfig;
use scrim_config::{Config, ConfigError, ConfigStore};
use serde::{Deserialize, Serialize};

const MAIN_PROFILE: &str = "main";

/// Platform config folder, e.g. `~/.config/scrim` or `%APPDATA%\scrim`
pub fn scrim_root() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("No config directory on this platform"))?;
    Ok(base.join("scrim"))
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

/// JSON profile files under `<root>/profiles/<name>.json`.
///
/// The API key is never written; every load takes it from the environment.
pub struct ProfileStore {
    dir: PathBuf,
    name: String,
}

impl ProfileStore {
    /// Open `name` under the platform config folder, creating the main
    /// profile from defaults if it is missing
    pub fn open(name: &str) -> anyhow::Result<Self> {
        Self::open_in(scrim_root()?.join("profiles"), name)
    }

    pub fn open_in(dir: impl Into<PathBuf>, name: &str) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let main_profile = dir.join(format!("{MAIN_PROFILE}.json"));
        if !main_profile.exists() {
            write_profile(&main_profile, MAIN_PROFILE, &Config::default())?;
            tracing::info!("Created main profile at {}", main_profile.display());
        }

        Ok(Self {
            dir,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Add a new profile cloned from main
    pub fn add_profile_from_main(&self, new_name: &str) -> Result<PathBuf, ConfigError> {
        let config = read_profile(&self.path_of(MAIN_PROFILE))?;
        let file = self.path_of(new_name);
        write_profile(&file, new_name, &config)?;
        tracing::info!("Created new profile: {new_name}");
        Ok(file)
    }
}

impl ConfigStore for ProfileStore {
    /// Load the profile, falling back to main and then to defaults
    fn load(&self) -> Result<Config, ConfigError> {
        let profile_file = self.path_of(&self.name);
        let main_file = self.path_of(MAIN_PROFILE);

        let mut config = if profile_file.exists() {
            read_profile(&profile_file)?
        } else if main_file.exists() {
            tracing::warn!("Profile {} not found, falling back to main profile", self.name);
            read_profile(&main_file)?
        } else {
            tracing::warn!("No profiles found, using defaults");
            Config::default()
        };

        config.api = ApiConfig::from_env();
        Ok(config.sanitized())
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        write_profile(&self.path_of(&self.name), &self.name, config)?;
        tracing::debug!("Saved profile {}", self.name);
        Ok(())
    }
}

fn read_profile(path: &Path) -> Result<Config, ConfigError> {
    let data = fs::read_to_string(path)?;
    let profile: Profile = serde_json::from_str(&data)?;
    Ok(profile.value)
}

fn write_profile(path: &Path, name: &str, config: &Config) -> Result<(), ConfigError> {
    #[derive(Serialize)]
    struct ProfileRef<'a> {
        name: &'a str,
        value: &'a Config,
    }

    let json = serde_json::to_string_pretty(&ProfileRef { name, value: config })?;
    fs::write(path, json)?;
    Ok(())
}
