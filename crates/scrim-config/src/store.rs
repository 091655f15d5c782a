use std::sync::Mutex;

use crate::{Config, ConfigError};

/// Persistence collaborator for the configuration
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&self, config: &Config) -> Result<(), ConfigError>;

    /// No usable API key means the user still has to go through setup
    fn is_first_run(&self) -> bool {
        self.load().map(|c| !c.api.has_key()).unwrap_or(true)
    }
}

/// Store that keeps the configuration in memory only
#[derive(Default)]
pub struct MemoryStore {
    config: Mutex<Config>,
    saves: Mutex<u64>,
}

impl MemoryStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> u64 {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        *self.config.lock().unwrap_or_else(|e| e.into_inner()) = config.clone();
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        tracing::debug!("config saved to memory store");
        Ok(())
    }
}
