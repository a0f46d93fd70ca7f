//! Settlement engine configuration.
//!
//! Limits applied when circles are created and activated. Defaults suit
//! the hosted product; override via environment variables.

/// Limits for circle creation and activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Minimum active members before a circle may activate, and the
    /// smallest capacity a circle may be created with.
    pub min_members: u32,
    /// Largest capacity a circle may be created with.
    pub max_capacity: u32,
    /// Maximum circle name length in bytes.
    pub max_name_len: usize,
    /// Maximum description length in bytes.
    pub max_description_len: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            min_members: 3,
            max_capacity: 100,
            max_name_len: 80,
            max_description_len: 500,
        }
    }
}

impl SettlementConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CCV_MIN_MEMBERS` (default: 3)
    /// - `CCV_MAX_CAPACITY` (default: 100)
    /// - `CCV_MAX_NAME_LEN` (default: 80)
    /// - `CCV_MAX_DESCRIPTION_LEN` (default: 500)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            min_members: env_parse("CCV_MIN_MEMBERS", defaults.min_members)?,
            max_capacity: env_parse("CCV_MAX_CAPACITY", defaults.max_capacity)?,
            max_name_len: env_parse("CCV_MAX_NAME_LEN", defaults.max_name_len)?,
            max_description_len: env_parse(
                "CCV_MAX_DESCRIPTION_LEN",
                defaults.max_description_len,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_members < 2 {
            return Err(ConfigError::Inconsistent(format!(
                "CCV_MIN_MEMBERS must be at least 2, got {}",
                self.min_members
            )));
        }
        if self.max_capacity < self.min_members {
            return Err(ConfigError::Inconsistent(format!(
                "CCV_MAX_CAPACITY ({}) is below CCV_MIN_MEMBERS ({})",
                self.max_capacity, self.min_members
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    #[error("inconsistent settlement configuration: {0}")]
    Inconsistent(String),
}
