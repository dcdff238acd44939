// src/config.rs
use crate::client::AspectRatio;
use crate::jobs::PollConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Engine configuration, resolved explicitly at startup. Credentials are a
/// configuration step, not an ambient lookup: a missing key fails here, an
/// empty one surfaces later as a submission error.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub api_key: String,
    /// Where downloaded generation artifacts land.
    pub media_dir: PathBuf,
    /// Optional debug dump of job specs and raw advisory responses.
    pub artifact_dir: Option<PathBuf>,
    pub poll: PollConfig,
    pub default_aspect: AspectRatio,
}

impl Config {
    /// Read configuration from the environment, loading a `.env` file first
    /// when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let api_base = std::env::var("MIRAGE_API_BASE")
            .map_err(|_| ConfigError::MissingVar("MIRAGE_API_BASE"))?;
        let api_key = std::env::var("MIRAGE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("MIRAGE_API_KEY"))?;

        let media_dir = std::env::var("MIRAGE_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media/generated"));

        let artifact_dir = std::env::var("MIRAGE_ARTIFACT_DIR").ok().map(PathBuf::from);

        let mut poll = PollConfig::default();
        if let Ok(raw) = std::env::var("MIRAGE_POLL_INTERVAL_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                var: "MIRAGE_POLL_INTERVAL_SECS",
                value: raw.clone(),
            })?;
            poll.interval = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var("MIRAGE_POLL_MAX_WAIT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                var: "MIRAGE_POLL_MAX_WAIT_SECS",
                value: raw.clone(),
            })?;
            poll.max_wait = Duration::from_secs(secs);
        }

        let default_aspect = match std::env::var("MIRAGE_DEFAULT_ASPECT").as_deref() {
            Ok("9:16") => AspectRatio::Vertical,
            Ok("1:1") => AspectRatio::Square,
            Ok("16:9") | Err(_) => AspectRatio::Widescreen,
            Ok(other) => {
                return Err(ConfigError::InvalidVar {
                    var: "MIRAGE_DEFAULT_ASPECT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            api_base,
            api_key,
            media_dir,
            artifact_dir,
            poll,
            default_aspect,
        })
    }
}
