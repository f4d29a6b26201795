use crate::error::{AppError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILE: &str = "mood-arcade.log";

#[derive(Clone, Debug)]
pub struct Settings
{
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub log_path: PathBuf,
    pub offline: bool,
}

impl Settings
{
    pub fn from_env() -> Result<Self>
    {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self>
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = lookup("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = match lookup("MOOD_ARCADE_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| AppError::Config {
                    name: "MOOD_ARCADE_TIMEOUT_SECS",
                    reason: format!("'{value}' is not a whole number of seconds"),
                })?;
                if secs == 0 {
                    return Err(AppError::Config {
                        name: "MOOD_ARCADE_TIMEOUT_SECS",
                        reason: "must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        let log_path = lookup("MOOD_ARCADE_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_LOG_FILE));

        Ok(Self {
            api_key,
            model,
            base_url,
            timeout,
            log_path,
            offline: false,
        })
    }
}
