use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

use crate::environment::ToolMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_error_buffer_size")]
    pub error_buffer_size: usize,

    #[serde(default)]
    pub initial_tool_mode: ToolMode,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// A handler still running after this long counts as interrupted.
    #[serde(default, with = "option_duration_ms")]
    pub handler_timeout: Option<Duration>,

    /// How deeply sends and function calls may nest before failing with
    /// "too much recursion".
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout: None,
            max_call_depth: default_max_call_depth(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            error_buffer_size: default_error_buffer_size(),
            initial_tool_mode: ToolMode::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl SystemConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

fn default_error_buffer_size() -> usize {
    64
}

fn default_max_call_depth() -> usize {
    64
}

// Duration型のシリアライズ/デシリアライズヘルパー
mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
