//! Server configuration and the command line that fills it in.
//!
//! Precedence, lowest first: built-in defaults, the JSON file named by
//! `--config`, environment variables (`JACKROOM_*`), explicit flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use jackroom_session::GameRules;
use jackroom_timer::TimerConfig;
use jackroom_transport::frame::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};

use crate::JackroomError;

/// Everything the server needs to start, apart from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Default: `0.0.0.0:4000`.
    pub bind_addr: String,
    /// Seconds between periodic room resets. Default: 60.
    pub reset_period_secs: u64,
    /// Upper bound on the random delay before each room's first reset.
    pub reset_jitter_ms: u64,
    /// Largest request frame accepted, in bytes. Default: 64 KiB.
    pub max_frame_len: usize,
    pub rules: GameRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4000".to_string(),
            reset_period_secs: 60,
            reset_jitter_ms: 0,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            rules: GameRules::default(),
        }
    }
}

impl ServerConfig {
    pub fn reset_period(&self) -> Duration {
        Duration::from_secs(self.reset_period_secs)
    }

    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            period: self.reset_period(),
            initial_jitter: Duration::from_millis(self.reset_jitter_ms),
        }
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, JackroomError> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| JackroomError::Config(format!("{}: {e}", path.display())))
    }
}

/// Jackroom game-room server
#[derive(Parser, Debug, Clone)]
#[command(name = "jackroom-server", version, about = "Jackroom game-room server")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "JACKROOM_BIND")]
    pub bind: Option<String>,

    /// Seconds between periodic room resets
    #[arg(long, env = "JACKROOM_RESET_PERIOD_SECS")]
    pub reset_period_secs: Option<u64>,

    /// Maximum random delay before each room's first reset, in milliseconds
    #[arg(long, env = "JACKROOM_RESET_JITTER_MS")]
    pub reset_jitter_ms: Option<u64>,

    /// Largest accepted request frame, in bytes
    #[arg(long, env = "JACKROOM_MAX_FRAME_LEN")]
    pub max_frame_len: Option<usize>,

    /// JSON server configuration file
    #[arg(long, env = "JACKROOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON seed for the in-memory store (rooms, users, game records)
    #[arg(long, env = "JACKROOM_SEED")]
    pub seed: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JACKROOM_JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Resolves the final [`ServerConfig`].
    pub fn server_config(&self) -> Result<ServerConfig, JackroomError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(secs) = self.reset_period_secs {
            config.reset_period_secs = secs;
        }
        if let Some(ms) = self.reset_jitter_ms {
            config.reset_jitter_ms = ms;
        }
        if let Some(len) = self.max_frame_len {
            config.max_frame_len = len;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.reset_period(), Duration::from_secs(60));
        assert_eq!(config.max_frame_len, 64 * 1024);
        assert_eq!(config.rules, GameRules::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "resetPeriodSecs": 5, "rules": { "reward_rate": "0.2" } }"#)
                .unwrap();
        assert_eq!(config.reset_period_secs, 5);
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.rules.reward_rate, Decimal::new(2, 1));
        assert_eq!(config.rules.jackpot_contribution_rate, Decimal::new(1, 1));
    }

    #[test]
    fn test_timer_config_carries_period_and_jitter() {
        let config = ServerConfig {
            reset_period_secs: 30,
            reset_jitter_ms: 250,
            ..Default::default()
        };
        let timer = config.timer_config();
        assert_eq!(timer.period, Duration::from_secs(30));
        assert_eq!(timer.initial_jitter, Duration::from_millis(250));
    }

    #[test]
    fn test_args_flags_override_defaults() {
        let args = Args::parse_from([
            "jackroom-server",
            "--bind",
            "127.0.0.1:5000",
            "--reset-period-secs",
            "10",
        ]);
        let config = args.server_config().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.reset_period_secs, 10);
        assert_eq!(config.reset_jitter_ms, 0);
    }

    #[test]
    fn test_args_missing_config_file_is_io_error() {
        let args = Args::parse_from([
            "jackroom-server",
            "--config",
            "/nonexistent/jackroom.json",
        ]);
        assert!(matches!(args.server_config(), Err(JackroomError::Io(_))));
    }
}
