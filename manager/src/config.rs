use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Settings the lifecycle manager reads at construction.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EscalationConfig {
    /// Fallback delay for follow-up scheduling when the caller gives none
    /// (or a non-positive value).
    #[serde(default = "default_follow_up_minutes")]
    pub default_follow_up_minutes: i64,
    /// Topic applied to knowledge base entries when the supervisor leaves
    /// the topic blank.
    #[serde(default = "default_knowledge_base_auto_tag")]
    pub knowledge_base_auto_tag: String,
    /// Optional closing line appended to resolution messages.
    #[serde(default)]
    pub post_resolution_followup: Option<String>,
    /// Interval of the in-process reminder ticker. 0 disables the ticker;
    /// the dispatch endpoint still works for external schedulers.
    #[serde(default = "default_reminder_poll_seconds")]
    pub reminder_poll_seconds: u64,
}

fn default_follow_up_minutes() -> i64 {
    30
}

fn default_knowledge_base_auto_tag() -> String {
    "General".to_string()
}

fn default_reminder_poll_seconds() -> u64 {
    60
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            default_follow_up_minutes: default_follow_up_minutes(),
            knowledge_base_auto_tag: default_knowledge_base_auto_tag(),
            post_resolution_followup: None,
            reminder_poll_seconds: default_reminder_poll_seconds(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8082,
            },
            database: DatabaseConfig {
                path: get_default_db_path(),
            },
            escalation: EscalationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = get_config_path();

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            let default_config = r#"
[server]
host = "127.0.0.1"
port = 8082

[database]
path = "~/.local/share/frontdesk/manager.db"

[escalation]
# Minutes to wait before a promised follow-up comes due when the
# supervisor does not pick an interval.
default_follow_up_minutes = 30
# Topic stamped on knowledge base entries created without one.
knowledge_base_auto_tag = "General"
# Closing line appended to resolution messages. Leave commented to send
# the supervisor's answer as-is.
# post_resolution_followup = "Thanks again for your patience!"
# How often the daemon scans for due follow-up reminders. 0 disables the
# built-in ticker.
reminder_poll_seconds = 60
"#;
            std::fs::write(&config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .build()?;

        let mut config: AppConfig = builder.try_deserialize()?;
        expand_database_path(&mut config);

        Ok(config)
    }

    pub fn load_from_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::Message(format!(
                "Configuration file not found: {}",
                config_path.display()
            )));
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .build()?;

        let mut config: AppConfig = builder.try_deserialize()?;
        expand_database_path(&mut config);

        Ok(config)
    }
}

// Expand tilde in database path
fn expand_database_path(config: &mut AppConfig) {
    if config.database.path.starts_with("~") {
        if let Some(home) = home::home_dir() {
            let path_str = config.database.path.to_string_lossy();
            let expanded = path_str.replacen("~", &home.to_string_lossy(), 1);
            config.database.path = PathBuf::from(expanded);
        }
    }
}

fn get_config_path() -> PathBuf {
    if let Some(home) = home::home_dir() {
        home.join(".config/frontdesk/manager.toml")
    } else {
        PathBuf::from("manager.toml")
    }
}

fn get_default_db_path() -> PathBuf {
    if let Some(home) = home::home_dir() {
        home.join(".local/share/frontdesk/manager.db")
    } else {
        PathBuf::from("manager.db")
    }
}
