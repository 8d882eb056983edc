use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use crate::notification::DEFAULT_ICON;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Feed sources, each either an http(s):// URL or a local file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_videos_feed")]
    pub videos: String,
    #[serde(default = "default_posts_feed")]
    pub posts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

/// Which delivery strategy the daemon uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Native trigger when available, timer otherwise.
    #[default]
    Auto,
    Native,
    Timer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Page opened when a notification is clicked.
    #[serde(default = "default_open_page")]
    pub open_page: String,
    /// Foreground phrase polling interval.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub strategy: StrategyPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Persisted notification permission, see [`crate::state`].
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            videos: default_videos_feed(),
            posts: default_posts_feed(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            pid_file: default_pid_file(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            icon: default_icon(),
            open_page: default_open_page(),
            poll_interval_secs: default_poll_interval_secs(),
            strategy: StrategyPreference::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

fn default_videos_feed() -> String {
    "meowbah-videos.xml".to_string()
}

fn default_posts_feed() -> String {
    "meowbah-posts.xml".to_string()
}

fn default_bind_address() -> String {
    platform::DAEMON_TCP_HOST.to_string()
}

fn default_port() -> u16 {
    platform::DAEMON_TCP_PORT
}

fn default_pid_file() -> PathBuf {
    platform::data_dir().join("daemon.pid")
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_open_page() -> String {
    "meowtalk.html".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `path`, writing defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn daemon_address(&self) -> String {
        format!("{}:{}", self.daemon.bind_address, self.daemon.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feeds.videos, "meowbah-videos.xml");
        assert_eq!(config.feeds.posts, "meowbah-posts.xml");
        assert_eq!(config.daemon.port, 9877);
        assert_eq!(config.daemon_address(), "127.0.0.1:9877");
        assert_eq!(config.notifications.icon, "sitelogo.png");
        assert_eq!(config.notifications.poll_interval_secs, 60);
        assert_eq!(config.notifications.strategy, StrategyPreference::Auto);
        assert!(config.paths.state_file.ends_with("meowtalk/state.json"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[feeds]
videos = "https://example.com/videos.xml"

[notifications]
strategy = "timer"
"#,
        )
        .unwrap();
        assert_eq!(config.feeds.videos, "https://example.com/videos.xml");
        assert_eq!(config.feeds.posts, "meowbah-posts.xml");
        assert_eq!(config.notifications.strategy, StrategyPreference::Timer);
        assert_eq!(config.notifications.open_page, "meowtalk.html");
    }

    #[test]
    fn test_load_from_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.daemon.port, 9877);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.feeds.videos, config.feeds.videos);
    }
}
