use kensaku_search::SearchHandling;
use serde::{Deserialize, Serialize};

/// Server configuration loaded from YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Used when the request has no `Prefer: handling=` header
    pub handling: SearchHandling,
    /// Absolute references under this URL are treated as local
    pub base_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if let Some(path) = config_path {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override settings from `KENSAKU_*` variables. Unparseable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("KENSAKU_PORT")
            && let Ok(port_num) = port.parse()
        {
            self.server.port = port_num;
        }

        if let Some(host) = lookup("KENSAKU_HOST") {
            self.server.host = host;
        }

        if let Some(level) = lookup("KENSAKU_LOG") {
            self.log.level = level;
        }

        if let Some(base_url) = lookup("KENSAKU_BASE_URL") {
            self.search.base_url = Some(base_url);
        }

        match lookup("KENSAKU_HANDLING").as_deref() {
            Some("strict") => self.search.handling = SearchHandling::Strict,
            Some("lenient") => self.search.handling = SearchHandling::Lenient,
            Some(other) => tracing::warn!("Ignoring unknown KENSAKU_HANDLING value: {}", other),
            None => {}
        }
    }
}
