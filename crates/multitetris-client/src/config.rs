use serde::Deserialize;

use multitetris_core::config::BoardConfig;

use crate::error::ClientError;

/// Client configuration, loaded from `multitetris-client.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    /// Name sent to the server on connect; shown to other players until an
    /// account is linked.
    pub player_name: String,
    pub gravity_interval_ms: u64,
    pub snapshot_interval_ms: u64,
    pub board: BoardConfig,
    pub identity: Option<IdentityConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            player_name: "Player".to_string(),
            gravity_interval_ms: 500,
            snapshot_interval_ms: 500,
            board: BoardConfig::default(),
            identity: None,
        }
    }
}

/// Identity-toolkit style account service and the highscore store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub auth_url: String,
    pub api_key: String,
    /// Realtime-database style base URL; scores go to `{url}/{account_id}.json`.
    pub highscore_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            api_key: String::new(),
            highscore_url: String::new(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            return Err(ClientError::Config(format!(
                "server_url must be a ws:// or wss:// URL, got {}",
                self.server_url
            )));
        }
        if self.gravity_interval_ms == 0 || self.snapshot_interval_ms == 0 {
            return Err(ClientError::Config("intervals must be > 0".to_string()));
        }
        if !self.board.is_playable() {
            return Err(ClientError::Config(format!(
                "board {}x{} with lookahead {} is not playable",
                self.board.cols, self.board.rows, self.board.lookahead
            )));
        }
        if let Some(identity) = &self.identity
            && identity.api_key.is_empty()
        {
            return Err(ClientError::Config("identity.api_key is empty".to_string()));
        }
        Ok(())
    }

    /// Load config from `multitetris-client.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("multitetris-client.toml") {
            Ok(content) => match toml::from_str::<ClientConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from multitetris-client.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse multitetris-client.toml: {e}, using defaults");
                    ClientConfig::default()
                },
            },
            Err(_) => ClientConfig::default(),
        };

        if let Ok(url) = std::env::var("MULTITETRIS_CLIENT_SERVER_URL")
            && !url.is_empty()
        {
            config.server_url = url;
        }
        if let Ok(name) = std::env::var("MULTITETRIS_CLIENT_PLAYER_NAME")
            && !name.trim().is_empty()
        {
            config.player_name = name.trim().to_string();
        }
        if let Ok(val) = std::env::var("MULTITETRIS_CLIENT_GRAVITY_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.gravity_interval_ms = ms;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_CLIENT_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.board.seed = Some(seed);
        }
        if let Ok(key) = std::env::var("MULTITETRIS_CLIENT_API_KEY")
            && !key.is_empty()
        {
            config.identity.get_or_insert_with(IdentityConfig::default).api_key = key;
        }

        config
    }
}
