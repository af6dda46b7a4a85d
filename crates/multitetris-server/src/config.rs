use serde::Deserialize;

/// Top-level server configuration, loaded from `multitetris.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub lobbies: LobbiesConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            lobbies: LobbiesConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Lobby directory settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LobbiesConfig {
    /// Public lobbies created at startup. They persist while empty.
    pub public_lobby_count: usize,
    /// Maximum members per lobby.
    pub max_members: usize,
    /// Maximum length of lobby and player names.
    pub max_name_len: usize,
    /// Cap on lobbies of any kind, seeded public ones included.
    pub max_lobbies: usize,
}

impl Default for LobbiesConfig {
    fn default() -> Self {
        Self {
            public_lobby_count: 10,
            max_members: 8,
            max_name_len: 32,
            max_lobbies: 64,
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 50.0,
            player_message_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.lobbies.public_lobby_count == 0 {
            tracing::warn!("lobbies.public_lobby_count is 0, players must create lobbies");
        }
        if self.lobbies.max_members < 2 {
            tracing::error!("lobbies.max_members must be >= 2");
            std::process::exit(1);
        }
        if self.lobbies.max_name_len == 0 {
            tracing::error!("lobbies.max_name_len must be > 0");
            std::process::exit(1);
        }
        if self.lobbies.max_lobbies < self.lobbies.public_lobby_count.max(1) {
            tracing::error!(
                max_lobbies = self.lobbies.max_lobbies,
                public_lobby_count = self.lobbies.public_lobby_count,
                "lobbies.max_lobbies must cover the public lobbies and be > 0"
            );
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `multitetris.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("multitetris.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from multitetris.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse multitetris.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No multitetris.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("MULTITETRIS_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_PUBLIC_LOBBIES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.lobbies.public_lobby_count = n;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_MAX_LOBBY_MEMBERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.lobbies.max_members = n;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_MAX_LOBBIES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.lobbies.max_lobbies = n;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("MULTITETRIS_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }

        config
    }
}
