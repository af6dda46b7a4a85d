#[derive(Debug)]
pub enum ClientError {
    /// WebSocket connect or transport failure.
    Connect(String),
    Config(String),
    /// The server connection closed.
    Disconnected,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "connection failed: {e}"),
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Disconnected => write!(f, "disconnected from server"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connect(e.to_string())
    }
}
