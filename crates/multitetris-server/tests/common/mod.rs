use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use multitetris_core::lobby::{LobbyId, LobbySummary};
use multitetris_core::net::messages::{
    ClientMessage, PlayerJoinsLobbyMsg, PlayerLeavesLobbyMsg, ServerMessage,
};
use multitetris_core::net::protocol::{decode_server_message, encode_client_message};
use multitetris_core::player::NetworkId;

use multitetris_server::build_app;
use multitetris_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Connect and consume the PlayerInit greeting. Returns the assigned id.
pub async fn ws_connect_player(server: &TestServer) -> (WsStream, NetworkId) {
    let mut stream = ws_connect(&server.ws_url()).await;
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::PlayerInit(init) => (stream, init.network_id),
        other => panic!("Expected PlayerInit, got: {other:?}"),
    }
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Skip messages until an UpdateLobbies arrives.
pub async fn ws_read_update(stream: &mut WsStream) -> (Vec<LobbySummary>, Vec<LobbyId>) {
    loop {
        if let ServerMessage::UpdateLobbies(update) = ws_read_server_msg(stream).await {
            return (update.lobbies, update.removed);
        }
    }
}

/// Join a lobby and return the JoinLobby confirmation. The broadcast
/// UpdateLobbies that follows is consumed as well.
pub async fn ws_join_lobby(stream: &mut WsStream, lobby_id: LobbyId) -> LobbySummary {
    ws_send_client_msg(
        stream,
        &ClientMessage::PlayerJoinsLobby(PlayerJoinsLobbyMsg { lobby_id }),
    )
    .await;
    let joined = match ws_read_server_msg(stream).await {
        ServerMessage::JoinLobby(join) => join.lobby,
        other => panic!("Expected JoinLobby, got: {other:?}"),
    };
    let _ = ws_read_update(stream).await;
    joined
}

pub async fn ws_leave_lobby(stream: &mut WsStream, lobby_id: LobbyId) {
    ws_send_client_msg(
        stream,
        &ClientMessage::PlayerLeavesLobby(PlayerLeavesLobbyMsg { lobby_id }),
    )
    .await;
}
