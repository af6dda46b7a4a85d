use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, CreateLobbyMsg, JoinLobbyMsg, LobbyListMsg, LobbyListRequestMsg,
    MatchStartedMsg, MessageType, PlayerAccountLinkMsg, PlayerInitMsg, PlayerJoinsLobbyMsg,
    PlayerLeavesLobbyMsg, PlayerSetNameMsg, PlayerStartedMatchMsg, ReceiveDataMsg, SendDataMsg,
    ServerMessage, UpdateLobbiesMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    let msg_type = msg.message_type();
    match msg {
        ClientMessage::LobbyListRequest(m) => encode_message(msg_type, m),
        ClientMessage::PlayerJoinsLobby(m) => encode_message(msg_type, m),
        ClientMessage::PlayerLeavesLobby(m) => encode_message(msg_type, m),
        ClientMessage::PlayerStartedMatch(m) => encode_message(msg_type, m),
        ClientMessage::SendDataToOtherPlayers(m) => encode_message(msg_type, m),
        ClientMessage::PlayerAccountLink(m) => encode_message(msg_type, m),
        ClientMessage::CreateLobby(m) => encode_message(msg_type, m),
        ClientMessage::PlayerSetName(m) => encode_message(msg_type, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let msg_type = msg.message_type();
    match msg {
        ServerMessage::PlayerInit(m) => encode_message(msg_type, m),
        ServerMessage::LobbyList(m) => encode_message(msg_type, m),
        ServerMessage::JoinLobby(m) => encode_message(msg_type, m),
        ServerMessage::UpdateLobbies(m) => encode_message(msg_type, m),
        ServerMessage::MatchStarted(m) => encode_message(msg_type, m),
        ServerMessage::ReceiveDataFromOtherPlayers(m) => encode_message(msg_type, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::LobbyListRequest => Ok(ClientMessage::LobbyListRequest(decode_payload::<
            LobbyListRequestMsg,
        >(data)?)),
        MessageType::PlayerJoinsLobby => Ok(ClientMessage::PlayerJoinsLobby(decode_payload::<
            PlayerJoinsLobbyMsg,
        >(data)?)),
        MessageType::PlayerLeavesLobby => Ok(ClientMessage::PlayerLeavesLobby(decode_payload::<
            PlayerLeavesLobbyMsg,
        >(data)?)),
        MessageType::PlayerStartedMatch => Ok(ClientMessage::PlayerStartedMatch(
            decode_payload::<PlayerStartedMatchMsg>(data)?,
        )),
        MessageType::SendDataToOtherPlayers => Ok(ClientMessage::SendDataToOtherPlayers(
            decode_payload::<SendDataMsg>(data)?,
        )),
        MessageType::PlayerAccountLink => Ok(ClientMessage::PlayerAccountLink(decode_payload::<
            PlayerAccountLinkMsg,
        >(data)?)),
        MessageType::CreateLobby => Ok(ClientMessage::CreateLobby(decode_payload::<
            CreateLobbyMsg,
        >(data)?)),
        MessageType::PlayerSetName => Ok(ClientMessage::PlayerSetName(decode_payload::<
            PlayerSetNameMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::PlayerInit => Ok(ServerMessage::PlayerInit(decode_payload::<PlayerInitMsg>(
            data,
        )?)),
        MessageType::LobbyList => Ok(ServerMessage::LobbyList(decode_payload::<LobbyListMsg>(
            data,
        )?)),
        MessageType::JoinLobby => Ok(ServerMessage::JoinLobby(decode_payload::<JoinLobbyMsg>(
            data,
        )?)),
        MessageType::UpdateLobbies => Ok(ServerMessage::UpdateLobbies(decode_payload::<
            UpdateLobbiesMsg,
        >(data)?)),
        MessageType::MatchStarted => Ok(ServerMessage::MatchStarted(decode_payload::<
            MatchStartedMsg,
        >(data)?)),
        MessageType::ReceiveDataFromOtherPlayers => Ok(ServerMessage::ReceiveDataFromOtherPlayers(
            decode_payload::<ReceiveDataMsg>(data)?,
        )),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
