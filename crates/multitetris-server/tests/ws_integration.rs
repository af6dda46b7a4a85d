#[allow(dead_code)]
mod common;

use multitetris_core::net::messages::{
    ClientMessage, CreateLobbyMsg, LobbyListRequestMsg, PlayerAccountLinkMsg,
    PlayerStartedMatchMsg, ServerMessage,
};
use multitetris_core::net::protocol::PROTOCOL_VERSION;
use multitetris_server::config::{LimitsConfig, ServerConfig};

use common::{
    TestServer, ws_connect, ws_connect_player, ws_join_lobby, ws_leave_lobby, ws_read_server_msg,
    ws_read_update, ws_send_client_msg, ws_try_read_raw,
};

#[tokio::test]
async fn connect_receives_player_init() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::PlayerInit(init) => {
            assert_eq!(init.network_id, 1);
            assert_eq!(init.protocol_version, PROTOCOL_VERSION);
        },
        other => panic!("Expected PlayerInit, got: {other:?}"),
    }

    let (_second, id) = ws_connect_player(&server).await;
    assert_eq!(id, 2);
}

#[tokio::test]
async fn lobby_list_returns_public_lobbies() {
    let server = TestServer::new().await;
    let (mut stream, _) = ws_connect_player(&server).await;

    ws_send_client_msg(
        &mut stream,
        &ClientMessage::LobbyListRequest(LobbyListRequestMsg::default()),
    )
    .await;
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::LobbyList(list) => {
            assert_eq!(list.lobbies.len(), 10);
            assert_eq!(list.lobbies[0].name, "Public lobby 1");
            assert!(list.lobbies.iter().all(|l| l.public));
        },
        other => panic!("Expected LobbyList, got: {other:?}"),
    }
}

#[tokio::test]
async fn first_joiner_is_admin_and_admin_migrates() {
    let server = TestServer::new().await;
    let (mut alice, alice_id) = ws_connect_player(&server).await;
    let (mut bob, bob_id) = ws_connect_player(&server).await;

    let lobby = ws_join_lobby(&mut alice, 1).await;
    assert_eq!(lobby.admin, Some(alice_id));
    // Bob sees Alice's join in the directory broadcast.
    let (lobbies, _) = ws_read_update(&mut bob).await;
    assert_eq!(lobbies[0].members.len(), 1);

    let lobby = ws_join_lobby(&mut bob, 1).await;
    assert_eq!(lobby.admin, Some(alice_id));
    assert_eq!(lobby.members.len(), 2);
    let _ = ws_read_update(&mut alice).await;

    ws_leave_lobby(&mut alice, 1).await;
    let (lobbies, removed) = ws_read_update(&mut bob).await;
    assert!(removed.is_empty());
    assert_eq!(lobbies[0].admin, Some(bob_id));
    assert_eq!(lobbies[0].members.len(), 1);
}

#[tokio::test]
async fn private_lobby_is_destroyed_when_emptied() {
    let server = TestServer::new().await;
    let (mut alice, alice_id) = ws_connect_player(&server).await;
    let (mut bob, _) = ws_connect_player(&server).await;

    ws_send_client_msg(
        &mut alice,
        &ClientMessage::CreateLobby(CreateLobbyMsg {
            lobby_name: "Friends".to_string(),
            public: false,
        }),
    )
    .await;
    let lobby = match ws_read_server_msg(&mut alice).await {
        ServerMessage::JoinLobby(join) => join.lobby,
        other => panic!("Expected JoinLobby, got: {other:?}"),
    };
    assert_eq!(lobby.admin, Some(alice_id));
    assert!(!lobby.public);
    let (lobbies, _) = ws_read_update(&mut bob).await;
    assert_eq!(lobbies[0].id, lobby.id);

    ws_leave_lobby(&mut alice, lobby.id).await;
    let (_, removed) = ws_read_update(&mut bob).await;
    assert_eq!(removed, vec![lobby.id]);
}

#[tokio::test]
async fn disconnect_leaves_lobbies() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_connect_player(&server).await;
    let (mut bob, bob_id) = ws_connect_player(&server).await;

    ws_join_lobby(&mut alice, 3).await;
    let _ = ws_read_update(&mut bob).await;
    ws_join_lobby(&mut bob, 3).await;
    let _ = ws_read_update(&mut alice).await;

    drop(alice);

    let (lobbies, _) = ws_read_update(&mut bob).await;
    assert_eq!(lobbies[0].id, 3);
    assert_eq!(lobbies[0].admin, Some(bob_id));
    assert_eq!(lobbies[0].members.len(), 1);
}

#[tokio::test]
async fn match_started_reaches_all_members() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_connect_player(&server).await;
    let (mut bob, bob_id) = ws_connect_player(&server).await;

    ws_join_lobby(&mut alice, 2).await;
    let _ = ws_read_update(&mut bob).await;
    ws_join_lobby(&mut bob, 2).await;
    let _ = ws_read_update(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::PlayerStartedMatch(PlayerStartedMatchMsg { lobby_id: 2 }),
    )
    .await;

    for stream in [&mut alice, &mut bob] {
        match ws_read_server_msg(stream).await {
            ServerMessage::MatchStarted(started) => {
                assert_eq!(started.lobby.id, 2);
                assert!(started.lobby.members.iter().any(|p| p.network_id == bob_id));
            },
            other => panic!("Expected MatchStarted, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn non_member_cannot_start_match() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_connect_player(&server).await;
    let (mut mallory, _) = ws_connect_player(&server).await;

    ws_join_lobby(&mut alice, 1).await;
    let _ = ws_read_update(&mut mallory).await;

    ws_send_client_msg(
        &mut mallory,
        &ClientMessage::PlayerStartedMatch(PlayerStartedMatchMsg { lobby_id: 1 }),
    )
    .await;
    assert!(ws_try_read_raw(&mut alice, 200).await.is_none());
}

#[tokio::test]
async fn account_link_updates_member_name() {
    let server = TestServer::new().await;
    let (mut alice, alice_id) = ws_connect_player(&server).await;

    let lobby = ws_join_lobby(&mut alice, 1).await;
    assert_eq!(lobby.members[0].name, format!("Player {alice_id}"));

    ws_send_client_msg(
        &mut alice,
        &ClientMessage::PlayerAccountLink(PlayerAccountLinkMsg {
            account_id: "acc-42".to_string(),
            display_name: "Alice".to_string(),
        }),
    )
    .await;
    let (lobbies, _) = ws_read_update(&mut alice).await;
    assert_eq!(lobbies[0].members[0].name, "Alice");
    assert_eq!(lobbies[0].members[0].account_id(), Some("acc-42"));
}

#[tokio::test]
async fn server_only_and_garbage_frames_are_ignored() {
    use futures::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    let server = TestServer::new().await;
    let (mut stream, _) = ws_connect_player(&server).await;

    // PlayerInit type byte sent by a client.
    stream
        .send(Message::Binary(vec![0x10, 0x80].into()))
        .await
        .unwrap();
    stream
        .send(Message::Binary(vec![0xFF, 0x00].into()))
        .await
        .unwrap();
    assert!(ws_try_read_raw(&mut stream, 200).await.is_none());

    // Connection is still usable.
    ws_send_client_msg(
        &mut stream,
        &ClientMessage::LobbyListRequest(LobbyListRequestMsg::default()),
    )
    .await;
    assert!(matches!(
        ws_read_server_msg(&mut stream).await,
        ServerMessage::LobbyList(_)
    ));
}

#[tokio::test]
async fn connection_limit_rejects_upgrade() {
    let config = ServerConfig {
        limits: LimitsConfig {
            max_ws_connections: 1,
            ..LimitsConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let (_first, _) = ws_connect_player(&server).await;

    let result = tokio_tungstenite::connect_async(server.ws_url()).await;
    assert!(result.is_err());
}
