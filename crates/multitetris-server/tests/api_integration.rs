#[allow(dead_code)]
mod common;

use common::{TestServer, ws_connect_player, ws_join_lobby};

#[tokio::test]
async fn health_reports_counts() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_connect_player(&server).await;
    ws_join_lobby(&mut alice, 1).await;

    let resp = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"], 1);
    assert_eq!(body["lobbies"]["active"], 10);
    assert_eq!(body["lobbies"]["players"], 1);
}

#[tokio::test]
async fn list_lobbies_returns_directory() {
    let server = TestServer::new().await;
    let (mut alice, alice_id) = ws_connect_player(&server).await;
    ws_join_lobby(&mut alice, 2).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/v1/lobbies", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lobbies = body["lobbies"].as_array().unwrap();
    assert_eq!(lobbies.len(), 10);
    assert_eq!(lobbies[1]["id"], 2);
    assert_eq!(lobbies[1]["admin"], alice_id);
    assert_eq!(lobbies[1]["members"][0]["name"], format!("Player {alice_id}"));
}

#[tokio::test]
async fn get_lobby_by_id() {
    let server = TestServer::new().await;

    let resp = reqwest::get(format!("{}/api/v1/lobbies/4", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Public lobby 4");

    let resp = reqwest::get(format!("{}/api/v1/lobbies/999", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("999"));
}
