use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use multitetris_client::config::ClientConfig;
use multitetris_client::identity::RestIdentity;
use multitetris_client::input::ClientCommand;
use multitetris_client::runner::{Renderer, Runner};
use multitetris_client::session::{ClientEvent, ClientSession};

/// Prints board and lobby state to stdout.
struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, session: &ClientSession, event: &ClientEvent) {
        match event {
            ClientEvent::BoardChanged => {
                if let Some(game) = session.game() {
                    println!("{}", game.local());
                    for remote in game.remotes() {
                        println!("{}: {}", remote.player.name, remote.board.score());
                    }
                }
            },
            ClientEvent::LobbiesChanged => {
                for lobby in session.lobbies() {
                    let marker = if session.current_lobby().is_some_and(|l| l.id() == lobby.id()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{marker} [{}] {} ({} players)",
                        lobby.id(),
                        lobby.name(),
                        lobby.len()
                    );
                }
            },
            ClientEvent::GameOver { score } => println!("Game over! Final score: {score}"),
            ClientEvent::AuthFailed(e) => println!("Login failed: {e}"),
            ClientEvent::RemoteUpdated(_) => {},
            other => println!("{other:?}"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid client configuration");
        std::process::exit(1);
    }

    let conn = match multitetris_client::net::connect(&config.server_url).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(error = %e, "Server unavailable, only solo play is possible");
            None
        },
    };
    let identity = config.identity.clone().map(RestIdentity::new);

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ClientCommand>() {
                Ok(cmd) => {
                    if tx.send(cmd).await.is_err() {
                        break;
                    }
                },
                Err(e) => println!("{e}"),
            }
        }
    });

    let mut runner = Runner::new(&config, conn, identity, TerminalRenderer);
    if let Err(e) = runner.run(rx).await {
        tracing::error!(error = %e, "Client stopped");
        std::process::exit(1);
    }
}
