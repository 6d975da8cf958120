//! Integration tests for the server builder, the handshake, and seating.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use werewolf::prelude::*;
use werewolf_protocol::{Codec, Endpoint, JsonCodec};
use werewolf_transport::{Connection, TcpConnection};

// =========================================================================
// Helpers
// =========================================================================

fn three_seats() -> Vec<RoleKind> {
    vec![RoleKind::Wolf, RoleKind::Villager, RoleKind::Witch]
}

/// Starts a server on a random port. The returned token stops it.
async fn start_server(
    handshake: Duration,
) -> (String, CancellationToken, tokio::task::JoinHandle<Option<GameStatus>>) {
    let config = GameConfig {
        handshake,
        ..GameConfig::uniform(Duration::from_secs(2))
    };
    let server = WerewolfServer::builder()
        .bind("127.0.0.1:0")
        .config(config)
        .assignment(three_seats())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("local addr").to_string();

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { server.run_until(token).await.expect("clean run") });
    (addr, shutdown, handle)
}

async fn send(client: &TcpConnection, kind: PacketKind) {
    let endpoint = Endpoint::between(client.local_addr(), client.peer_addr());
    let packet = Packet::builder(kind, endpoint).build().unwrap();
    client.send(&JsonCodec.encode(&packet).unwrap()).await.unwrap();
}

async fn recv(client: &TcpConnection, within: Duration) -> Option<Packet> {
    match tokio::time::timeout(within, client.recv()).await {
        Ok(Ok(Some(frame))) => Some(JsonCodec.decode(&frame).unwrap()),
        _ => None,
    }
}

/// Connects and establishes; returns the client and its seat.
async fn join(addr: &str) -> (TcpConnection, i64) {
    let client = TcpConnection::connect(addr).await.unwrap();
    send(&client, PacketKind::Establish).await;
    let reply = recv(&client, Duration::from_secs(2))
        .await
        .expect("establish response");
    assert_eq!(reply.kind(), PacketKind::EstablishResponse);
    let seat = reply.int("seat").unwrap();
    (client, seat)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_build_bad_roster_fails_before_binding() {
    let result = WerewolfServer::builder()
        .bind("127.0.0.1:0")
        .roster_json(r#"{"Villager": 4}"#)
        .build()
        .await;
    assert!(matches!(
        result,
        Err(WerewolfError::Game(GameError::Configuration(_)))
    ));

    let result = WerewolfServer::builder().preset(7).build().await;
    assert!(matches!(
        result,
        Err(WerewolfError::Game(GameError::Configuration(_)))
    ));

    let result = WerewolfServer::builder().assignment(Vec::new()).build().await;
    assert!(matches!(
        result,
        Err(WerewolfError::Game(GameError::Configuration(_)))
    ));
}

#[tokio::test]
async fn test_build_unbindable_address_is_transport_error() {
    let result = WerewolfServer::builder()
        .bind("not an address")
        .preset(6)
        .build()
        .await;
    assert!(matches!(result, Err(WerewolfError::Transport(_))));
}

#[tokio::test]
async fn test_handshake_seats_players_in_join_order() {
    let (addr, shutdown, handle) = start_server(Duration::from_secs(2)).await;

    let (_first, seat) = join(&addr).await;
    assert_eq!(seat, 1);
    let (_second, seat) = join(&addr).await;
    assert_eq!(seat, 2);

    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, None);
}

#[tokio::test]
async fn test_handshake_ignores_packets_before_establish() {
    let (addr, shutdown, _handle) = start_server(Duration::from_secs(2)).await;

    let client = TcpConnection::connect(&addr).await.unwrap();
    send(&client, PacketKind::DeathNotice).await;
    assert!(recv(&client, Duration::from_millis(200)).await.is_none());

    send(&client, PacketKind::Establish).await;
    let reply = recv(&client, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply.int("seat"), Some(1));
    assert_eq!(reply.int("identity"), Some(RoleKind::Wolf.identity()));
    shutdown.cancel();
}

#[tokio::test]
async fn test_handshake_silent_client_is_dropped_without_a_seat() {
    let (addr, shutdown, _handle) = start_server(Duration::from_millis(200)).await;

    let silent = TcpConnection::connect(&addr).await.unwrap();
    let closed = tokio::time::timeout(Duration::from_secs(2), silent.recv())
        .await
        .expect("server hangs up after the handshake timeout");
    assert!(matches!(closed, Ok(None) | Err(_)));

    // The silent client never took a seat.
    let (_client, seat) = join(&addr).await;
    assert_eq!(seat, 1);
    shutdown.cancel();
}

#[tokio::test]
async fn test_run_until_cancel_during_game_returns_none() {
    let (addr, shutdown, handle) = start_server(Duration::from_secs(2)).await;

    let mut clients = Vec::new();
    for expected in 1..=3 {
        let (client, seat) = join(&addr).await;
        assert_eq!(seat, expected);
        clients.push(client);
    }
    // The game has started: the first broadcast arrives.
    let opening = recv(&clients[0], Duration::from_secs(2)).await.unwrap();
    assert_eq!(opening.kind(), PacketKind::Announcement);

    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, None);
}
