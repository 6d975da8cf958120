//! Integration tests for seat assignment and activation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use werewolf_game::{GameConfig, GameError, GamePhase, GameStatus, Lobby, RoleRoster};
use werewolf_protocol::{Codec, JsonCodec, PacketKind, Seat};
use werewolf_session::{Peer, RoleKind, Signal};
use werewolf_transport::{Connection, TcpConnection, TcpTransport, Transport};

struct Table {
    transport: TcpTransport,
    signals_tx: mpsc::UnboundedSender<Signal>,
    signals_rx: Option<mpsc::UnboundedReceiver<Signal>>,
}

impl Table {
    async fn new() -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            transport: TcpTransport::bind("127.0.0.1:0").await.unwrap(),
            signals_tx,
            signals_rx: Some(signals_rx),
        }
    }

    /// Connects a client and returns (server-side peer, client end).
    async fn join(&mut self) -> (Arc<Peer>, TcpConnection) {
        let addr = self.transport.local_addr().unwrap();
        let client = TcpConnection::connect(addr).await.unwrap();
        let conn = self.transport.accept().await.unwrap();
        let peer = Peer::spawn(conn, Arc::new(JsonCodec), self.signals_tx.clone());
        (peer, client)
    }
}

async fn next_packet(client: &TcpConnection) -> werewolf_protocol::Packet {
    let frame = tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("packet in time")
        .unwrap()
        .expect("open");
    JsonCodec.decode(&frame).unwrap()
}

fn six_player_deal() -> Vec<RoleKind> {
    use RoleKind::*;
    vec![Wolf, Villager, Villager, Witch, Predictor, Wolf]
}

#[tokio::test]
async fn test_admit_assigns_lowest_seat_and_sends_identity() {
    let mut table = Table::new().await;
    let mut lobby = Lobby::with_assignment(six_player_deal(), GameConfig::default());
    assert_eq!(lobby.capacity(), 6);
    assert!(lobby.is_empty());

    let (peer, client) = table.join().await;
    assert_eq!(lobby.admit(peer).unwrap(), Seat(1));
    let packet = next_packet(&client).await;
    assert_eq!(packet.kind(), PacketKind::EstablishResponse);
    assert_eq!(packet.int("seat"), Some(1));
    assert_eq!(packet.int("identity"), Some(RoleKind::Wolf.identity()));

    let (peer, client) = table.join().await;
    assert_eq!(lobby.admit(peer).unwrap(), Seat(2));
    let packet = next_packet(&client).await;
    assert_eq!(packet.int("identity"), Some(0));
    assert_eq!(lobby.len(), 2);
}

#[tokio::test]
async fn test_admit_full_lobby_is_rejected() {
    let mut table = Table::new().await;
    let mut lobby = Lobby::with_assignment(
        vec![RoleKind::Villager, RoleKind::Wolf],
        GameConfig::default(),
    );
    let mut clients = Vec::new();
    for _ in 0..2 {
        let (peer, client) = table.join().await;
        lobby.admit(peer).unwrap();
        clients.push(client);
    }
    assert!(lobby.is_full());

    let (peer, _client) = table.join().await;
    assert!(matches!(lobby.admit(peer), Err(GameError::LobbyFull(2))));
}

#[tokio::test]
async fn test_admit_frees_seat_of_disconnected_client() {
    let mut table = Table::new().await;
    let mut lobby = Lobby::with_assignment(six_player_deal(), GameConfig::default());

    let (first, first_client) = table.join().await;
    lobby.admit(first).unwrap();
    let (second, _second_client) = table.join().await;
    lobby.admit(second).unwrap();

    first_client.close().await.unwrap();
    drop(first_client);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (third, third_client) = table.join().await;
    assert_eq!(lobby.admit(third).unwrap(), Seat(1));
    let packet = next_packet(&third_client).await;
    assert_eq!(packet.int("seat"), Some(1));
}

#[tokio::test]
async fn test_activate_not_ready_then_already_active() {
    let mut table = Table::new().await;
    let mut lobby = Lobby::with_assignment(
        vec![RoleKind::Villager, RoleKind::Wolf, RoleKind::Wolf],
        GameConfig::default(),
    );

    let (peer, _c1) = table.join().await;
    lobby.admit(peer).unwrap();
    let (signals_tx, signals_rx) = mpsc::unbounded_channel::<Signal>();
    drop(signals_tx);
    assert!(matches!(
        lobby.activate(signals_rx),
        Err(GameError::NotReady {
            filled: 1,
            capacity: 3
        })
    ));

    let (peer, _c2) = table.join().await;
    lobby.admit(peer).unwrap();
    let (peer, _c3) = table.join().await;
    lobby.admit(peer).unwrap();

    let game = lobby
        .activate(table.signals_rx.take().unwrap())
        .expect("full lobby activates");
    assert_eq!(game.phase(), GamePhase::PreGame);
    assert_eq!(game.status(), GameStatus::Ongoing);
    assert_eq!(game.active().len(), 3);

    // Both wolves know each other, the villager has no pack.
    assert_eq!(game.player(Seat(1)).unwrap().pack_len(), 0);
    assert_eq!(game.player(Seat(2)).unwrap().pack_len(), 1);
    assert_eq!(game.player(Seat(3)).unwrap().pack_len(), 1);

    let (peer, _c4) = table.join().await;
    assert!(matches!(lobby.admit(peer), Err(GameError::AlreadyActive)));
    let (_tx, rx) = mpsc::unbounded_channel::<Signal>();
    assert!(matches!(lobby.activate(rx), Err(GameError::AlreadyActive)));
}

#[tokio::test]
async fn test_new_deals_the_whole_roster() {
    let mut table = Table::new().await;
    let roster = RoleRoster::preset(6).unwrap();
    let mut lobby = Lobby::new(&roster, GameConfig::default()).seeded(11);

    let mut identities = Vec::new();
    let mut clients = Vec::new();
    for _ in 0..6 {
        let (peer, client) = table.join().await;
        lobby.admit(peer).unwrap();
        identities.push(next_packet(&client).await.int("identity").unwrap());
        clients.push(client);
    }
    identities.sort();
    // 2 wolves (-1), 2 villagers (0), predictor (1), witch (2).
    assert_eq!(identities, vec![-1, -1, 0, 0, 1, 2]);
}
