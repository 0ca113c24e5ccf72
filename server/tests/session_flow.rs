//! End-to-end session scenarios over a real WebSocket listener.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use tandem_server::protocol::{ControlBroadcast, SyncSnapshot};
use tandem_server::{
    transport, ClientEvent, Gateway, ManualClock, PlaybackAction, Role, RoomRegistry, ServerEvent,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    clock: Arc<ManualClock>,
    gateway: Arc<Gateway>,
}

impl TestServer {
    async fn start() -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let registry = Arc::new(RoomRegistry::new(clock.clone()));
        let gateway = Arc::new(Gateway::new(registry));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(transport::serve(listener, gateway.clone()));

        Self {
            addr,
            clock,
            gateway,
        }
    }

    fn create_room(&self) -> String {
        self.gateway.registry().create()
    }

    async fn connect(&self) -> Ws {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("websocket connect");
        ws
    }

    /// Wait for the server side to catch up with a close or other async step.
    async fn wait_until(&self, what: &str, check: impl Fn(&Gateway) -> bool) {
        for _ in 0..200 {
            if check(&self.gateway) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }
}

async fn send(ws: &mut Ws, event: ClientEvent) {
    let json = serde_json::to_string(&event).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn recv(ws: &mut Ws) -> ServerEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for server event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("server event");
        }
    }
}

async fn join(ws: &mut Ws, room_id: &str, as_host: bool) {
    send(
        ws,
        ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            as_host,
        },
    )
    .await;
}

async fn control(ws: &mut Ws, room_id: &str, action: PlaybackAction, current_time: f64) {
    send(
        ws,
        ClientEvent::Control {
            room_id: room_id.to_string(),
            action,
            current_time,
        },
    )
    .await;
}

async fn request_sync(ws: &mut Ws, room_id: &str) {
    send(
        ws,
        ClientEvent::RequestSync {
            room_id: room_id.to_string(),
        },
    )
    .await;
}

fn expect_sync(event: ServerEvent) -> SyncSnapshot {
    match event {
        ServerEvent::SyncState(snapshot) => snapshot,
        other => panic!("expected sync-state, got {other:?}"),
    }
}

/// Host and guest both joined; guest's initial snapshot already consumed.
async fn hosted_pair(server: &TestServer, room_id: &str) -> (Ws, Ws) {
    let mut host = server.connect().await;
    join(&mut host, room_id, true).await;
    assert_eq!(recv(&mut host).await, ServerEvent::Role { role: Role::Host });

    let mut guest = server.connect().await;
    join(&mut guest, room_id, false).await;
    assert_eq!(recv(&mut guest).await, ServerEvent::Role { role: Role::Guest });
    expect_sync(recv(&mut guest).await);

    (host, guest)
}

#[tokio::test]
async fn play_broadcast_and_unauthorized_pause() {
    let server = TestServer::start().await;
    let room_id = server.create_room();
    let (mut host, mut guest) = hosted_pair(&server, &room_id).await;

    server.clock.set(10_000);
    control(&mut host, &room_id, PlaybackAction::Play, 10.0).await;

    let expected = ServerEvent::Control(ControlBroadcast {
        action: PlaybackAction::Play,
        current_time: 10.0,
        server_time: 10_000,
        playing: true,
    });
    assert_eq!(recv(&mut host).await, expected);
    assert_eq!(recv(&mut guest).await, expected);

    server.clock.set(15_000);
    control(&mut guest, &room_id, PlaybackAction::Pause, 15.0).await;

    server.clock.set(20_000);
    request_sync(&mut guest, &room_id).await;
    let snapshot = expect_sync(recv(&mut guest).await);
    assert!(snapshot.state.playing);
    assert_eq!(snapshot.state.position, 10.0);
    assert_eq!(snapshot.state.last_update_at, 10_000);
    assert_eq!(snapshot.server_time, 20_000);

    let host_id = server.gateway.registry().get(&room_id).unwrap().host_id();
    assert_eq!(snapshot.host_socket_id, host_id);
    assert!(host_id.is_some());

    request_sync(&mut host, &room_id).await;
    expect_sync(recv(&mut host).await);
}

#[tokio::test]
async fn third_connection_is_turned_away() {
    let server = TestServer::start().await;
    let room_id = server.create_room();
    let (_host, _guest) = hosted_pair(&server, &room_id).await;

    let mut third = server.connect().await;
    join(&mut third, &room_id, true).await;
    assert_eq!(
        recv(&mut third).await,
        ServerEvent::RoomError {
            message: "Room is full".into()
        }
    );
    assert_eq!(
        server.gateway.registry().get(&room_id).unwrap().member_count(),
        2
    );
}

#[tokio::test]
async fn guest_inherits_host_when_host_leaves() {
    let server = TestServer::start().await;
    let room_id = server.create_room();
    let (mut host, mut guest) = hosted_pair(&server, &room_id).await;

    host.close(None).await.unwrap();
    assert_eq!(recv(&mut guest).await, ServerEvent::Role { role: Role::Host });

    server.clock.set(30_000);
    control(&mut guest, &room_id, PlaybackAction::Seek, 95.5).await;
    assert_eq!(
        recv(&mut guest).await,
        ServerEvent::Control(ControlBroadcast {
            action: PlaybackAction::Seek,
            current_time: 95.5,
            server_time: 30_000,
            playing: false,
        })
    );
}

#[tokio::test]
async fn room_is_gone_after_everyone_leaves() {
    let server = TestServer::start().await;
    let room_id = server.create_room();
    let (mut host, mut guest) = hosted_pair(&server, &room_id).await;

    guest.close(None).await.unwrap();
    host.close(None).await.unwrap();
    let id = room_id.clone();
    server
        .wait_until("room teardown", move |gw| !gw.registry().contains(&id))
        .await;

    let mut late = server.connect().await;
    join(&mut late, &room_id, false).await;
    assert_eq!(
        recv(&mut late).await,
        ServerEvent::RoomError {
            message: "Room not found".into()
        }
    );
}

#[tokio::test]
async fn request_sync_for_unknown_room_is_ignored() {
    let server = TestServer::start().await;
    let room_id = server.create_room();

    let mut ws = server.connect().await;
    request_sync(&mut ws, "no-such-room").await;
    join(&mut ws, &room_id, false).await;
    assert_eq!(recv(&mut ws).await, ServerEvent::Role { role: Role::Host });
}
