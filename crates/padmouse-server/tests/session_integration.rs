//! End-to-end tests over real loopback TCP.
//!
//! Each test binds a listener on `127.0.0.1:0`, drives it with plain
//! `TcpStream` clients, and inspects the ordered call log of a
//! [`RecordingSink`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use padmouse_core::{encode_frame, MouseButton, PointerEvent};
use padmouse_server::application::admission::SessionPolicy;
use padmouse_server::application::translate_input::CursorSink;
use padmouse_server::infrastructure::cursor_sink::mock::{RecordingSink, SinkCall};
use padmouse_server::infrastructure::network::{ListenerSettings, ServerListener};
use padmouse_server::infrastructure::status::{ServerState, ServerStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    sink: Arc<RecordingSink>,
    status: watch::Receiver<ServerStatus>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(settings: ListenerSettings) -> Self {
        let sink = Arc::new(RecordingSink::new());
        let listener = ServerListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            settings,
            Arc::clone(&sink) as Arc<dyn CursorSink>,
        )
        .await
        .expect("bind loopback");
        let addr = listener.local_addr().unwrap();
        let status = listener.status();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(listener.run(Arc::clone(&running)));
        Self {
            addr,
            sink,
            status,
            running,
            task,
        }
    }

    async fn with_policy(policy: SessionPolicy) -> Self {
        Self::start(ListenerSettings {
            policy,
            ..ListenerSettings::default()
        })
        .await
    }

    async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.expect("connect")
    }

    /// Waits until the status satisfies `pred`.
    async fn wait_status(&mut self, pred: impl Fn(&ServerStatus) -> bool) -> ServerStatus {
        let status = timeout(WAIT, self.status.wait_for(|s| pred(s)))
            .await
            .expect("status condition not reached in time")
            .expect("status channel closed");
        status.clone()
    }

    /// Polls the sink until `pred` holds on its call log.
    async fn wait_calls(&self, pred: impl Fn(&[SinkCall]) -> bool) -> Vec<SinkCall> {
        let deadline = Instant::now() + WAIT;
        loop {
            let calls = self.sink.calls();
            if pred(&calls) {
                return calls;
            }
            assert!(Instant::now() < deadline, "sink condition not reached: {calls:?}");
            sleep(Duration::from_millis(10)).await;
        }
    }

    async fn stop(self) -> Arc<RecordingSink> {
        self.running.store(false, Ordering::Relaxed);
        timeout(WAIT, self.task)
            .await
            .expect("listener did not stop")
            .expect("listener task panicked");
        self.sink
    }
}

fn frames(events: &[PointerEvent]) -> Vec<u8> {
    events.iter().flat_map(|e| encode_frame(e).unwrap()).collect()
}

fn press(button: MouseButton) -> PointerEvent {
    PointerEvent::Button {
        button,
        pressed: true,
    }
}

fn pressed(button: MouseButton) -> SinkCall {
    SinkCall::SetButton {
        button,
        pressed: true,
    }
}

fn released(button: MouseButton) -> SinkCall {
    SinkCall::SetButton {
        button,
        pressed: false,
    }
}

/// Reads until EOF; the server closing our socket.
async fn expect_closed_by_server(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    let n = timeout(WAIT, stream.read(&mut buf))
        .await
        .expect("server did not close the connection")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

// ── Teardown ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_press_then_eof_releases_exactly_once() {
    // Arrange
    let mut server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut client = server.connect().await;

    // Act
    client.write_all(&frames(&[press(MouseButton::Left)])).await.unwrap();
    server.wait_calls(|c| c.contains(&pressed(MouseButton::Left))).await;
    drop(client);
    let status = server.wait_status(|s| s.last_close.is_some()).await;

    // Assert
    let sink = server.stop().await;
    assert_eq!(sink.release_count(MouseButton::Left), 1);
    assert_eq!(status.last_close.as_deref(), Some("peer closed the connection"));
}

#[tokio::test]
async fn test_corrupt_byte_closes_session_and_releases() {
    // Arrange
    let mut server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut client = server.connect().await;
    client.write_all(&frames(&[press(MouseButton::Right)])).await.unwrap();
    server.wait_calls(|c| c.contains(&pressed(MouseButton::Right))).await;

    // Act
    let mut garbage = vec![0x7F];
    garbage.extend(frames(&[press(MouseButton::Left)]));
    client.write_all(&garbage).await.unwrap();

    // Assert
    expect_closed_by_server(&mut client).await;
    let status = server.wait_status(|s| s.active_sessions == 0 && s.last_close.is_some()).await;
    assert!(status.last_close.unwrap().starts_with("decode fault"));
    let sink = server.stop().await;
    assert_eq!(sink.release_count(MouseButton::Right), 1);
    assert_eq!(sink.press_count(MouseButton::Left), 0);
}

#[tokio::test]
async fn test_idle_timeout_releases_held_button() {
    // Arrange
    let server = TestServer::start(ListenerSettings {
        idle_timeout: Duration::from_millis(300),
        ..ListenerSettings::default()
    })
    .await;
    let mut client = server.connect().await;

    // Act: press, then say nothing.
    client.write_all(&frames(&[press(MouseButton::Middle)])).await.unwrap();

    // Assert
    expect_closed_by_server(&mut client).await;
    server
        .wait_calls(|c| c.contains(&released(MouseButton::Middle)))
        .await;
    let sink = server.stop().await;
    assert_eq!(sink.release_count(MouseButton::Middle), 1);
}

#[tokio::test]
async fn test_shutdown_releases_buttons_of_active_sessions() {
    // Arrange
    let server = TestServer::with_policy(SessionPolicy::Concurrent).await;
    let mut client = server.connect().await;
    client.write_all(&frames(&[press(MouseButton::Left)])).await.unwrap();
    server.wait_calls(|c| c.contains(&pressed(MouseButton::Left))).await;

    // Act
    let mut status = server.status.clone();
    let sink = server.stop().await;

    // Assert
    assert_eq!(sink.release_count(MouseButton::Left), 1);
    assert_eq!(status.borrow_and_update().state, ServerState::Stopped);
    expect_closed_by_server(&mut client).await;
}

// ── Admission policies ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preempt_releases_old_owner_before_new_events() {
    // Arrange: first phone is mid-drag.
    let mut server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut first = server.connect().await;
    first.write_all(&frames(&[press(MouseButton::Left)])).await.unwrap();
    server.wait_calls(|c| c.contains(&pressed(MouseButton::Left))).await;

    // Act: a second connection arrives and moves the pointer.
    let mut second = server.connect().await;
    second
        .write_all(&frames(&[PointerEvent::Move { dx: 10.0, dy: 0.0 }]))
        .await
        .unwrap();
    let calls = server
        .wait_calls(|c| c.contains(&SinkCall::MoveRelative { dx: 10, dy: 0 }))
        .await;

    // Assert
    let release_at = calls
        .iter()
        .position(|c| *c == released(MouseButton::Left))
        .expect("old session's button released");
    let move_at = calls
        .iter()
        .position(|c| *c == SinkCall::MoveRelative { dx: 10, dy: 0 })
        .unwrap();
    assert!(release_at < move_at, "release must precede new events: {calls:?}");
    expect_closed_by_server(&mut first).await;
    let status = server.wait_status(|s| s.active_sessions == 1).await;
    assert_eq!(status.state, ServerState::Active);

    drop(second);
    server.stop().await;
}

#[tokio::test]
async fn test_reject_new_keeps_first_session() {
    // Arrange
    let mut server = TestServer::with_policy(SessionPolicy::RejectNew).await;
    let mut first = server.connect().await;
    first.write_all(&frames(&[PointerEvent::Ping])).await.unwrap();
    server.wait_status(|s| s.active_sessions == 1).await;

    // Act
    let mut second = server.connect().await;
    expect_closed_by_server(&mut second).await;
    first
        .write_all(&frames(&[PointerEvent::Move { dx: 2.0, dy: 3.0 }]))
        .await
        .unwrap();

    // Assert
    server
        .wait_calls(|c| c.contains(&SinkCall::MoveRelative { dx: 2, dy: 3 }))
        .await;
    let status = server.wait_status(|s| s.rejected_connections == 1).await;
    assert_eq!(status.active_sessions, 1);
    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_sessions_are_both_served() {
    // Arrange
    let server = TestServer::with_policy(SessionPolicy::Concurrent).await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    // Act
    a.write_all(&frames(&[PointerEvent::Move { dx: 1.0, dy: 0.0 }]))
        .await
        .unwrap();
    b.write_all(&frames(&[PointerEvent::Move { dx: 0.0, dy: 1.0 }]))
        .await
        .unwrap();

    // Assert
    server
        .wait_calls(|c| {
            c.contains(&SinkCall::MoveRelative { dx: 1, dy: 0 })
                && c.contains(&SinkCall::MoveRelative { dx: 0, dy: 1 })
        })
        .await;
    server.stop().await;
}

// ── Wire formats ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_legacy_json_client_is_served() {
    // Arrange
    let server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut client = server.connect().await;

    // Act
    client
        .write_all(
            b"{\"type\":\"move\",\"deltaX\":4,\"deltaY\":-4}\n{\"type\":\"click\",\"button\":\"right\"}\n",
        )
        .await
        .unwrap();

    // Assert
    let calls = server
        .wait_calls(|c| c.contains(&released(MouseButton::Right)))
        .await;
    assert_eq!(
        calls,
        vec![
            SinkCall::MoveRelative { dx: 4, dy: -4 },
            pressed(MouseButton::Right),
            released(MouseButton::Right),
        ]
    );
    server.stop().await;
}

#[tokio::test]
async fn test_frame_split_across_writes_is_applied() {
    // Arrange
    let server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut client = server.connect().await;
    client.set_nodelay(true).unwrap();
    let bytes = frames(&[PointerEvent::Move { dx: -6.0, dy: 2.0 }]);

    // Act
    client.write_all(&bytes[..5]).await.unwrap();
    client.flush().await.unwrap();
    sleep(Duration::from_millis(50)).await;
    client.write_all(&bytes[5..]).await.unwrap();

    // Assert
    server
        .wait_calls(|c| c.contains(&SinkCall::MoveRelative { dx: -6, dy: 2 }))
        .await;
    server.stop().await;
}

#[tokio::test]
async fn test_http_preamble_is_rejected() {
    let mut server = TestServer::with_policy(SessionPolicy::Preempt).await;
    let mut client = server.connect().await;

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

    expect_closed_by_server(&mut client).await;
    let status = server.wait_status(|s| s.last_close.is_some()).await;
    assert!(status.last_close.unwrap().contains("preamble"));
    let sink = server.stop().await;
    assert!(sink.calls().is_empty());
}
