//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use wshub_api::AppState;
use wshub_core::AppResult;
use wshub_core::config::AppConfig;
use wshub_core::config::hub::HubConfig;
use wshub_realtime::Hub;

/// Client side of a test WebSocket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server bound to an ephemeral local port.
pub struct TestServer {
    /// Bound address
    pub addr: SocketAddr,
    /// The hub behind the server
    pub hub: Hub,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<AppResult<()>>,
}

impl TestServer {
    /// Start a server whose hub admits at most `capacity` clients.
    pub async fn start(capacity: usize) -> Self {
        let config = AppConfig {
            hub: HubConfig {
                capacity,
                ..HubConfig::default()
            },
            ..AppConfig::default()
        };
        let hub = Hub::new(config.hub.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let (tx, rx) = oneshot::channel::<()>();
        let state = AppState::new(config, hub.clone());
        let task = tokio::spawn(wshub_api::serve(listener, state, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            hub,
            shutdown: Some(tx),
            task,
        }
    }

    /// WebSocket URL for `client_id`
    pub fn ws_url(&self, client_id: &str) -> String {
        format!("ws://{}/ws?client_id={}", self.addr, client_id)
    }

    /// Connect and wait until the hub has registered the client.
    pub async fn connect(&self, client_id: &str) -> WsClient {
        let (client, _) = connect_async(self.ws_url(client_id))
            .await
            .expect("WebSocket handshake failed");
        let hub = self.hub.clone();
        let id = client_id.to_string();
        wait_until(move || hub.is_registered(&id)).await;
        client
    }

    /// Stop accepting HTTP requests and wait for the server task.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .expect("Server task panicked")
            .expect("Server failed");
    }
}

/// Poll `condition` until it holds, failing after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Condition not met within 5s");
}

/// Next data or close message, skipping pings and pongs.
pub async fn next_message(client: &mut WsClient) -> Option<Message> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for a message");
        match next {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(message)) => return Some(message),
            Some(Err(_)) | None => return None,
        }
    }
}

/// Next text message.
pub async fn next_text(client: &mut WsClient) -> String {
    match next_message(client).await {
        Some(message) => message
            .to_text()
            .expect("Expected a text message")
            .to_string(),
        None => panic!("Connection closed before a text message arrived"),
    }
}
