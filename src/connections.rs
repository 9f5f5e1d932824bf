//! Named WebSocket connections tracked for the lifetime of the session.
//!
//! Each connection is `absent -> connecting -> open -> closed/absent`. The
//! registry entry appears only once the handshake succeeds, and `close`
//! releases the channel before removing the entry, so no command can observe
//! a registered name bound to a dead channel.

use anyhow::anyhow;
use colored::Colorize;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::errors::{CommandError, CommandResult};
use crate::logger::Logger;
use crate::utils::sanitize_text;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open connection: the write half plus the background reader task.
struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
}

/// Insertion-ordered registry of named connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Vec<(String, WsConnection)>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { connections: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.iter().any(|(n, _)| n == name)
    }

    /// Connection names in the order they were opened.
    pub fn names(&self) -> Vec<&str> {
        self.connections.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Open a connection and register it under `name`. On any failure the
    /// registry is left unchanged — no partial entries.
    pub async fn connect(
        &mut self,
        name: &str,
        url: &str,
        timeout: Duration,
        logger: Logger,
    ) -> CommandResult {
        if self.contains(name) {
            return Err(CommandError::Conflict(format!(
                "A connection named \"{}\" already exists. Close it with 'ws close {}' first.",
                name, name
            )));
        }

        let handshake = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| CommandError::Timeout {
                what: format!("ws connect to {}", url),
                secs: timeout.as_secs(),
            })?;

        let (stream, _response) =
            handshake.map_err(|e| anyhow!("Failed to connect: {}", e))?;
        let (sink, source) = stream.split();

        let reader = tokio::spawn(read_loop(name.to_string(), source, logger));

        self.connections.push((
            name.to_string(),
            WsConnection { sink, reader },
        ));
        Ok(format!("Connected to {} as \"{}\"", url, name))
    }

    /// Forward a message over the named channel. Fire-and-forget: no
    /// acknowledgment or backpressure is surfaced.
    pub async fn send(&mut self, name: &str, message: &str) -> CommandResult {
        let conn = self
            .connection_mut(name)
            .ok_or_else(|| CommandError::NotFound(format!("No connection named \"{}\"", name)))?;

        conn.sink
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| anyhow!("Failed to send message: {}", e))?;
        Ok(format!("Message sent to {}", name))
    }

    /// Release the channel, then remove the registry entry.
    pub async fn close(&mut self, name: &str) -> CommandResult {
        let index = self
            .connections
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| CommandError::NotFound(format!("No connection named \"{}\"", name)))?;

        {
            let conn = &mut self.connections[index].1;
            // A close error means the peer already went away; the entry is
            // removed either way.
            let _ = conn.sink.close().await;
            conn.reader.abort();
        }
        self.connections.remove(index);
        Ok(format!("Closed connection \"{}\"", name))
    }

    /// Close every connection. Used at session teardown.
    pub async fn close_all(&mut self) {
        for (_, conn) in self.connections.iter_mut() {
            let _ = conn.sink.close().await;
            conn.reader.abort();
        }
        self.connections.clear();
    }

    fn connection_mut(&mut self, name: &str) -> Option<&mut WsConnection> {
        self.connections
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }
}

/// Background reader for one connection. Logs and relays incoming frames to
/// the console; never touches the transcript or the stores.
async fn read_loop(name: String, mut source: SplitStream<WsStream>, logger: Logger) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(data)) => {
                let clean = sanitize_text(&data);
                let _ = logger.log_ws_message(&name, &clean);
                println!("{}", format!("[{}] Received: {}", name, clean).dimmed());
            }
            Ok(Message::Binary(data)) => {
                let note = format!("<{} binary bytes>", data.len());
                let _ = logger.log_ws_message(&name, &note);
                println!("{}", format!("[{}] Received: {}", name, note).dimmed());
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // ping/pong handled by the library
        }
    }
    let _ = logger.log(&format!("WS CLOSED [{}]", name));
}
