use std::sync::mpsc::Sender;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use crate::error::ClientError;
use crate::transport::{
    ConnectionId, Connector, Envelope, Transport, TransportEvent, CLOSE_ABNORMAL,
    CLOSE_GOING_AWAY, CLOSE_NO_STATUS,
};

/// How long a sent or received close frame may wait for the socket to finish.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug)]
enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// Opens tokio-tungstenite connections, one task each, reporting on `events`.
pub struct WsConnector {
    events: Sender<Envelope>,
}

impl WsConnector {
    pub fn new(events: Sender<Envelope>) -> Self {
        Self { events }
    }
}

/// Write side of a running connection task. Dropping it closes the socket.
#[derive(Debug)]
pub struct WsHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl Connector for WsConnector {
    type Handle = WsHandle;

    fn open(&mut self, url: &Url, id: ConnectionId) -> Result<WsHandle, ClientError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        }
        let runtime = tokio::runtime::Handle::try_current()?;

        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_connection(url.clone(), id, rx, self.events.clone()));

        Ok(WsHandle { commands: tx })
    }
}

impl Transport for WsHandle {
    fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.commands
            .send(Command::Send(text))
            .map_err(|_| ClientError::TransportClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        let _ = self.commands.send(Command::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

fn emit(events: &Sender<Envelope>, id: ConnectionId, event: TransportEvent) {
    // The receiver only goes away on shutdown.
    let _ = events.send(Envelope { id, event });
}

async fn run_connection(
    url: Url,
    id: ConnectionId,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: Sender<Envelope>,
) {
    tracing::info!(%id, %url, "connecting");

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, response)) => {
            tracing::info!(%id, status = %response.status(), "handshake complete");
            socket
        }
        Err(err) => {
            tracing::warn!(%id, error = %err, "connection failed");
            emit(&events, id, TransportEvent::Error(err.to_string()));
            emit(
                &events,
                id,
                TransportEvent::Close {
                    code: CLOSE_ABNORMAL,
                    reason: String::new(),
                    clean: false,
                },
            );
            return;
        }
    };
    emit(&events, id, TransportEvent::Open);

    let (mut sink, mut stream) = socket.split();
    let mut commands_open = true;
    let mut close_sent = false;
    let mut peer_close: Option<Option<CloseFrame>> = None;
    let mut failure: Option<WsError> = None;
    let mut close_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                tracing::warn!(%id, "close handshake timed out");
                break;
            }
            command = commands.recv(), if commands_open => match command {
                Some(Command::Send(text)) => {
                    tracing::debug!(%id, bytes = text.len(), "sending text frame");
                    if let Err(err) = sink.send(Message::text(text)).await {
                        tracing::warn!(%id, error = %err, "send failed");
                    }
                }
                Some(Command::Close { code, reason }) => {
                    if !close_sent {
                        close_sent = true;
                        close_deadline.get_or_insert_with(|| Instant::now() + CLOSE_TIMEOUT);
                        tracing::info!(%id, code, %reason, "closing");
                        let frame = CloseFrame { code: CloseCode::from(code), reason: reason.into() };
                        if let Err(err) = sink.send(Message::Close(Some(frame))).await {
                            tracing::debug!(%id, error = %err, "close frame not sent");
                        }
                    }
                }
                None => {
                    commands_open = false;
                    if !close_sent {
                        close_sent = true;
                        close_deadline.get_or_insert_with(|| Instant::now() + CLOSE_TIMEOUT);
                        tracing::info!(%id, "handle dropped, closing");
                        let frame = CloseFrame { code: CloseCode::from(CLOSE_GOING_AWAY), reason: String::new().into() };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                    }
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, id, TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    emit(&events, id, TransportEvent::Message(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(%id, ?frame, "close frame received");
                    peer_close = Some(frame);
                    close_deadline.get_or_insert_with(|| Instant::now() + CLOSE_TIMEOUT);
                }
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => break,
                Some(Err(err)) => {
                    failure = Some(err);
                    break;
                }
            }
        }
    }

    let event = match (failure, peer_close) {
        (None, Some(frame)) => {
            let (code, reason) = match frame {
                Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                None => (CLOSE_NO_STATUS, String::new()),
            };
            tracing::info!(%id, code, "closed cleanly");
            TransportEvent::Close { code, reason, clean: true }
        }
        (failure, _) => {
            if let Some(err) = failure {
                tracing::warn!(%id, error = %err, "connection dropped");
                emit(&events, id, TransportEvent::Error(err.to_string()));
            } else {
                tracing::warn!(%id, "stream ended without a close frame");
            }
            TransportEvent::Close {
                code: CLOSE_ABNORMAL,
                reason: String::new(),
                clean: false,
            }
        }
    };
    emit(&events, id, event);
}
