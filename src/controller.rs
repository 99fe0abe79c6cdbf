//! The single owner of connection state.
//!
//! User intents (`connect`, `send_ping`, ...) and transport events
//! (`handle_event`) both come through here. The only outputs are writes on
//! the transport handle and mutations of [`View`].
//!
//! Phases move `Idle -> Connecting -> Open -> Closed`, and from `Closed`
//! back to `Connecting` when the user connects again.

use std::time::Instant;

use url::Url;

use crate::clock::{Clock, SystemClock, Ticker};
use crate::error::ClientError;
use crate::model::{
    format_elapsed, Actions, Category, InboundKind, InboundMessage, LogEntry, OutboundKind,
    OutboundMessage, Payload, Status, View, PLACEHOLDER,
};
use crate::transport::{
    ConnectionId, Connector, Envelope, Transport, TransportEvent, CLOSE_GOING_AWAY, CLOSE_NORMAL,
};

pub const PING_TEXT: &str = "Ping test";
pub const TEST_TEXT: &str = "This is a test message!";
pub const DISCONNECT_REASON: &str = "Disconnect requested by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Open,
    Closed,
}

pub struct ConnectionController<C: Connector, K: Clock = SystemClock> {
    connector: C,
    clock: K,
    url: Url,
    phase: Phase,
    handle: Option<(ConnectionId, C::Handle)>,
    /// Connections whose handle was dropped but whose close is still expected.
    retired: Vec<ConnectionId>,
    next_id: u64,
    started_at: Option<Instant>,
    ticker: Option<Ticker>,
    ping_sent_at: Option<Instant>,
    view: View,
}

impl<C: Connector> ConnectionController<C> {
    pub fn new(connector: C, url: Url) -> Self {
        Self::with_clock(connector, url, SystemClock)
    }
}

impl<C: Connector, K: Clock> ConnectionController<C, K> {
    pub fn with_clock(connector: C, url: Url, clock: K) -> Self {
        let mut controller = Self {
            connector,
            clock,
            url,
            phase: Phase::Idle,
            handle: None,
            retired: Vec::new(),
            next_id: 1,
            started_at: None,
            ticker: None,
            ping_sent_at: None,
            view: View::default(),
        };
        controller.push_log("🚀 Ready. Press 'c' to connect.", Category::System);
        controller
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Ids still owed a close event: the live one plus any retired ones.
    pub fn pending(&self) -> Vec<ConnectionId> {
        let mut ids = self.retired.clone();
        if let Some((id, _)) = &self.handle {
            ids.push(*id);
        }
        ids
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.view.input
    }

    pub fn connect(&mut self) {
        match self.phase {
            Phase::Open if self.handle.is_some() => {
                self.push_log("⚠️ Already connected!", Category::System);
                return;
            }
            Phase::Connecting => {
                self.push_log("⏳ Connection attempt already in progress", Category::System);
                return;
            }
            _ => {}
        }

        self.phase = Phase::Connecting;
        self.set_status(Status::Connecting, "⏳ Connecting...");

        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        tracing::info!(%id, url = %self.url, "connect requested");

        match self.connector.open(&self.url, id) {
            Ok(handle) => self.handle = Some((id, handle)),
            Err(err) => {
                tracing::warn!(%id, error = %err, "could not start connection");
                self.phase = Phase::Closed;
                self.set_status(Status::Disconnected, "❌ Failed to connect");
                self.push_log(format!("🚨 Error: {}", err), Category::Error);
            }
        }
    }

    pub fn disconnect(&mut self) {
        if let Some((id, mut handle)) = self.handle.take() {
            tracing::info!(%id, "disconnect requested");
            handle.close(CLOSE_NORMAL, DISCONNECT_REASON);
            self.retired.push(id);
        }
    }

    /// Closes any live handle. Called once on the way out.
    pub fn dispose(&mut self) {
        if let Some((id, mut handle)) = self.handle.take() {
            tracing::info!(%id, "disposing open connection");
            handle.close(CLOSE_GOING_AWAY, "Client shutting down");
            self.retired.push(id);
        }
        self.stop_ticker();
    }

    pub fn handle_event(&mut self, envelope: Envelope) {
        let Envelope { id, event } = envelope;
        let current = self.handle.as_ref().map(|(live, _)| *live) == Some(id);
        let retired = self.retired.contains(&id);

        if !current && !retired {
            tracing::debug!(%id, ?event, "event for unknown connection dropped");
            return;
        }

        match event {
            TransportEvent::Open if current => self.on_open(),
            TransportEvent::Open => tracing::debug!(%id, "late open for retired connection"),
            TransportEvent::Message(raw) => self.on_message(&raw),
            TransportEvent::Error(detail) if current => self.on_error(&detail),
            TransportEvent::Error(detail) => {
                tracing::debug!(%id, %detail, "error on retired connection")
            }
            TransportEvent::Close { code, reason, clean } => {
                self.retired.retain(|r| *r != id);
                if current {
                    self.handle = None;
                }
                if current || self.handle.is_none() {
                    self.on_close(code, &reason, clean);
                } else {
                    tracing::debug!(%id, code, "retired connection closed behind a newer one");
                }
            }
        }
    }

    fn on_open(&mut self) {
        let now = self.clock.now();
        self.phase = Phase::Open;
        self.started_at = Some(now);
        self.ticker = Some(Ticker::start(now));
        tracing::info!(url = %self.url, "connected");

        self.set_status(Status::Connected, "✅ Connected to WebSocket!");
        self.push_log("🎉 Connected successfully!", Category::System);
    }

    fn on_message(&mut self, raw: &str) {
        tracing::debug!(bytes = raw.len(), "message received");
        let Some(msg) = InboundMessage::decode(raw) else {
            self.push_log(format!("📨 Message (text): {}", raw), Category::Received);
            return;
        };
        tracing::debug!(kind = ?msg.kind, timestamp = msg.timestamp().as_deref(), "decoded");
        let text = msg.text();

        match msg.kind {
            InboundKind::Connection => self.push_log(format!("🔗 {}", text), Category::Received),
            InboundKind::Pong => match self.ping_sent_at {
                Some(sent_at) => {
                    let rtt = self.clock.now().saturating_duration_since(sent_at);
                    self.view.last_ping = Some(rtt);
                    self.push_log(
                        format!("🏓 {} ({}ms)", text, rtt.as_millis()),
                        Category::Received,
                    );
                }
                None => self.push_log(format!("🏓 {}", text), Category::Received),
            },
            InboundKind::Echo => self.push_log(format!("📢 {}", text), Category::Received),
            InboundKind::Broadcast => {
                let line = match msg.sender() {
                    Some(sender) => format!("📡 {} [{}]", text, sender),
                    None => format!("📡 {}", text),
                };
                self.push_log(line, Category::Received);
            }
            InboundKind::Periodic => self.push_log(format!("⏰ {}", text), Category::System),
            InboundKind::Text | InboundKind::Message | InboundKind::Other => {
                self.push_log(format!("📨 {}", text), Category::Received)
            }
        }
    }

    fn on_close(&mut self, code: u16, reason: &str, clean: bool) {
        let uptime = self
            .started_at
            .take()
            .map(|at| self.clock.now().saturating_duration_since(at));
        tracing::info!(code, reason, clean, ?uptime, "connection closed");
        self.phase = Phase::Closed;
        self.stop_ticker();
        self.set_status(Status::Disconnected, "❌ Disconnected");

        if clean {
            self.push_log(
                format!("👋 Connection closed normally (code: {})", code),
                Category::System,
            );
        } else {
            self.push_log(format!("💥 Connection lost (code: {})", code), Category::Error);
        }
    }

    fn on_error(&mut self, detail: &str) {
        tracing::warn!(%detail, "transport error");
        if let Some((id, _)) = self.handle.take() {
            self.retired.push(id);
        }
        self.phase = Phase::Closed;
        self.stop_ticker();
        self.set_status(Status::Disconnected, "❌ Connection error");
        self.push_log("🚨 WebSocket connection error", Category::Error);
    }

    pub fn send(&mut self, payload: Payload) -> bool {
        if self.phase != Phase::Open || self.handle.is_none() {
            self.push_log("⚠️ WebSocket is not connected!", Category::Error);
            return false;
        }

        let result = match self.handle.as_mut() {
            Some((_, handle)) => payload.encode().and_then(|text| handle.send(text)),
            None => Err(ClientError::TransportClosed),
        };
        match result {
            Ok(()) => {
                self.push_log(format!("📤 Sent: {}", payload.summary()), Category::Sent);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "send failed");
                self.push_log(format!("🚨 Send failed: {}", err), Category::Error);
                false
            }
        }
    }

    pub fn send_ping(&mut self) -> bool {
        self.ping_sent_at = Some(self.clock.now());
        let msg = OutboundMessage::new(OutboundKind::Ping, PING_TEXT, self.clock.utc());
        self.send(Payload::Structured(msg))
    }

    pub fn send_test(&mut self) -> bool {
        let msg = OutboundMessage::new(OutboundKind::Echo, TEST_TEXT, self.clock.utc());
        self.send(Payload::Structured(msg))
    }

    /// Sends `text` as a broadcast and clears the input. Blank text only warns.
    pub fn send_custom(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            self.push_log("⚠️ Type a message first!", Category::Error);
            return false;
        }

        let msg = OutboundMessage::new(OutboundKind::Broadcast, text, self.clock.utc());
        let sent = self.send(Payload::Structured(msg));
        self.view.input.clear();
        sent
    }

    pub fn submit_input(&mut self) -> bool {
        let text = self.view.input.clone();
        self.send_custom(&text)
    }

    pub fn clear_log(&mut self) {
        self.view.log.clear();
        self.view.message_count = 0;
    }

    /// Refreshes the elapsed-time display when a second has passed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if let Some(elapsed) = self.ticker.as_mut().and_then(|t| t.poll(now)) {
            self.view.elapsed = format_elapsed(elapsed);
        }
    }

    fn stop_ticker(&mut self) {
        self.ticker = None;
        self.view.elapsed = PLACEHOLDER.to_string();
    }

    fn set_status(&mut self, status: Status, label: &str) {
        self.view.status = status;
        self.view.status_label = label.to_string();
        self.view.actions = Actions::new(self.phase == Phase::Open, self.phase == Phase::Connecting);
    }

    fn push_log(&mut self, text: impl Into<String>, category: Category) {
        self.view.log.push(LogEntry {
            text: text.into(),
            category,
            at: self.clock.local(),
        });
        self.view.message_count += 1;
    }
}
