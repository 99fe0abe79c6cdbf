//! Seam between the controller and whatever actually moves bytes.

use std::fmt;

use url::Url;

use crate::error::ClientError;

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
pub const CLOSE_NO_STATUS: u16 = 1005;
pub const CLOSE_ABNORMAL: u16 = 1006;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Close { code: u16, reason: String, clean: bool },
    Error(String),
}

/// A transport event tagged with the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: ConnectionId,
    pub event: TransportEvent,
}

pub trait Transport {
    fn send(&mut self, text: String) -> Result<(), ClientError>;
    fn close(&mut self, code: u16, reason: &str);
}

/// Starts a connection. Progress is reported later as [`Envelope`]s for `id`.
pub trait Connector {
    type Handle: Transport;

    fn open(&mut self, url: &Url, id: ConnectionId) -> Result<Self::Handle, ClientError>;
}

#[cfg(test)]
pub mod fake {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Open(String, ConnectionId),
        Send(ConnectionId, String),
        Close(ConnectionId, u16, String),
    }

    /// Records every call; clones share the record.
    #[derive(Debug, Clone, Default)]
    pub struct FakeConnector {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub refuse: Rc<RefCell<Option<String>>>,
    }

    pub struct FakeHandle {
        id: ConnectionId,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl FakeConnector {
        pub fn sends(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Send(_, text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn opens(&self) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::Open(..)))
                .count()
        }
    }

    impl Connector for FakeConnector {
        type Handle = FakeHandle;

        fn open(&mut self, url: &Url, id: ConnectionId) -> Result<FakeHandle, ClientError> {
            if let Some(scheme) = self.refuse.borrow().clone() {
                return Err(ClientError::UnsupportedScheme(scheme));
            }
            self.calls.borrow_mut().push(Call::Open(url.to_string(), id));
            Ok(FakeHandle {
                id,
                calls: self.calls.clone(),
            })
        }
    }

    impl Transport for FakeHandle {
        fn send(&mut self, text: String) -> Result<(), ClientError> {
            self.calls.borrow_mut().push(Call::Send(self.id, text));
            Ok(())
        }

        fn close(&mut self, code: u16, reason: &str) {
            self.calls
                .borrow_mut()
                .push(Call::Close(self.id, code, reason.to_string()));
        }
    }
}
