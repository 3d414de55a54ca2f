//! Typed BLE stack events
//!
//! Stack callbacks may run in an interrupt-like context or on another
//! thread. They only push events through an [`EventSink`]; the main loop
//! drains the [`EventQueue`] once per tick and applies events in order.

use crate::ble::CharacteristicHandle;
use crate::target::PeerId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Which link a security event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    Client(PeerId),
    Server,
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Link::Client(peer) => write!(f, "{peer}"),
            Link::Server => f.write_str("server link"),
        }
    }
}

/// Completion of a request made through [`crate::BleCentral`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    ConnectFailed(String),
    ServiceDiscovered,
    ServiceNotFound,
    CharacteristicDiscovered(CharacteristicHandle),
    CharacteristicNotFound,
    Subscribed,
    SubscribeRejected(String),
    WriteComplete,
    WriteFailed(String),
    Disconnected,
}

/// Inbound link changes on our GATT server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected,
    Disconnected,
    /// A notification was accepted but never delivered
    NotifyFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    PasskeyRequest,
    PasskeyNotify(u32),
    ConfirmPin(u32),
    SecurityRequest,
    AuthenticationComplete { success: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    Client { peer: PeerId, event: ClientEvent },
    Server(ServerEvent),
    Security { link: Link, event: SecurityEvent },
}

type Shared = Arc<Mutex<VecDeque<StackEvent>>>;

fn lock(queue: &Shared) -> MutexGuard<'_, VecDeque<StackEvent>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer half, handed to the BLE stack
#[derive(Debug, Clone)]
pub struct EventSink {
    queue: Shared,
}

impl EventSink {
    pub fn push(&self, event: StackEvent) {
        lock(&self.queue).push_back(event);
    }

    pub fn client(&self, peer: PeerId, event: ClientEvent) {
        self.push(StackEvent::Client { peer, event });
    }

    pub fn server(&self, event: ServerEvent) {
        self.push(StackEvent::Server(event));
    }

    pub fn security(&self, link: Link, event: SecurityEvent) {
        self.push(StackEvent::Security { link, event });
    }
}

/// Consumer half, owned by the dispatcher
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: Shared,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> EventSink {
        EventSink {
            queue: self.queue.clone(),
        }
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&self) -> VecDeque<StackEvent> {
        std::mem::take(&mut *lock(&self.queue))
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
