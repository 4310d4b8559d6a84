//! The observer primitive and the typed event records it carries.
//!
//! A tiny publish/subscribe primitive shared by both `Connection` and
//! `Stream`: `on`/`once` register handlers, an internal `emit` invokes them
//! in insertion order. Each call site emits one concrete event enum rather
//! than a loosely-typed argument list, preferring typed records over
//! variadic arguments in a statically-typed target. [`EventEmitter::emit`]
//! both invokes any registered handlers (push-style, for embedders using
//! `on`/`once`) and appends to an internal buffer that `Connection::receive`
//! / `Stream` methods drain and return (pull-style, matching this crate's
//! synchronous, non-blocking call convention).

/// A minimal, single-threaded pub/sub primitive over one event type.
pub struct EventEmitter<E> {
    handlers: Vec<Handler<E>>,
    buffered: Vec<E>,
}

enum Handler<E> {
    Persistent(Box<dyn FnMut(&E)>),
    Once(Option<Box<dyn FnMut(&E)>>),
}

impl<E: Clone> Default for EventEmitter<E> {
    fn default() -> Self {
        Self { handlers: Vec::new(), buffered: Vec::new() }
    }
}

impl<E: Clone> EventEmitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler invoked on every future `emit` call.
    pub fn on(&mut self, handler: impl FnMut(&E) + 'static) {
        self.handlers.push(Handler::Persistent(Box::new(handler)));
    }

    /// Register a handler invoked exactly once, then automatically removed.
    pub fn once(&mut self, handler: impl FnMut(&E) + 'static) {
        self.handlers.push(Handler::Once(Some(Box::new(handler))));
    }

    /// Invoke all registered handlers, in insertion order, and buffer the
    /// event for a subsequent `drain`. A panic inside a handler propagates
    /// to the caller; handlers are not shielded from each other.
    pub fn emit(&mut self, event: E) {
        for handler in &mut self.handlers {
            match handler {
                Handler::Persistent(f) => f(&event),
                Handler::Once(slot) => {
                    if let Some(mut f) = slot.take() {
                        f(&event);
                    }
                }
            }
        }
        self.handlers.retain(|h| !matches!(h, Handler::Once(None)));
        self.buffered.push(event);
    }

    /// Take all events buffered since the last drain, in emission order.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.buffered)
    }
}

/// Connection-scoped events.
#[derive(Debug, Clone)]
pub enum ConnEvent {
    /// Bytes that must be written to the transport.
    Frame(Vec<u8>),
    /// A frame finished being handed to the transport (post-`Frame`).
    FrameSent { frame_type: u8, stream_id: u32 },
    /// A frame was received and fully parsed.
    FrameReceived { frame_type: u8, stream_id: u32 },
    /// A new inbound stream was opened by the peer.
    Stream { stream_id: u32 },
    /// A PUSH_PROMISE was received (server push).
    Promise { stream_id: u32, promised_stream_id: u32 },
    /// A GOAWAY was received from the peer.
    GoAway { last_stream_id: u32, error_code: u32, debug_data: Vec<u8> },
    /// A PING ACK matching an earlier outbound ping was received.
    Pong { data: [u8; 8] },
    /// The connection has fully closed.
    Close,
}

/// Stream-scoped events.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The stream transitioned out of `idle`.
    Active,
    /// A complete, validated header list was received.
    Headers { headers: Vec<crate::hpack::H2Header>, end_stream: bool },
    /// A DATA payload was received.
    Data { data: Vec<u8>, end_stream: bool },
    /// The stream can no longer receive data from the peer (or send, per
    /// direction) but isn't fully closed yet.
    HalfClose,
    /// The stream is fully closed.
    Close { reason: CloseReason },
}

/// Why a stream closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    LocalRst,
    RemoteRst,
    LocalClosed,
    RemoteClosed,
    LocalGoAway,
    RemoteGoAway,
}
