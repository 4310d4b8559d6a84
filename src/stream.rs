//! Per-stream lifecycle and per-frame validation.
//!
//! A [`Stream`] tracks its own state machine, its flow-control windows,
//! and the bookkeeping needed to validate
//! a header block and the DATA that follows it (pseudo-header shape,
//! `content-length` accounting, trailers). It never outlives the
//! [`crate::connection::Connection`] that owns it and holds no reference
//! back to it — callers drive it by calling the relevant method and reading
//! back the buffered [`StreamEvent`]s.

use crate::error::{H2Error, H2Result};
use crate::event::{CloseReason, EventEmitter, StreamEvent};
use crate::flow::{RecvWindow, SendWindow};
use crate::frame::Priority;
use crate::hpack::H2Header;

/// Stream lifecycle state (RFC 7540 §5.1). Ordered `idle < reserved <
/// open < half_closed < closed`; transitions never move backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    fn rank(self) -> u8 {
        match self {
            StreamState::Idle => 0,
            StreamState::ReservedLocal | StreamState::ReservedRemote => 1,
            StreamState::Open => 2,
            StreamState::HalfClosedLocal | StreamState::HalfClosedRemote => 3,
            StreamState::Closed => 4,
        }
    }
}

/// Which end the embedder plays on this stream, used only to pick the
/// pseudo-header shape a header block must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRole {
    Request,
    Response,
}

fn is_pseudo(name: &[u8]) -> bool {
    name.first() == Some(&b':')
}

/// One multiplexed HTTP/2 stream.
pub struct Stream {
    pub id: u32,
    state: StreamState,
    pub parent: u32,
    pub weight: u16,
    pub dependency: u32,
    pub exclusive: bool,

    pub local_window: RecvWindow,
    pub remote_window: SendWindow,
    local_window_max_size: u32,

    closed_reason: Option<CloseReason>,
    sent_end_stream: bool,
    sent_rst: bool,

    method: Option<Vec<u8>>,
    content_length: Option<u64>,
    status_code: Option<u16>,
    received_data: u64,
    waiting_on_trailers: bool,
    trailer_names: Option<Vec<Vec<u8>>>,

    events: EventEmitter<StreamEvent>,
}

impl Stream {
    pub fn new(id: u32, initial_remote_window: u32, initial_local_window_max_size: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            parent: 0,
            weight: 16,
            dependency: 0,
            exclusive: false,
            local_window: RecvWindow::new(initial_local_window_max_size),
            remote_window: SendWindow::new(initial_remote_window),
            local_window_max_size: initial_local_window_max_size,
            closed_reason: None,
            sent_end_stream: false,
            sent_rst: false,
            method: None,
            content_length: None,
            status_code: None,
            received_data: 0,
            waiting_on_trailers: false,
            trailer_names: None,
            events: EventEmitter::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    pub fn closed_reason(&self) -> Option<CloseReason> {
        self.closed_reason
    }

    pub fn on(&mut self, handler: impl FnMut(&StreamEvent) + 'static) {
        self.events.on(handler);
    }

    pub fn once(&mut self, handler: impl FnMut(&StreamEvent) + 'static) {
        self.events.once(handler);
    }

    pub fn drain_events(&mut self) -> Vec<StreamEvent> {
        self.events.drain()
    }

    fn move_to(&mut self, new: StreamState) -> H2Result<()> {
        if new.rank() < self.state.rank() && !(self.state == StreamState::Closed && new == StreamState::Closed) {
            return Err(H2Error::Internal(format!(
                "illegal stream state regression: {:?} -> {:?}",
                self.state, new
            )));
        }
        let was_idle = self.state == StreamState::Idle;
        self.state = new;
        if was_idle && new != StreamState::Idle {
            self.events.emit(StreamEvent::Active);
        }
        Ok(())
    }

    pub fn apply_priority(&mut self, priority: Priority) -> H2Result<()> {
        if priority.weight == 0 || priority.weight > 256 {
            return Err(H2Error::Protocol(format!("PRIORITY weight {} out of range 1..=256", priority.weight)));
        }
        self.parent = priority.dependency;
        self.exclusive = priority.exclusive;
        self.weight = priority.weight;
        Ok(())
    }

    pub fn reserve_local(&mut self, parent: u32) -> H2Result<()> {
        self.require(StreamState::Idle)?;
        self.parent = parent;
        self.move_to(StreamState::ReservedLocal)
    }

    pub fn reserve_remote(&mut self, parent: u32) -> H2Result<()> {
        self.require(StreamState::Idle)?;
        self.parent = parent;
        self.move_to(StreamState::ReservedRemote)
    }

    fn require(&self, expected: StreamState) -> H2Result<()> {
        if self.state != expected {
            return Err(H2Error::Protocol(format!("expected stream {} in state {:?}, was {:?}", self.id, expected, self.state)));
        }
        Ok(())
    }

    /// Validate and record an outbound header block.
    pub fn send_headers(&mut self, end_stream: bool) -> H2Result<()> {
        match self.state {
            StreamState::Idle => self.move_to(if end_stream { StreamState::HalfClosedLocal } else { StreamState::Open })?,
            StreamState::ReservedLocal => {
                self.move_to(if end_stream { StreamState::Closed } else { StreamState::HalfClosedRemote })?
            }
            StreamState::Open => {
                if end_stream {
                    self.move_to(StreamState::HalfClosedLocal)?;
                }
            }
            StreamState::HalfClosedRemote => {
                if end_stream {
                    self.move_to(StreamState::Closed)?;
                }
            }
            other => return Err(self.stale_error(other)),
        }
        if end_stream {
            self.sent_end_stream = true;
        }
        Ok(())
    }

    fn stale_error(&self, state: StreamState) -> H2Error {
        if state == StreamState::Closed {
            H2Error::StreamClosed(self.id)
        } else {
            H2Error::StreamProtocol(format!("cannot send HEADERS from state {state:?}"))
        }
    }

    /// Validate and record an inbound header block, emitting `:headers`
    /// once pseudo-header/content-length/trailer validation passes.
    pub fn recv_headers(&mut self, headers: &[H2Header], end_stream: bool, role: HeaderRole) -> H2Result<()> {
        let is_trailers = self.received_data > 0 || self.waiting_on_trailers;

        match self.state {
            StreamState::Idle => self.move_to(if end_stream { StreamState::HalfClosedRemote } else { StreamState::Open })?,
            StreamState::ReservedRemote => self.move_to(StreamState::HalfClosedLocal)?,
            StreamState::Open => {
                if end_stream {
                    self.move_to(StreamState::HalfClosedRemote)?;
                }
            }
            StreamState::HalfClosedLocal => {
                if end_stream {
                    self.move_to(StreamState::Closed)?;
                }
            }
            other => return Err(self.stale_error(other)),
        }

        if is_trailers {
            self.validate_trailers(headers)?;
        } else {
            self.validate_header_shape(headers, role)?;
        }

        self.events.emit(StreamEvent::Headers { headers: headers.to_vec(), end_stream });
        if end_stream {
            self.events.emit(StreamEvent::HalfClose);
            self.finish_if_applicable();
        }
        Ok(())
    }

    fn validate_header_shape(&mut self, headers: &[H2Header], role: HeaderRole) -> H2Result<()> {
        let mut seen_regular = false;
        let mut have = std::collections::HashSet::new();
        for h in headers {
            if h.name.iter().any(|b| b.is_ascii_uppercase()) {
                return Err(H2Error::StreamProtocol(format!("header name {:?} contains uppercase letters", h.name_str())));
            }
            if is_pseudo(&h.name) {
                if seen_regular {
                    return Err(H2Error::StreamProtocol("pseudo-header after regular header".into()));
                }
                have.insert(h.name.clone());
            } else {
                seen_regular = true;
                if h.name.as_slice() == b"content-length" {
                    let len: u64 = h
                        .value_str()
                        .parse()
                        .map_err(|_| H2Error::StreamProtocol("invalid content-length value".into()))?;
                    self.content_length = Some(len);
                }
                if h.name.as_slice() == b"trailer" {
                    let names = h.value_str().split(',').map(|s| s.trim().as_bytes().to_vec()).collect();
                    self.trailer_names = Some(names);
                }
                if h.name.as_slice() == b":method" {
                    self.method = Some(h.value.clone());
                }
                if h.name.as_slice() == b":status" {
                    self.status_code = h.value_str().parse().ok();
                }
            }
        }

        match role {
            HeaderRole::Request => {
                for required in [b":scheme".as_slice(), b":method", b":path"] {
                    if !have.contains(required) {
                        return Err(H2Error::StreamProtocol(format!(
                            "request header block missing required pseudo-header {:?}",
                            String::from_utf8_lossy(required)
                        )));
                    }
                }
                let is_connect = self.method.as_deref() == Some(b"CONNECT");
                if !is_connect {
                    let path = headers.iter().find(|h| h.name.as_slice() == b":path");
                    if path.map(|h| h.value.is_empty()).unwrap_or(true) {
                        return Err(H2Error::StreamProtocol(":path pseudo-header must be non-empty".into()));
                    }
                }
            }
            HeaderRole::Response => {
                if !have.contains(b":status".as_slice()) {
                    return Err(H2Error::StreamProtocol("response header block missing :status".into()));
                }
            }
        }
        Ok(())
    }

    fn validate_trailers(&self, headers: &[H2Header]) -> H2Result<()> {
        for h in headers {
            if is_pseudo(&h.name) {
                return Err(H2Error::StreamProtocol("trailers must not carry pseudo-headers".into()));
            }
            if let Some(allowed) = &self.trailer_names {
                if !allowed.iter().any(|n| n == &h.name) {
                    return Err(H2Error::StreamProtocol(format!(
                        "trailer {:?} was not listed in the Trailer header",
                        h.name_str()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate and record the stream-state effect of an outbound DATA call.
    /// Does *not* touch `remote_window`: the window is only spent once the
    /// bytes actually leave via [`crate::flow::OutboundQueue::drain_ready`],
    /// since a call here may be entirely buffered rather than transmitted.
    pub fn send_data(&mut self, _len: u32, end_stream: bool) -> H2Result<()> {
        match self.state {
            StreamState::Open => {
                if end_stream {
                    self.move_to(StreamState::HalfClosedLocal)?;
                }
            }
            StreamState::HalfClosedRemote => {
                if end_stream {
                    self.move_to(StreamState::Closed)?;
                }
            }
            other => return Err(self.stale_error(other)),
        }
        if end_stream {
            self.sent_end_stream = true;
        }
        Ok(())
    }

    /// Record inbound DATA, returning a WINDOW_UPDATE increment if due.
    pub fn recv_data(&mut self, len: u32, end_stream: bool) -> H2Result<Option<u32>> {
        match self.state {
            StreamState::Open | StreamState::HalfClosedLocal => {}
            other => return Err(self.stale_error(other)),
        }
        self.received_data += len as u64;
        if let Some(expected) = self.content_length {
            if end_stream && self.received_data != expected {
                return Err(H2Error::StreamProtocol(format!(
                    "content-length {expected} does not match received body of {} bytes",
                    self.received_data
                )));
            }
            if self.received_data > expected {
                return Err(H2Error::StreamProtocol("received body exceeds declared content-length".into()));
            }
        }

        let increment = self.local_window.on_data_received(len);

        if end_stream {
            self.waiting_on_trailers = self.trailer_names.is_some();
            if self.state == StreamState::Open {
                self.move_to(StreamState::HalfClosedRemote)?;
            } else {
                self.move_to(StreamState::Closed)?;
            }
        }
        self.events.emit(StreamEvent::Data { data: Vec::new(), end_stream });
        if end_stream {
            self.events.emit(StreamEvent::HalfClose);
            self.finish_if_applicable();
        }
        Ok(increment)
    }

    fn finish_if_applicable(&mut self) {
        if self.closed_reason.is_none() && self.state == StreamState::Closed {
            self.close(CloseReason::RemoteClosed);
        }
    }

    pub fn send_rst_stream(&mut self) -> H2Result<()> {
        if self.sent_rst {
            return Err(H2Error::StreamClosed(self.id));
        }
        self.sent_rst = true;
        self.close(CloseReason::LocalRst);
        Ok(())
    }

    pub fn recv_rst_stream(&mut self, error_code: u32) {
        let _ = error_code;
        self.close(CloseReason::RemoteRst);
    }

    pub fn goaway_close(&mut self, local_initiated: bool) {
        self.close(if local_initiated { CloseReason::LocalGoAway } else { CloseReason::RemoteGoAway });
    }

    fn close(&mut self, reason: CloseReason) {
        if self.closed_reason.is_some() {
            return;
        }
        self.closed_reason = Some(reason);
        self.state = StreamState::Closed;
        self.events.emit(StreamEvent::Close { reason });
    }

}
