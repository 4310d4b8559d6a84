//! The connection multiplexer: preface/handshake, SETTINGS
//! synchronization, CONTINUATION reassembly, GOAWAY, PING, and stream
//! bookkeeping. This is the embedder-facing surface of the engine —
//! everything else in the crate is a component this type composes.

use std::collections::{HashMap, VecDeque};

use crate::error::{error_code, H2Error, H2Result};
use crate::event::{ConnEvent, EventEmitter};
use crate::flow::{OutboundQueue, RecvWindow, SendWindow};
use crate::frame::{flags, frame_type, CONNECTION_PREFACE, Frame, FrameHeader, Priority};
use crate::hpack::{HpackDecoder, HpackEncoder, H2Header};
use crate::settings::Http2Settings;
use crate::stream::{HeaderRole, Stream, StreamState};

/// How many recently-closed stream ids are tolerated as a grace window for
/// late-arriving frames raced against our own RST_STREAM/closure. Decided
/// here as a small bounded FIFO rather than a wall-clock window, since the
/// core has no timer of its own.
const RECENTLY_CLOSED_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    New,
    Connected,
    Closed,
}

/// Which kind of header-bearing frame a CONTINUATION run completes.
enum ContinuationTarget {
    Headers { end_stream: bool },
    PushPromise { promised_stream_id: u32 },
}

/// Pending CONTINUATION state modeled as a sum type: every
/// frame dispatch consults this one field before anything else.
enum Continuation {
    Idle,
    Awaiting { stream_id: u32, target: ContinuationTarget, accumulator: Vec<u8> },
}

/// A transport-agnostic HTTP/2 connection: feed it inbound bytes, call its
/// outbound methods, and drain the events it buffers. No socket, no TLS,
/// no threads — see the crate root docs.
pub struct Connection {
    role: Role,
    state: ConnState,
    read_buffer: Vec<u8>,
    preface_seen: bool,

    local_settings: Http2Settings,
    remote_settings: Http2Settings,
    pending_settings: VecDeque<Http2Settings>,

    local_window: RecvWindow,
    remote_window: SendWindow,

    next_local_stream_id: u32,
    last_peer_stream_id: u32,
    streams: HashMap<u32, Stream>,
    recently_closed: VecDeque<u32>,
    continuation: Continuation,

    encoder: HpackEncoder,
    decoder: HpackDecoder,
    outbound: OutboundQueue,

    outstanding_pings: Vec<[u8; 8]>,
    goaway_sent: Option<(u32, u32)>,
    goaway_received: bool,

    events: EventEmitter<ConnEvent>,
}

impl Connection {
    pub fn new(role: Role) -> Self {
        Self::with_settings(role, Http2Settings::default())
    }

    pub fn with_settings(role: Role, local_settings: Http2Settings) -> Self {
        Self {
            role,
            state: ConnState::New,
            read_buffer: Vec::new(),
            preface_seen: false,
            remote_settings: Http2Settings::default(),
            local_window: RecvWindow::new(Http2Settings::default().initial_window_size),
            remote_window: SendWindow::new(Http2Settings::default().initial_window_size),
            next_local_stream_id: if role == Role::Client { 1 } else { 2 },
            last_peer_stream_id: 0,
            streams: HashMap::new(),
            recently_closed: VecDeque::new(),
            continuation: Continuation::Idle,
            encoder: HpackEncoder::new(local_settings.header_table_size as usize),
            decoder: HpackDecoder::new(local_settings.header_table_size as usize),
            outbound: OutboundQueue::new(),
            outstanding_pings: Vec::new(),
            goaway_sent: None,
            goaway_received: false,
            events: EventEmitter::new(),
            local_settings,
            pending_settings: VecDeque::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnState::Closed
    }

    pub fn remote_settings(&self) -> &Http2Settings {
        &self.remote_settings
    }

    pub fn stream(&self, id: u32) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn stream_mut(&mut self, id: u32) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    pub fn on(&mut self, handler: impl FnMut(&ConnEvent) + 'static) {
        self.events.on(handler);
    }

    pub fn once(&mut self, handler: impl FnMut(&ConnEvent) + 'static) {
        self.events.once(handler);
    }

    pub fn drain_events(&mut self) -> Vec<ConnEvent> {
        self.events.drain()
    }

    fn emit_frame(&mut self, frame: &Frame) -> H2Result<()> {
        let bytes = frame.encode(self.remote_settings.max_frame_size)?;
        let frame_type = wire_type(frame);
        let stream_id = frame.stream_id();
        self.events.emit(ConnEvent::Frame(bytes));
        self.events.emit(ConnEvent::FrameSent { frame_type, stream_id });
        Ok(())
    }

    /// Client-only: emit the connection preface and our initial SETTINGS.
    /// A server instead sends its initial SETTINGS lazily, on confirming
    /// the client's preface (see [`Connection::receive`]).
    pub fn start(&mut self) -> H2Result<()> {
        if self.role != Role::Client {
            return Err(H2Error::Internal("start() is only valid for a client connection".into()));
        }
        self.events.emit(ConnEvent::Frame(CONNECTION_PREFACE.to_vec()));
        self.send_initial_settings()?;
        self.state = ConnState::Connected;
        Ok(())
    }

    fn send_initial_settings(&mut self) -> H2Result<()> {
        let params = self.local_settings.to_wire_params();
        self.emit_frame(&Frame::Settings { ack: false, params })?;
        self.pending_settings.push_back(self.local_settings);
        Ok(())
    }

    /// Feed inbound bytes. Parses as many complete frames as are buffered,
    /// dispatching each; partial frames are retained for the next call.
    pub fn receive(&mut self, bytes: &[u8]) -> H2Result<()> {
        if self.state == ConnState::Closed {
            return Err(H2Error::ConnectionClosed);
        }
        self.read_buffer.extend_from_slice(bytes);

        if self.role == Role::Server && !self.preface_seen {
            if self.read_buffer.len() < CONNECTION_PREFACE.len() {
                return Ok(());
            }
            if &self.read_buffer[..CONNECTION_PREFACE.len()] != CONNECTION_PREFACE {
                return Err(H2Error::Handshake("client connection preface did not match".into()));
            }
            self.read_buffer.drain(..CONNECTION_PREFACE.len());
            self.preface_seen = true;
            self.state = ConnState::Connected;
            tracing::debug!("accepted client connection preface");
            self.send_initial_settings()?;
        }

        loop {
            let Some(header) = FrameHeader::parse(&self.read_buffer) else { break };
            if self.read_buffer.len() < header.total_size() {
                break;
            }
            let payload = self.read_buffer[FrameHeader::SIZE..header.total_size()].to_vec();
            self.read_buffer.drain(..header.total_size());
            self.events.emit(ConnEvent::FrameReceived { frame_type: header.frame_type, stream_id: header.stream_id });

            if let Err(e) = self.dispatch(&header, &payload) {
                self.fail_connection(&e)?;
                return Err(e);
            }
        }
        Ok(())
    }

    fn fail_connection(&mut self, e: &H2Error) -> H2Result<()> {
        if self.state == ConnState::Closed {
            return Ok(());
        }
        let last = self.last_peer_stream_id;
        tracing::warn!(error = %e, last_stream_id = last, "failing connection");
        self.emit_frame(&Frame::GoAway { last_stream_id: last, error_code: e.code(), debug_data: Vec::new() })?;
        self.goaway_sent = Some((last, e.code()));
        self.state = ConnState::Closed;
        self.events.emit(ConnEvent::Close);
        Ok(())
    }

    fn dispatch(&mut self, header: &FrameHeader, payload: &[u8]) -> H2Result<()> {
        // A pending CONTINUATION run accepts only CONTINUATION frames for
        // the same stream id; anything else is a compression-scope protocol
        // violation.
        if let Continuation::Awaiting { stream_id, .. } = &self.continuation {
            if header.frame_type != frame_type::CONTINUATION || header.stream_id != *stream_id {
                return Err(H2Error::Protocol("expected a CONTINUATION frame for the in-progress header block".into()));
            }
        }

        let Some(frame) = Frame::parse(header, payload)? else { return Ok(()) };

        match frame {
            Frame::Headers { stream_id, header_block_fragment, end_stream, end_headers, priority, .. } => {
                self.check_stream_ordering(stream_id)?;
                if let Some(p) = priority {
                    self.get_or_create_peer_stream(stream_id)?.apply_priority(p)?;
                }
                self.begin_or_finish_headers(
                    stream_id,
                    header_block_fragment,
                    end_headers,
                    ContinuationTarget::Headers { end_stream },
                )
            }
            Frame::Continuation { stream_id, header_block_fragment, end_headers } => {
                self.continue_headers(stream_id, header_block_fragment, end_headers)
            }
            Frame::PushPromise { stream_id, promised_stream_id, header_block_fragment, end_headers, .. } => {
                self.begin_or_finish_headers(
                    stream_id,
                    header_block_fragment,
                    end_headers,
                    ContinuationTarget::PushPromise { promised_stream_id },
                )
            }
            Frame::Data { stream_id, data, end_stream, .. } => self.handle_data(stream_id, data, end_stream),
            Frame::Priority { stream_id, priority } => {
                self.get_or_create_peer_stream(stream_id)?.apply_priority(priority)
            }
            Frame::RstStream { stream_id, error_code } => {
                if let Some(s) = self.streams.remove(&stream_id) {
                    let mut s = s;
                    s.recv_rst_stream(error_code);
                    self.note_closed(stream_id);
                    let _ = s.drain_events();
                    self.streams.insert(stream_id, s);
                }
                Ok(())
            }
            Frame::Settings { ack, params } => self.handle_settings(ack, params),
            Frame::Ping { ack, data } => self.handle_ping(ack, data),
            Frame::GoAway { last_stream_id, error_code, debug_data } => self.handle_goaway(last_stream_id, error_code, debug_data),
            Frame::WindowUpdate { stream_id, increment } => self.handle_window_update(stream_id, increment),
        }
    }

    fn check_stream_ordering(&mut self, stream_id: u32) -> H2Result<()> {
        if !self.streams.contains_key(&stream_id) && stream_id <= self.last_peer_stream_id && self.last_peer_stream_id != 0 {
            return Err(H2Error::Protocol(format!(
                "stream {stream_id} reuses or precedes the highest previously-seen peer stream id {}",
                self.last_peer_stream_id
            )));
        }
        Ok(())
    }

    fn get_or_create_peer_stream(&mut self, stream_id: u32) -> H2Result<&mut Stream> {
        if !self.streams.contains_key(&stream_id) {
            let stream = Stream::new(stream_id, self.remote_settings.initial_window_size, self.local_settings.initial_window_size);
            self.streams.insert(stream_id, stream);
            if stream_id > self.last_peer_stream_id {
                self.last_peer_stream_id = stream_id;
            }
        }
        Ok(self.streams.get_mut(&stream_id).unwrap())
    }

    fn begin_or_finish_headers(
        &mut self,
        stream_id: u32,
        fragment: Vec<u8>,
        end_headers: bool,
        target: ContinuationTarget,
    ) -> H2Result<()> {
        if end_headers {
            self.finish_headers(stream_id, fragment, target)
        } else {
            self.continuation = Continuation::Awaiting { stream_id, target, accumulator: fragment };
            Ok(())
        }
    }

    fn continue_headers(&mut self, stream_id: u32, fragment: Vec<u8>, end_headers: bool) -> H2Result<()> {
        let Continuation::Awaiting { accumulator, .. } = &mut self.continuation else {
            return Err(H2Error::Protocol("unexpected CONTINUATION frame".into()));
        };
        accumulator.extend_from_slice(&fragment);
        if !end_headers {
            return Ok(());
        }
        let Continuation::Awaiting { stream_id: sid, target, accumulator } = std::mem::replace(&mut self.continuation, Continuation::Idle) else {
            unreachable!()
        };
        debug_assert_eq!(sid, stream_id);
        self.finish_headers(stream_id, accumulator, target)
    }

    fn finish_headers(&mut self, stream_id: u32, block: Vec<u8>, target: ContinuationTarget) -> H2Result<()> {
        let headers = self.decoder.decode(&block)?;

        match target {
            ContinuationTarget::Headers { end_stream, .. } => {
                let is_new = !self.streams.contains_key(&stream_id);
                let stream = self.get_or_create_peer_stream(stream_id)?;
                let role = if stream.state() == StreamState::Idle || is_new { HeaderRole::Request } else { HeaderRole::Response };
                match stream.recv_headers(&headers, end_stream, role) {
                    Ok(()) => {
                        if is_new {
                            self.events.emit(ConnEvent::Stream { stream_id });
                        }
                        self.forward_stream_events(stream_id);
                        Ok(())
                    }
                    Err(e) => self.reset_stream_locally(stream_id, e),
                }
            }
            ContinuationTarget::PushPromise { promised_stream_id } => {
                let parent = stream_id;
                let promised = Stream::new(promised_stream_id, self.remote_settings.initial_window_size, self.local_settings.initial_window_size);
                self.streams.insert(promised_stream_id, promised);
                if let Some(s) = self.streams.get_mut(&promised_stream_id) {
                    s.reserve_remote(parent)?;
                }
                self.events.emit(ConnEvent::Promise { stream_id: parent, promised_stream_id });
                let _ = headers;
                Ok(())
            }
        }
    }

    fn forward_stream_events(&mut self, stream_id: u32) {
        if let Some(s) = self.streams.get_mut(&stream_id) {
            let _ = s.drain_events();
        }
    }

    /// Convert a stream-scope protocol violation into a local RST_STREAM;
    /// the connection survives.
    fn reset_stream_locally(&mut self, stream_id: u32, e: H2Error) -> H2Result<()> {
        if e.is_connection_fatal() {
            return Err(e);
        }
        self.emit_frame(&Frame::RstStream { stream_id, error_code: e.code() })?;
        if let Some(s) = self.streams.remove(&stream_id) {
            let _ = s;
        }
        self.note_closed(stream_id);
        Ok(())
    }

    fn handle_data(&mut self, stream_id: u32, data: Vec<u8>, end_stream: bool) -> H2Result<()> {
        let len = data.len() as u32;
        if self.recently_closed.contains(&stream_id) {
            return Ok(());
        }
        let conn_increment = self.local_window.on_data_received(len);
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return Err(H2Error::Protocol(format!("DATA for unknown stream {stream_id}")));
        };
        let outcome = stream.recv_data(len, end_stream);
        let closed_now = stream.is_closed();

        match outcome {
            Ok(stream_increment) => {
                if let Some(incr) = conn_increment {
                    self.emit_frame(&Frame::WindowUpdate { stream_id: 0, increment: incr })?;
                }
                if let Some(incr) = stream_increment {
                    self.emit_frame(&Frame::WindowUpdate { stream_id, increment: incr })?;
                }
                self.forward_stream_events(stream_id);
                if closed_now {
                    self.note_closed(stream_id);
                    self.streams.remove(&stream_id);
                }
                Ok(())
            }
            Err(e) => self.reset_stream_locally(stream_id, e),
        }
    }

    fn handle_settings(&mut self, ack: bool, params: Vec<(u16, u32)>) -> H2Result<()> {
        if ack {
            if let Some(applied) = self.pending_settings.pop_front() {
                let old = self.local_settings;
                self.local_settings = applied;
                if applied.header_table_size != old.header_table_size {
                    self.decoder.set_max_dynamic_table_size(applied.header_table_size as usize);
                }
            }
            return Ok(());
        }

        let old_initial_window = self.remote_settings.initial_window_size;
        for (id, value) in params {
            self.remote_settings.apply(id, value)?;
        }
        let delta = self.remote_settings.initial_window_size as i64 - old_initial_window as i64;
        if delta != 0 {
            for stream in self.streams.values_mut() {
                if matches!(stream.state(), StreamState::Open | StreamState::HalfClosedRemote | StreamState::HalfClosedLocal) {
                    stream.remote_window.apply_initial_window_delta(delta);
                }
            }
        }
        self.encoder.notify_max_dynamic_table_size(self.remote_settings.header_table_size as usize);

        self.emit_frame(&Frame::Settings { ack: true, params: Vec::new() })
    }

    fn handle_ping(&mut self, ack: bool, data: [u8; 8]) -> H2Result<()> {
        if ack {
            if let Some(pos) = self.outstanding_pings.iter().position(|p| *p == data) {
                self.outstanding_pings.remove(pos);
                self.events.emit(ConnEvent::Pong { data });
            }
            Ok(())
        } else {
            self.emit_frame(&Frame::Ping { ack: true, data })
        }
    }

    fn handle_goaway(&mut self, last_stream_id: u32, error_code: u32, debug_data: Vec<u8>) -> H2Result<()> {
        if self.goaway_received {
            return Err(H2Error::Protocol("received a second GOAWAY".into()));
        }
        self.goaway_received = true;
        self.state = ConnState::Closed;
        tracing::info!(last_stream_id, error_code, "peer sent GOAWAY");
        self.events.emit(ConnEvent::GoAway { last_stream_id, error_code, debug_data });
        self.events.emit(ConnEvent::Close);
        Ok(())
    }

    fn handle_window_update(&mut self, stream_id: u32, increment: u32) -> H2Result<()> {
        let only_stream = if stream_id == 0 {
            self.remote_window.grow(increment);
            None
        } else {
            if self.recently_closed.contains(&stream_id) {
                return Ok(());
            }
            let Some(stream) = self.streams.get_mut(&stream_id) else {
                return Err(H2Error::Protocol(format!("WINDOW_UPDATE for unknown stream {stream_id}")));
            };
            stream.remote_window.grow(increment);
            Some(stream_id)
        };
        let max_frame_size = self.remote_settings.max_frame_size;
        let streams = &mut self.streams;
        let ready = self.outbound.drain_ready(&mut self.remote_window, max_frame_size, only_stream, |sid| {
            streams.get_mut(&sid).map(|s| &mut s.remote_window)
        });
        self.flush_ready(ready)
    }

    fn flush_ready(&mut self, ready: Vec<crate::flow::QueuedData>) -> H2Result<()> {
        for entry in ready {
            self.emit_frame(&Frame::Data { stream_id: entry.stream_id, data: entry.data, end_stream: entry.end_stream, padded: None })?;
        }
        Ok(())
    }

    fn note_closed(&mut self, stream_id: u32) {
        self.recently_closed.push_back(stream_id);
        while self.recently_closed.len() > RECENTLY_CLOSED_CAPACITY {
            self.recently_closed.pop_front();
        }
    }

    // -- Outbound embedder API ----------------------------------------------

    pub fn new_stream(&mut self) -> H2Result<u32> {
        if self.goaway_sent.is_some() || self.goaway_received {
            return Err(H2Error::ConnectionClosed);
        }
        if let Some(limit) = self.remote_settings.max_concurrent_streams {
            let open = self.streams.values().filter(|s| !s.is_closed()).count() as u32;
            if open >= limit {
                return Err(H2Error::StreamLimitExceeded { current: open, limit });
            }
        }
        let id = self.next_local_stream_id;
        self.next_local_stream_id += 2;
        self.streams.insert(id, Stream::new(id, self.remote_settings.initial_window_size, self.local_settings.initial_window_size));
        tracing::trace!(stream_id = id, "opened local stream");
        Ok(id)
    }

    pub fn send_headers(&mut self, stream_id: u32, headers: &[H2Header], end_stream: bool) -> H2Result<()> {
        {
            let stream = self.streams.get_mut(&stream_id).ok_or(H2Error::StreamClosed(stream_id))?;
            stream.send_headers(end_stream)?;
        }
        let block = self.encoder.encode(headers);
        self.emit_headers_frames(stream_id, &block, end_stream, None)
    }

    fn emit_headers_frames(&mut self, stream_id: u32, block: &[u8], end_stream: bool, priority: Option<Priority>) -> H2Result<()> {
        let max = self.remote_settings.max_frame_size as usize;
        let fragments: Vec<&[u8]> = if block.is_empty() { vec![&block[..]] } else { block.chunks(max).collect() };
        let last = fragments.len() - 1;
        for (i, frag) in fragments.into_iter().enumerate() {
            let end_headers = i == last;
            let frame = if i == 0 {
                Frame::Headers {
                    stream_id,
                    header_block_fragment: frag.to_vec(),
                    end_stream,
                    end_headers,
                    priority,
                    padded: None,
                }
            } else {
                Frame::Continuation { stream_id, header_block_fragment: frag.to_vec(), end_headers }
            };
            self.emit_frame(&frame)?;
        }
        Ok(())
    }

    pub fn send_data(&mut self, stream_id: u32, data: Vec<u8>, end_stream: bool) -> H2Result<()> {
        {
            let stream = self.streams.get_mut(&stream_id).ok_or(H2Error::StreamClosed(stream_id))?;
            stream.send_data(data.len() as u32, end_stream)?;
        }
        self.outbound.push(stream_id, data, end_stream);
        let max_frame_size = self.remote_settings.max_frame_size;
        let streams = &mut self.streams;
        let ready = self.outbound.drain_ready(&mut self.remote_window, max_frame_size, Some(stream_id), |sid| {
            streams.get_mut(&sid).map(|s| &mut s.remote_window)
        });
        self.flush_ready(ready)
    }

    pub fn send_ping(&mut self, data: [u8; 8]) -> H2Result<()> {
        self.outstanding_pings.push(data);
        self.emit_frame(&Frame::Ping { ack: false, data })
    }

    pub fn send_goaway(&mut self, error_code: u32, debug_data: Vec<u8>) -> H2Result<()> {
        if self.goaway_sent.is_some() {
            return Ok(());
        }
        let last = self.last_peer_stream_id;
        self.emit_frame(&Frame::GoAway { last_stream_id: last, error_code, debug_data })?;
        self.goaway_sent = Some((last, error_code));
        self.state = ConnState::Closed;
        self.events.emit(ConnEvent::Close);
        Ok(())
    }

    pub fn send_window_update(&mut self, stream_id: u32, increment: u32) -> H2Result<()> {
        self.emit_frame(&Frame::WindowUpdate { stream_id, increment })
    }

    pub fn queue_settings(&mut self, new: Http2Settings) -> H2Result<()> {
        let params = diff_params(&self.local_settings, &new);
        if params.is_empty() {
            return Ok(());
        }
        self.emit_frame(&Frame::Settings { ack: false, params })?;
        self.pending_settings.push_back(new);
        Ok(())
    }

    pub fn stream_cancel(&mut self, stream_id: u32) -> H2Result<()> {
        self.stream_close(stream_id, error_code::CANCEL)
    }

    pub fn stream_close(&mut self, stream_id: u32, error_code: u32) -> H2Result<()> {
        {
            let stream = self.streams.get_mut(&stream_id).ok_or(H2Error::StreamClosed(stream_id))?;
            stream.send_rst_stream()?;
        }
        self.emit_frame(&Frame::RstStream { stream_id, error_code })?;
        self.note_closed(stream_id);
        self.streams.remove(&stream_id);
        Ok(())
    }
}

fn diff_params(old: &Http2Settings, new: &Http2Settings) -> Vec<(u16, u32)> {
    let mut a = old.to_wire_params();
    let b = new.to_wire_params();
    a.retain(|p| !b.contains(p));
    b
}

fn wire_type(frame: &Frame) -> u8 {
    match frame {
        Frame::Data { .. } => frame_type::DATA,
        Frame::Headers { .. } => frame_type::HEADERS,
        Frame::Priority { .. } => frame_type::PRIORITY,
        Frame::RstStream { .. } => frame_type::RST_STREAM,
        Frame::Settings { .. } => frame_type::SETTINGS,
        Frame::PushPromise { .. } => frame_type::PUSH_PROMISE,
        Frame::Ping { .. } => frame_type::PING,
        Frame::GoAway { .. } => frame_type::GOAWAY,
        Frame::WindowUpdate { .. } => frame_type::WINDOW_UPDATE,
        Frame::Continuation { .. } => frame_type::CONTINUATION,
    }
}
