//! Bidirectional flow-control accounting and send-side buffering.
//!
//! Two window primitives are tracked at both connection and stream scope:
//! a [`SendWindow`] (credit we may still spend on outbound DATA) and a
//! [`RecvWindow`] (credit we've advertised to the peer for inbound DATA,
//! auto-replenished once it drops below half). [`OutboundQueue`] is the
//! per-endpoint send buffer: DATA payloads that don't fit the current
//! window wait here, FIFO, until a WINDOW_UPDATE makes room.

use std::collections::VecDeque;

/// Credit we may spend sending DATA to the peer. May go negative after a
/// SETTINGS-driven shrink of `initial_window_size`; no more data may be
/// sent until WINDOW_UPDATEs bring it positive again.
#[derive(Debug, Clone, Copy)]
pub struct SendWindow {
    window: i64,
}

impl SendWindow {
    pub fn new(initial: u32) -> Self {
        Self { window: initial as i64 }
    }

    pub fn available(&self) -> i64 {
        self.window
    }

    pub fn consume(&mut self, n: u32) {
        self.window -= n as i64;
    }

    pub fn grow(&mut self, increment: u32) {
        self.window += increment as i64;
    }

    /// Apply the signed delta from a changed `initial_window_size`,
    /// adjusting this stream's remote_window by the delta. May drive the
    /// window negative; that's legal (RFC 7540 §6.9.2).
    pub fn apply_initial_window_delta(&mut self, delta: i64) {
        self.window += delta;
    }
}

/// Credit we've advertised to the peer for inbound DATA. Decremented on
/// every received DATA byte; once it falls below half of `max_size`, a
/// WINDOW_UPDATE restoring it to `max_size` is due.
#[derive(Debug, Clone, Copy)]
pub struct RecvWindow {
    window: i64,
    max_size: u32,
}

impl RecvWindow {
    pub fn new(max_size: u32) -> Self {
        Self { window: max_size as i64, max_size }
    }

    pub fn available(&self) -> i64 {
        self.window
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Record `n` bytes of received DATA. Returns the WINDOW_UPDATE
    /// increment to send, if the window just crossed below half-max.
    pub fn on_data_received(&mut self, n: u32) -> Option<u32> {
        self.window -= n as i64;
        if self.window < self.max_size as i64 / 2 {
            let increment = self.max_size as i64 - self.window;
            self.window += increment;
            Some(increment as u32)
        } else {
            None
        }
    }
}

/// One DATA payload (or payload fragment) waiting for flow-control credit.
#[derive(Debug, Clone)]
pub struct QueuedData {
    pub stream_id: u32,
    pub data: Vec<u8>,
    pub end_stream: bool,
}

/// The per-connection outbound DATA queue: FIFO across all streams at
/// connection scope, but a stream-scoped WINDOW_UPDATE only drains the
/// entries belonging to that one stream.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<QueuedData>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes currently buffered, optionally restricted to one stream.
    pub fn buffered_amount(&self, stream_id: Option<u32>) -> usize {
        self.entries
            .iter()
            .filter(|e| stream_id.is_none_or(|sid| e.stream_id == sid))
            .map(|e| e.data.len())
            .sum()
    }

    pub fn push(&mut self, stream_id: u32, data: Vec<u8>, end_stream: bool) {
        if !data.is_empty() || end_stream {
            self.entries.push_back(QueuedData { stream_id, data, end_stream });
        }
    }

    /// Drain as many queued entries as the connection window, each entry's
    /// own stream window, and `max_frame_size` allow, stopping the instant
    /// the next frame would over-spend either window.
    ///
    /// `only_stream`, when set, restricts draining to that stream's own
    /// entries (used for a stream-scoped WINDOW_UPDATE); `None` drains the
    /// whole FIFO (used for a connection-scoped WINDOW_UPDATE).
    pub fn drain_ready(
        &mut self,
        conn_window: &mut SendWindow,
        max_frame_size: u32,
        only_stream: Option<u32>,
        mut stream_window: impl FnMut(u32) -> Option<&mut SendWindow>,
    ) -> Vec<QueuedData> {
        let mut sent = Vec::new();

        loop {
            let Some(front) = self.entries.front() else { break };
            if let Some(sid) = only_stream {
                if front.stream_id != sid {
                    break;
                }
            }
            let Some(sw) = stream_window(front.stream_id) else { break };
            let budget = conn_window.available().min(sw.available()).min(max_frame_size as i64);
            if budget <= 0 {
                break;
            }

            let mut entry = self.entries.pop_front().unwrap();
            let send_len = (entry.data.len() as i64).min(budget) as usize;

            if send_len < entry.data.len() {
                let remainder = entry.data.split_off(send_len);
                let end_stream = entry.end_stream;
                conn_window.consume(send_len as u32);
                if let Some(sw) = stream_window(entry.stream_id) {
                    sw.consume(send_len as u32);
                }
                sent.push(QueuedData { stream_id: entry.stream_id, data: entry.data, end_stream: false });
                self.entries.push_front(QueuedData { stream_id: entry.stream_id, data: remainder, end_stream });
                break;
            }

            conn_window.consume(send_len as u32);
            if let Some(sw) = stream_window(entry.stream_id) {
                sw.consume(send_len as u32);
            }
            sent.push(entry);
        }

        sent
    }
}
