//! The SETTINGS hash and its defaults (RFC 7540 §6.5.2).

use crate::error::{H2Error, H2Result};
use crate::frame::settings_id;

/// Default initial flow-control window for a new stream (RFC 7540 §6.9.2).
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
/// Default connection-level flow-control window, same default as streams.
pub const DEFAULT_CONNECTION_WINDOW_SIZE: u32 = 65_535;
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4_096;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;
pub const MAX_MAX_FRAME_SIZE: u32 = (1 << 24) - 1;
pub const MAX_WINDOW_SIZE: u32 = (1u32 << 31) - 1;

/// The six recognized SETTINGS keys. `max_concurrent_streams`
/// and `max_header_list_size` default to "unbounded", modeled as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Http2Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Http2Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_list_size: None,
        }
    }
}

impl Http2Settings {
    /// Encode the settings that differ from RFC defaults as wire
    /// (identifier, value) pairs, in a stable key order.
    pub fn to_wire_params(&self) -> Vec<(u16, u32)> {
        let defaults = Http2Settings::default();
        let mut out = Vec::new();
        if self.header_table_size != defaults.header_table_size {
            out.push((settings_id::HEADER_TABLE_SIZE, self.header_table_size));
        }
        if self.enable_push != defaults.enable_push {
            out.push((settings_id::ENABLE_PUSH, self.enable_push as u32));
        }
        if let Some(v) = self.max_concurrent_streams {
            out.push((settings_id::MAX_CONCURRENT_STREAMS, v));
        }
        if self.initial_window_size != defaults.initial_window_size {
            out.push((settings_id::INITIAL_WINDOW_SIZE, self.initial_window_size));
        }
        if self.max_frame_size != defaults.max_frame_size {
            out.push((settings_id::MAX_FRAME_SIZE, self.max_frame_size));
        }
        if let Some(v) = self.max_header_list_size {
            out.push((settings_id::MAX_HEADER_LIST_SIZE, v));
        }
        out
    }

    /// Apply a single wire-format (identifier, value) update, validating
    /// each recognized value's range. Unknown identifiers are ignored
    /// (RFC 7540 §6.5.2).
    pub fn apply(&mut self, id: u16, value: u32) -> H2Result<()> {
        match id {
            settings_id::HEADER_TABLE_SIZE => self.header_table_size = value,
            settings_id::ENABLE_PUSH => {
                if value > 1 {
                    return Err(H2Error::Protocol("SETTINGS_ENABLE_PUSH must be 0 or 1".into()));
                }
                self.enable_push = value == 1;
            }
            settings_id::MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = Some(value),
            settings_id::INITIAL_WINDOW_SIZE => {
                if value > MAX_WINDOW_SIZE {
                    return Err(H2Error::FlowControl(format!(
                        "SETTINGS_INITIAL_WINDOW_SIZE {value} exceeds the maximum flow-control window"
                    )));
                }
                self.initial_window_size = value;
            }
            settings_id::MAX_FRAME_SIZE => {
                if !(DEFAULT_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) {
                    return Err(H2Error::Protocol(format!(
                        "SETTINGS_MAX_FRAME_SIZE {value} out of range [{DEFAULT_MAX_FRAME_SIZE}, {MAX_MAX_FRAME_SIZE}]"
                    )));
                }
                self.max_frame_size = value;
            }
            settings_id::MAX_HEADER_LIST_SIZE => self.max_header_list_size = Some(value),
            _ => {}
        }
        Ok(())
    }
}
