//! The HTTP/2 binary framing layer: the nine wire frame types plus
//! their shared 9-octet header (RFC 7540 §4, §6).

use crate::error::H2Error;

pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
    pub const ALTSVC: u8 = 0xa;
    pub const ORIGIN: u8 = 0xc;
}

pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// The maximum value a stream id or a 31-bit windowed field may carry.
pub const MAX_STREAM_ID: u32 = (1u32 << 31) - 1;

/// The 24-octet client connection preface (RFC 7540 §3.5).
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// A parsed 9-octet frame header.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    pub const SIZE: usize = 9;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let frame_type = data[3];
        let flags = data[4];
        let stream_id = (((data[5] as u32) << 24)
            | ((data[6] as u32) << 16)
            | ((data[7] as u32) << 8)
            | (data[8] as u32))
            & MAX_STREAM_ID;
        Some(Self { length, frame_type, flags, stream_id })
    }

    pub fn total_size(&self) -> usize {
        Self::SIZE + self.length as usize
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push((self.length >> 16) as u8);
        out.push((self.length >> 8) as u8);
        out.push(self.length as u8);
        out.push(self.frame_type);
        out.push(self.flags);
        out.extend_from_slice(&self.stream_id.to_be_bytes());
    }
}

/// Stream-dependency parameters shared by PRIORITY frames and HEADERS
/// frames carrying the PRIORITY flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub dependency: u32,
    pub exclusive: bool,
    /// True weight, 1..=256 (the wire encodes `weight - 1` in one octet).
    pub weight: u16,
}

impl Default for Priority {
    fn default() -> Self {
        Self { dependency: 0, exclusive: false, weight: 16 }
    }
}

/// A fully parsed or to-be-encoded HTTP/2 frame, one variant per wire
/// type, modeled as a Rust enum rather than a tagged struct.
#[derive(Debug, Clone)]
pub enum Frame {
    Data { stream_id: u32, data: Vec<u8>, end_stream: bool, padded: Option<u8> },
    Headers {
        stream_id: u32,
        header_block_fragment: Vec<u8>,
        end_stream: bool,
        end_headers: bool,
        priority: Option<Priority>,
        padded: Option<u8>,
    },
    Priority { stream_id: u32, priority: Priority },
    RstStream { stream_id: u32, error_code: u32 },
    Settings { ack: bool, params: Vec<(u16, u32)> },
    PushPromise {
        stream_id: u32,
        promised_stream_id: u32,
        header_block_fragment: Vec<u8>,
        end_headers: bool,
        padded: Option<u8>,
    },
    Ping { ack: bool, data: [u8; 8] },
    GoAway { last_stream_id: u32, error_code: u32, debug_data: Vec<u8> },
    WindowUpdate { stream_id: u32, increment: u32 },
    Continuation { stream_id: u32, header_block_fragment: Vec<u8>, end_headers: bool },
}

impl Frame {
    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Data { stream_id, .. }
            | Frame::Headers { stream_id, .. }
            | Frame::Priority { stream_id, .. }
            | Frame::RstStream { stream_id, .. }
            | Frame::PushPromise { stream_id, .. }
            | Frame::WindowUpdate { stream_id, .. }
            | Frame::Continuation { stream_id, .. } => *stream_id,
            Frame::Settings { .. } | Frame::Ping { .. } | Frame::GoAway { .. } => 0,
        }
    }

    /// Parse one complete frame (header + matching payload). Returns `Ok(None)`
    /// for a frame type this engine does not recognize; RFC 7540 §4.1
    /// requires unknown frame types to be silently skipped.
    pub fn parse(header: &FrameHeader, payload: &[u8]) -> Result<Option<Frame>, H2Error> {
        match header.frame_type {
            frame_type::DATA => Ok(Some(parse_data(header, payload)?)),
            frame_type::HEADERS => Ok(Some(parse_headers(header, payload)?)),
            frame_type::PRIORITY => Ok(Some(parse_priority(header, payload)?)),
            frame_type::RST_STREAM => Ok(Some(parse_rst_stream(header, payload)?)),
            frame_type::SETTINGS => Ok(Some(parse_settings(header, payload)?)),
            frame_type::PUSH_PROMISE => Ok(Some(parse_push_promise(header, payload)?)),
            frame_type::PING => Ok(Some(parse_ping(header, payload)?)),
            frame_type::GOAWAY => Ok(Some(parse_goaway(header, payload)?)),
            frame_type::WINDOW_UPDATE => Ok(Some(parse_window_update(header, payload)?)),
            frame_type::CONTINUATION => Ok(Some(Frame::Continuation {
                stream_id: header.stream_id,
                header_block_fragment: payload.to_vec(),
                end_headers: header.flags & flags::END_HEADERS != 0,
            })),
            _ => Ok(None),
        }
    }

    /// Serialize this frame, rejecting a payload larger than
    /// `max_frame_size` (RFC 7540 §4.2).
    pub fn encode(&self, max_frame_size: u32) -> Result<Vec<u8>, H2Error> {
        let mut out = Vec::new();
        let (header, body) = self.header_and_body()?;
        if body.len() as u64 > max_frame_size as u64 {
            return Err(H2Error::FrameSize(format!(
                "frame payload of {} bytes exceeds max_frame_size {}",
                body.len(),
                max_frame_size
            )));
        }
        header.write(&mut out);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn header_and_body(&self) -> Result<(FrameHeader, Vec<u8>), H2Error> {
        let (frame_type, flags_byte, stream_id, body) = match self {
            Frame::Data { stream_id, data, end_stream, padded } => {
                let mut body = Vec::new();
                let mut flags_byte = 0;
                if let Some(pad_len) = padded {
                    flags_byte |= flags::PADDED;
                    body.push(*pad_len);
                }
                body.extend_from_slice(data);
                if let Some(pad_len) = padded {
                    body.extend(std::iter::repeat(0u8).take(*pad_len as usize));
                }
                if *end_stream {
                    flags_byte |= flags::END_STREAM;
                }
                (frame_type::DATA, flags_byte, *stream_id, body)
            }
            Frame::Headers { stream_id, header_block_fragment, end_stream, end_headers, priority, padded } => {
                let mut body = Vec::new();
                let mut flags_byte = 0;
                if let Some(pad_len) = padded {
                    flags_byte |= flags::PADDED;
                    body.push(*pad_len);
                }
                if let Some(p) = priority {
                    flags_byte |= flags::PRIORITY;
                    let dep = if p.exclusive { p.dependency | 0x8000_0000 } else { p.dependency & MAX_STREAM_ID };
                    body.extend_from_slice(&dep.to_be_bytes());
                    body.push((p.weight.saturating_sub(1)) as u8);
                }
                body.extend_from_slice(header_block_fragment);
                if let Some(pad_len) = padded {
                    body.extend(std::iter::repeat(0u8).take(*pad_len as usize));
                }
                if *end_stream {
                    flags_byte |= flags::END_STREAM;
                }
                if *end_headers {
                    flags_byte |= flags::END_HEADERS;
                }
                (frame_type::HEADERS, flags_byte, *stream_id, body)
            }
            Frame::Priority { stream_id, priority } => {
                let mut body = Vec::with_capacity(5);
                let dep = if priority.exclusive {
                    priority.dependency | 0x8000_0000
                } else {
                    priority.dependency & MAX_STREAM_ID
                };
                body.extend_from_slice(&dep.to_be_bytes());
                body.push((priority.weight.saturating_sub(1)) as u8);
                (frame_type::PRIORITY, 0, *stream_id, body)
            }
            Frame::RstStream { stream_id, error_code } => {
                (frame_type::RST_STREAM, 0, *stream_id, error_code.to_be_bytes().to_vec())
            }
            Frame::Settings { ack, params } => {
                let mut body = Vec::with_capacity(params.len() * 6);
                if !*ack {
                    for (id, value) in params {
                        body.extend_from_slice(&id.to_be_bytes());
                        body.extend_from_slice(&value.to_be_bytes());
                    }
                }
                let flags_byte = if *ack { flags::ACK } else { 0 };
                (frame_type::SETTINGS, flags_byte, 0, body)
            }
            Frame::PushPromise { stream_id, promised_stream_id, header_block_fragment, end_headers, padded } => {
                let mut body = Vec::new();
                let mut flags_byte = 0;
                if let Some(pad_len) = padded {
                    flags_byte |= flags::PADDED;
                    body.push(*pad_len);
                }
                body.extend_from_slice(&(promised_stream_id & MAX_STREAM_ID).to_be_bytes());
                body.extend_from_slice(header_block_fragment);
                if let Some(pad_len) = padded {
                    body.extend(std::iter::repeat(0u8).take(*pad_len as usize));
                }
                if *end_headers {
                    flags_byte |= flags::END_HEADERS;
                }
                (frame_type::PUSH_PROMISE, flags_byte, *stream_id, body)
            }
            Frame::Ping { ack, data } => {
                let flags_byte = if *ack { flags::ACK } else { 0 };
                (frame_type::PING, flags_byte, 0, data.to_vec())
            }
            Frame::GoAway { last_stream_id, error_code, debug_data } => {
                let mut body = Vec::with_capacity(8 + debug_data.len());
                body.extend_from_slice(&(last_stream_id & MAX_STREAM_ID).to_be_bytes());
                body.extend_from_slice(&error_code.to_be_bytes());
                body.extend_from_slice(debug_data);
                (frame_type::GOAWAY, 0, 0, body)
            }
            Frame::WindowUpdate { stream_id, increment } => {
                (frame_type::WINDOW_UPDATE, 0, *stream_id, (increment & MAX_STREAM_ID).to_be_bytes().to_vec())
            }
            Frame::Continuation { stream_id, header_block_fragment, end_headers } => {
                let flags_byte = if *end_headers { flags::END_HEADERS } else { 0 };
                (frame_type::CONTINUATION, flags_byte, *stream_id, header_block_fragment.clone())
            }
        };
        let header = FrameHeader { length: body.len() as u32, frame_type, flags: flags_byte, stream_id };
        Ok((header, body))
    }
}

fn strip_padding<'a>(header: &FrameHeader, payload: &'a [u8]) -> Result<&'a [u8], H2Error> {
    if header.flags & flags::PADDED == 0 {
        return Ok(payload);
    }
    let &pad_len = payload.first().ok_or_else(|| H2Error::Protocol("PADDED frame with no payload".into()))?;
    let pad_len = pad_len as usize;
    let rest = &payload[1..];
    if pad_len >= rest.len() + 1 {
        return Err(H2Error::Protocol("pad length exceeds frame payload".into()));
    }
    Ok(&rest[..rest.len() - pad_len])
}

fn parse_data(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    let padded = if header.flags & flags::PADDED != 0 { payload.first().copied() } else { None };
    let data = strip_padding(header, payload)?.to_vec();
    Ok(Frame::Data {
        stream_id: header.stream_id,
        data,
        end_stream: header.flags & flags::END_STREAM != 0,
        padded,
    })
}

fn parse_headers(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    let padded = if header.flags & flags::PADDED != 0 { payload.first().copied() } else { None };
    let mut rest = strip_padding(header, payload)?;

    let priority = if header.flags & flags::PRIORITY != 0 {
        if rest.len() < 5 {
            return Err(H2Error::FrameSize("HEADERS PRIORITY fields truncated".into()));
        }
        let raw = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let exclusive = raw & 0x8000_0000 != 0;
        let dependency = raw & MAX_STREAM_ID;
        let weight = rest[4] as u16 + 1;
        rest = &rest[5..];
        Some(Priority { dependency, exclusive, weight })
    } else {
        None
    };

    Ok(Frame::Headers {
        stream_id: header.stream_id,
        header_block_fragment: rest.to_vec(),
        end_stream: header.flags & flags::END_STREAM != 0,
        end_headers: header.flags & flags::END_HEADERS != 0,
        priority,
        padded,
    })
}

fn parse_priority(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if payload.len() != 5 {
        return Err(H2Error::FrameSize(format!("PRIORITY payload must be 5 bytes, got {}", payload.len())));
    }
    let raw = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let exclusive = raw & 0x8000_0000 != 0;
    let dependency = raw & MAX_STREAM_ID;
    let weight = payload[4] as u16 + 1;
    Ok(Frame::Priority { stream_id: header.stream_id, priority: Priority { dependency, exclusive, weight } })
}

fn parse_rst_stream(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if payload.len() != 4 {
        return Err(H2Error::FrameSize(format!("RST_STREAM payload must be 4 bytes, got {}", payload.len())));
    }
    let error_code = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    Ok(Frame::RstStream { stream_id: header.stream_id, error_code })
}

fn parse_settings(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if header.stream_id != 0 {
        return Err(H2Error::Protocol("SETTINGS frame must use stream 0".into()));
    }
    let ack = header.flags & flags::ACK != 0;
    if ack {
        if !payload.is_empty() {
            return Err(H2Error::FrameSize("SETTINGS ACK must have an empty payload".into()));
        }
        return Ok(Frame::Settings { ack: true, params: Vec::new() });
    }
    if payload.len() % 6 != 0 {
        return Err(H2Error::FrameSize("SETTINGS payload must be a multiple of 6 bytes".into()));
    }
    let mut params = Vec::with_capacity(payload.len() / 6);
    let mut pos = 0;
    while pos < payload.len() {
        let id = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
        let value = u32::from_be_bytes([payload[pos + 2], payload[pos + 3], payload[pos + 4], payload[pos + 5]]);
        params.push((id, value));
        pos += 6;
    }
    Ok(Frame::Settings { ack: false, params })
}

fn parse_push_promise(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    let padded = if header.flags & flags::PADDED != 0 { payload.first().copied() } else { None };
    let rest = strip_padding(header, payload)?;
    if rest.len() < 4 {
        return Err(H2Error::FrameSize("PUSH_PROMISE payload truncated".into()));
    }
    let promised_stream_id = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) & MAX_STREAM_ID;
    Ok(Frame::PushPromise {
        stream_id: header.stream_id,
        promised_stream_id,
        header_block_fragment: rest[4..].to_vec(),
        end_headers: header.flags & flags::END_HEADERS != 0,
        padded,
    })
}

fn parse_ping(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if header.stream_id != 0 {
        return Err(H2Error::Protocol("PING frame must use stream 0".into()));
    }
    if payload.len() != 8 {
        return Err(H2Error::FrameSize(format!("PING payload must be 8 bytes, got {}", payload.len())));
    }
    let mut data = [0u8; 8];
    data.copy_from_slice(payload);
    Ok(Frame::Ping { ack: header.flags & flags::ACK != 0, data })
}

fn parse_goaway(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if header.stream_id != 0 {
        return Err(H2Error::Protocol("GOAWAY frame must use stream 0".into()));
    }
    if payload.len() < 8 {
        return Err(H2Error::FrameSize(format!("GOAWAY payload must be at least 8 bytes, got {}", payload.len())));
    }
    let last_stream_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & MAX_STREAM_ID;
    let error_code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Ok(Frame::GoAway { last_stream_id, error_code, debug_data: payload[8..].to_vec() })
}

fn parse_window_update(header: &FrameHeader, payload: &[u8]) -> Result<Frame, H2Error> {
    if payload.len() != 4 {
        return Err(H2Error::FrameSize(format!("WINDOW_UPDATE payload must be 4 bytes, got {}", payload.len())));
    }
    let increment = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & MAX_STREAM_ID;
    if increment == 0 {
        return Err(H2Error::Protocol("WINDOW_UPDATE increment must not be zero".into()));
    }
    Ok(Frame::WindowUpdate { stream_id: header.stream_id, increment })
}
