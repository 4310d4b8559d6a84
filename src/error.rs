//! Error taxonomy for the HTTP/2 engine.
//!
//! Errors are split along scope (connection-fatal vs. stream-local) and
//! origin (peer misbehaviour vs. local misuse). [`H2Error`] carries enough
//! information for a caller to decide whether to emit GOAWAY, RST_STREAM,
//! or simply propagate a local-misuse error with no wire effect.

use thiserror::Error;

/// HTTP/2 error codes (RFC 7540 §7), used on the wire in RST_STREAM and
/// GOAWAY frames.
#[allow(dead_code)]
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}

/// Top-level error type surfaced to the embedder.
#[derive(Debug, Error)]
pub enum H2Error {
    /// The connection preface was missing or malformed.
    #[error("handshake error: {0}")]
    Handshake(String),

    /// A peer protocol violation at connection scope (malformed frame,
    /// CONTINUATION sequencing, stream-id ordering, a second GOAWAY).
    /// Connection-fatal.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A peer protocol violation scoped to one stream (bad pseudo-headers,
    /// a content-length mismatch, an illegal trailer). Resolved with a local
    /// RST_STREAM; the connection survives.
    #[error("stream protocol error: {0}")]
    StreamProtocol(String),

    /// An HPACK compression failure. Always connection-fatal.
    #[error("compression error: {0}")]
    Compression(#[from] HpackError),

    /// A flow-control invariant was violated.
    #[error("flow control error: {0}")]
    FlowControl(String),

    /// An invariant internal to this engine was violated (a bug).
    #[error("internal error: {0}")]
    Internal(String),

    /// The frame's length or a sub-field length failed validation.
    #[error("frame size error: {0}")]
    FrameSize(String),

    /// A frame arrived for a stream that is already closed.
    #[error("stream {0} is closed")]
    StreamClosed(u32),

    /// The connection has already sent or received GOAWAY.
    #[error("connection is closed")]
    ConnectionClosed,

    /// Caller tried to open more streams than the peer's
    /// `max_concurrent_streams` allows. Local-only; nothing is sent.
    #[error("stream limit exceeded: {current} >= {limit}")]
    StreamLimitExceeded { current: u32, limit: u32 },
}

impl H2Error {
    /// The wire error code this error maps to, for GOAWAY/RST_STREAM framing.
    pub fn code(&self) -> u32 {
        match self {
            H2Error::Handshake(_) => error_code::PROTOCOL_ERROR,
            H2Error::Protocol(_) => error_code::PROTOCOL_ERROR,
            H2Error::StreamProtocol(_) => error_code::PROTOCOL_ERROR,
            H2Error::Compression(_) => error_code::COMPRESSION_ERROR,
            H2Error::FlowControl(_) => error_code::FLOW_CONTROL_ERROR,
            H2Error::Internal(_) => error_code::INTERNAL_ERROR,
            H2Error::FrameSize(_) => error_code::FRAME_SIZE_ERROR,
            H2Error::StreamClosed(_) => error_code::STREAM_CLOSED,
            H2Error::ConnectionClosed => error_code::NO_ERROR,
            H2Error::StreamLimitExceeded { .. } => error_code::REFUSED_STREAM,
        }
    }

    /// True if this error is connection-fatal (must trigger GOAWAY and close).
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            H2Error::Handshake(_)
                | H2Error::Protocol(_)
                | H2Error::Compression(_)
                | H2Error::FrameSize(_)
        ) || matches!(self, H2Error::FlowControl(reason) if reason.starts_with("connection"))
    }
}

/// Failures specific to HPACK decode/encode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HpackError {
    #[error("HPACK integer overflowed the decoder's shift cap")]
    IntegerOverflow,

    #[error("truncated HPACK integer")]
    TruncatedInteger,

    #[error("index 0 is not a valid HPACK index")]
    InvalidIndex,

    #[error("HPACK index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("invalid Huffman padding")]
    InvalidHuffmanPadding,

    #[error("Huffman stream decoded the EOS symbol")]
    HuffmanEos,

    #[error("truncated header block")]
    TruncatedBlock,

    #[error("dynamic table size update did not appear at the start of the header block")]
    SizeUpdateNotAtStart,

    #[error("dynamic table size update exceeds the settings-advertised bound")]
    SizeUpdateExceedsBound,
}

pub type HpackResult<T> = Result<T, HpackError>;
pub type H2Result<T> = Result<T, H2Error>;
