//! h2-sans-io: a transport-agnostic HTTP/2 protocol engine
//!
//! This crate provides a synchronous, sans-I/O HTTP/2 implementation:
//! frame codec, HPACK compression, connection and stream state machines,
//! and bidirectional flow control. It owns no socket, no TLS, and no
//! thread — an embedder feeds it bytes and drains events.
//!
//! # Features
//!
//! - **Sans-I/O Design**: no async runtime, no blocking I/O of any kind
//! - **Pure Rust**: no C bindings, compiles to WASM
//! - **RFC 7540 / RFC 7541 Compliant**: full frame set, HPACK with a
//!   dynamic table and canonical Huffman coding
//! - **Flow Control**: connection- and stream-scoped windows with
//!   send-side buffering and fragmentation
//! - **CONTINUATION Assembly**: automatic header block reassembly
//!
//! # Quick Start
//!
//! ```rust
//! use h2_sans_io::{Connection, Role};
//!
//! let mut conn = Connection::new(Role::Server);
//! let request = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
//! conn.receive(request).unwrap();
//! for event in conn.drain_events() {
//!     // forward ConnEvent::Frame(bytes) to the transport, etc.
//!     let _ = event;
//! }
//! ```
//!
//! # Architecture
//!
//! This crate is intentionally minimal. It provides:
//! - Frame parsing and encoding (bytes <-> typed frames)
//! - HPACK compression and decompression
//! - Connection and stream state machines
//! - Flow-control accounting and outbound buffering
//!
//! It does NOT provide:
//! - TCP/UDP transport (you provide the bytes)
//! - TLS or ALPN negotiation (use rustls or similar, upstream of this crate)
//! - HTTP semantics (methods, status codes, routing)
//! - Threading or async scheduling

pub mod connection;
pub mod error;
pub mod event;
pub mod flow;
pub mod frame;
pub mod hpack;
pub mod huffman;
pub mod settings;
pub mod stream;

pub use connection::{Connection, Role};
pub use error::{error_code, H2Error, H2Result, HpackError, HpackResult};
pub use event::{CloseReason, ConnEvent, EventEmitter, StreamEvent};
pub use flow::{OutboundQueue, QueuedData, RecvWindow, SendWindow};
pub use frame::{flags, frame_type, settings_id, Frame, FrameHeader, Priority, CONNECTION_PREFACE};
pub use hpack::{H2Header, HpackContext, HpackDecoder, HpackEncoder};
pub use settings::Http2Settings;
pub use stream::{HeaderRole, Stream, StreamState};
