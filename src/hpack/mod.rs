//! HPACK: Header Compression for HTTP/2 (RFC 7541).
//!
//! This module owns the integer codec, the static/dynamic header table, and
//! the encoder/decoder built on top of them. The Huffman codec lives at the
//! crate root in [`crate::huffman`] since it has no HPACK-specific state.

pub mod codec;
pub mod integer;
pub mod table;

pub use codec::{Decoder as HpackDecoder, Encoder as HpackEncoder, EncoderConfig, Header as H2Header, HuffmanPolicy, Indexing, IndexPolicy};
pub use table::{HpackContext, DynamicTable, STATIC_TABLE, STATIC_NEVER};
