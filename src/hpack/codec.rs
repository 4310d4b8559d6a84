//! HPACK header block encoder/decoder, built on top of the integer
//! codec, Huffman codec, and header table.

use super::integer;
use super::table::{HpackContext, STATIC_NEVER};
use crate::huffman;
use crate::error::{HpackError, HpackResult};

/// A single decoded header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl Header {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Whether a header should be indexed into the dynamic table when encoded,
/// mirroring RFC 7541's literal-representation indexing types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    /// Store in the dynamic table for future reuse (`incremental`).
    Incremental,
    /// Literal, not stored, but re-compressible by a proxy (`noindex`).
    NoIndex,
    /// Literal, never stored, and must not be re-indexed downstream —
    /// forced for `STATIC_NEVER` names regardless of the caller's request.
    NeverIndexed,
}

/// Huffman-use policy for literal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuffmanPolicy {
    Always,
    Never,
    #[default]
    Shorter,
}

/// Index-use policy: which tables the encoder may reuse entries from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    #[default]
    All,
    StaticOnly,
    Never,
}

/// Encoder configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderConfig {
    pub huffman: HuffmanPolicy,
    pub index: IndexPolicy,
}

/// A per-connection HPACK decoder. Owns the shared [`HpackContext`].
pub struct Decoder {
    ctx: HpackContext,
}

impl Decoder {
    pub fn new(dynamic_table_limit: usize) -> Self {
        Self { ctx: HpackContext::new(dynamic_table_limit) }
    }

    /// Apply a new settings_header_table_size, as directed by an acked
    /// inbound SETTINGS frame on our side (i.e. our own HPACK table that
    /// the peer's encoder must respect).
    pub fn set_max_dynamic_table_size(&mut self, new_cap: usize) {
        self.ctx.dynamic.set_hard_cap(new_cap);
    }

    pub fn context(&self) -> &HpackContext {
        &self.ctx
    }

    /// Decode a complete header block into an ordered list of headers.
    ///
    /// Per RFC 7541 §4.2, all dynamic-table-size-update commands must occur
    /// contiguously at the start of the block; encountering one afterward
    /// is a [`HpackError::SizeUpdateNotAtStart`].
    pub fn decode(&mut self, block: &[u8]) -> HpackResult<Vec<Header>> {
        let mut headers = Vec::new();
        let mut pos = 0;
        let mut seen_non_size_update = false;

        while pos < block.len() {
            let byte = block[pos];

            if byte & 0x80 != 0 {
                // 1xxxxxxx: indexed header field, 7-bit prefix.
                seen_non_size_update = true;
                let (index, consumed) = integer::decode(&block[pos..], 7)?;
                pos += consumed;
                let (name, value) = self.ctx.lookup(index)?;
                headers.push(Header::new(name.to_vec(), value.to_vec()));
            } else if byte & 0x40 != 0 {
                // 01xxxxxx: literal with incremental indexing, 6-bit prefix.
                seen_non_size_update = true;
                let (index, consumed) = integer::decode(&block[pos..], 6)?;
                pos += consumed;
                let (name, value, read) = self.decode_literal(&block[pos..], index)?;
                pos += read;
                self.ctx.dynamic.insert(name.clone(), value.clone());
                headers.push(Header { name, value });
            } else if byte & 0x20 != 0 {
                // 001xxxxx: dynamic table size update, 5-bit prefix.
                if seen_non_size_update {
                    return Err(HpackError::SizeUpdateNotAtStart);
                }
                let (new_size, consumed) = integer::decode(&block[pos..], 5)?;
                pos += consumed;
                self.ctx.dynamic.apply_size_update(new_size)?;
            } else if byte & 0x10 != 0 {
                // 0001xxxx: literal never indexed, 4-bit prefix.
                seen_non_size_update = true;
                let (index, consumed) = integer::decode(&block[pos..], 4)?;
                pos += consumed;
                let (name, value, read) = self.decode_literal(&block[pos..], index)?;
                pos += read;
                headers.push(Header { name, value });
            } else {
                // 0000xxxx: literal without indexing, 4-bit prefix.
                seen_non_size_update = true;
                let (index, consumed) = integer::decode(&block[pos..], 4)?;
                pos += consumed;
                let (name, value, read) = self.decode_literal(&block[pos..], index)?;
                pos += read;
                headers.push(Header { name, value });
            }
        }

        Ok(headers)
    }

    /// Decode the (name, value) pair of a literal command. `index == 0`
    /// means the name itself is a literal string; otherwise it's
    /// dereferenced from the table.
    fn decode_literal(&self, data: &[u8], index: usize) -> HpackResult<(Vec<u8>, Vec<u8>, usize)> {
        let mut pos = 0;
        let name = if index == 0 {
            let (name, read) = decode_string(&data[pos..])?;
            pos += read;
            name
        } else {
            let (name, _) = self.ctx.lookup(index)?;
            name.to_vec()
        };
        let (value, read) = decode_string(&data[pos..])?;
        pos += read;
        Ok((name, value, pos))
    }
}

/// Decode a length-prefixed string: a 7-bit-prefix integer length with the
/// high bit of that first byte signaling Huffman encoding, followed by
/// that many octets of (possibly Huffman-coded) string data.
fn decode_string(data: &[u8]) -> HpackResult<(Vec<u8>, usize)> {
    if data.is_empty() {
        return Err(HpackError::TruncatedBlock);
    }
    let huffman_coded = data[0] & 0x80 != 0;
    let (len, consumed) = integer::decode(data, 7)?;
    let end = consumed + len;
    let raw = data.get(consumed..end).ok_or(HpackError::TruncatedBlock)?;
    let bytes = if huffman_coded { huffman::decode(raw)? } else { raw.to_vec() };
    Ok((bytes, end))
}

/// Encode a length-prefixed string, honoring the encoder's Huffman policy.
fn encode_string(value: &[u8], policy: HuffmanPolicy) -> Vec<u8> {
    let use_huffman = match policy {
        HuffmanPolicy::Always => true,
        HuffmanPolicy::Never => false,
        HuffmanPolicy::Shorter => huffman::encoded_len(value) < value.len(),
    };

    let (payload, prefix_byte): (std::borrow::Cow<[u8]>, u8) = if use_huffman {
        (huffman::encode(value).into(), 0x80)
    } else {
        (value.into(), 0x00)
    };

    let mut out = integer::encode(payload.len(), 7, prefix_byte);
    out.extend_from_slice(&payload);
    out
}

/// A per-connection HPACK encoder. Owns the shared [`HpackContext`] and a
/// pending dynamic-table-size-update to emit at the top of the next block:
/// whenever settings_header_table_size changes, the encoder must emit a
/// dynamic-table-size-update at the top of the next header block.
pub struct Encoder {
    ctx: HpackContext,
    config: EncoderConfig,
    pending_size_update: Option<usize>,
}

impl Encoder {
    pub fn new(dynamic_table_limit: usize) -> Self {
        Self {
            ctx: HpackContext::new(dynamic_table_limit),
            config: EncoderConfig::default(),
            pending_size_update: None,
        }
    }

    pub fn with_config(dynamic_table_limit: usize, config: EncoderConfig) -> Self {
        Self { config, ..Self::new(dynamic_table_limit) }
    }

    pub fn set_config(&mut self, config: EncoderConfig) {
        self.config = config;
    }

    /// Record that the peer's settings_header_table_size changed; the next
    /// `encode` call will emit a size-update command before any headers.
    pub fn notify_max_dynamic_table_size(&mut self, new_size: usize) {
        self.ctx.dynamic.set_hard_cap(new_size);
        self.pending_size_update = Some(new_size);
    }

    pub fn context(&self) -> &HpackContext {
        &self.ctx
    }

    /// Encode a full ordered header list into one header block.
    pub fn encode(&mut self, headers: &[Header]) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(size) = self.pending_size_update.take() {
            out.extend(integer::encode(size, 5, 0b0010_0000));
        }

        for header in headers {
            self.encode_one(&mut out, header);
        }

        out
    }

    fn encode_one(&mut self, out: &mut Vec<u8>, header: &Header) {
        if let Some(index) = self.ctx.find_full_match(&header.name, &header.value) {
            out.extend(integer::encode(index, 7, 0x80));
            return;
        }

        let forced_never = STATIC_NEVER.iter().any(|&n| n.as_bytes() == header.name.as_slice());
        let indexing = if forced_never {
            Indexing::NeverIndexed
        } else {
            match self.config.index {
                IndexPolicy::Never => Indexing::NoIndex,
                IndexPolicy::All | IndexPolicy::StaticOnly => Indexing::Incremental,
            }
        };

        let name_index = match self.config.index {
            IndexPolicy::Never => None,
            IndexPolicy::StaticOnly => {
                self.ctx.find_name_match(&header.name).filter(|&i| i <= super::table::STATIC_TABLE.len())
            }
            IndexPolicy::All => self.ctx.find_name_match(&header.name),
        };

        let (prefix_bits, prefix_tag): (u8, u8) = match indexing {
            Indexing::Incremental => (6, 0b0100_0000),
            Indexing::NoIndex => (4, 0b0000_0000),
            Indexing::NeverIndexed => (4, 0b0001_0000),
        };

        match name_index {
            Some(index) => out.extend(integer::encode(index, prefix_bits, prefix_tag)),
            None => {
                out.extend(integer::encode(0, prefix_bits, prefix_tag));
                out.extend(encode_string(&header.name, self.config.huffman));
            }
        }
        out.extend(encode_string(&header.value, self.config.huffman));

        if indexing == Indexing::Incremental {
            self.ctx.dynamic.insert(header.name.clone(), header.value.clone());
        }
    }
}
