//! HPACK header table: the static table plus the per-connection
//! dynamic table with size-bounded FIFO eviction (RFC 7541 §2.3, §4).

use crate::error::{HpackError, HpackResult};
use std::collections::VecDeque;

/// The 61-entry static table (RFC 7541 Appendix A). Index 1 is
/// `:authority`; entries with an empty value carry only a name.
pub const STATIC_TABLE: &[(&str, &str)] = &[
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Header names that must always be encoded as `neverindexed`, regardless
/// of the encoder's configured index policy, because their values are
/// commonly sensitive (RFC 7541 §7.1 discussion).
pub const STATIC_NEVER: &[&str] = &["cookie", "authorization", "set-cookie", "proxy-authorization"];

/// Per-entry bookkeeping overhead counted toward table size (RFC 7541 §4.1).
const ENTRY_OVERHEAD: usize = 32;

fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

/// The dynamic table: a ring buffer where new entries are pushed at the
/// back (highest dynamic index) and eviction pops from the front (oldest,
/// lowest dynamic index), giving O(1) insert/evict/lookup-by-age.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    entries: VecDeque<(Vec<u8>, Vec<u8>)>,
    current_size: usize,
    /// The table's currently active size bound.
    /// Mutated either by a SETTINGS-driven call to `set_hard_cap` or by an
    /// in-block dynamic-table-size-update command via `apply_size_update`.
    limit: usize,
    /// The maximum `limit` may ever be set to: the last acked
    /// settings_header_table_size. An in-block size update above this is a
    /// protocol violation (RFC 7541 §6.3).
    hard_cap: usize,
}

impl DynamicTable {
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::new(), current_size: 0, limit, hard_cap: limit }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Insert a new entry, evicting from the oldest end (FIFO) until the
    /// invariant `current_table_size <= limit` holds. An entry larger than
    /// the limit by itself results in an empty table (RFC 7541 §4.4).
    pub fn insert(&mut self, name: Vec<u8>, value: Vec<u8>) {
        let size = entry_size(&name, &value);
        self.evict_to_fit(size);
        if size <= self.limit {
            self.current_size += size;
            self.entries.push_back((name, value));
        }
    }

    /// Apply a new settings_header_table_size, evicting immediately if it
    /// shrank below current occupancy. Also lowers `limit` if it now
    /// exceeds the new cap.
    pub fn set_hard_cap(&mut self, new_cap: usize) {
        self.hard_cap = new_cap;
        if self.limit > new_cap {
            self.limit = new_cap;
        }
        self.evict_to_fit(0);
    }

    /// Apply an in-header-block dynamic-table-size-update command. Rejects
    /// a size above the last-acked settings bound.
    pub fn apply_size_update(&mut self, new_size: usize) -> HpackResult<()> {
        if new_size > self.hard_cap {
            return Err(HpackError::SizeUpdateExceedsBound);
        }
        self.limit = new_size;
        self.evict_to_fit(0);
        Ok(())
    }

    fn evict_to_fit(&mut self, incoming: usize) {
        while self.current_size + incoming > self.limit {
            match self.entries.pop_front() {
                Some((n, v)) => self.current_size -= entry_size(&n, &v),
                None => break,
            }
        }
    }

    /// Dereference a dynamic-table index (0-based, 0 = newest).
    fn get(&self, age_index: usize) -> Option<&(Vec<u8>, Vec<u8>)> {
        let newest_first = self.entries.len().checked_sub(1)?.checked_sub(age_index)?;
        self.entries.get(newest_first)
    }
}

/// The combined static + dynamic header table used by both the encoder and
/// the decoder side of a connection's HPACK context.
#[derive(Debug, Clone)]
pub struct HpackContext {
    pub dynamic: DynamicTable,
}

impl HpackContext {
    pub fn new(dynamic_table_limit: usize) -> Self {
        Self { dynamic: DynamicTable::new(dynamic_table_limit) }
    }

    /// Total address space size: static entries are always addressable
    /// first, then dynamic entries (RFC 7541 §2.3.3).
    pub fn total_len(&self) -> usize {
        STATIC_TABLE.len() + self.dynamic.len()
    }

    /// Resolve a 1-based HPACK index into a borrowed (name, value) pair.
    pub fn lookup(&self, index: usize) -> HpackResult<(&[u8], &[u8])> {
        if index == 0 {
            return Err(HpackError::InvalidIndex);
        }
        if index <= STATIC_TABLE.len() {
            let (name, value) = STATIC_TABLE[index - 1];
            return Ok((name.as_bytes(), value.as_bytes()));
        }
        let dyn_idx = index - STATIC_TABLE.len() - 1;
        self.dynamic
            .get(dyn_idx)
            .map(|(n, v)| (n.as_slice(), v.as_slice()))
            .ok_or(HpackError::IndexOutOfRange(index))
    }

    /// Find an exact (name, value) match, returning its 1-based index.
    /// Searches the static table first (cheap, constant), then the dynamic
    /// table newest-first (most likely to hit for repeated headers).
    pub fn find_full_match(&self, name: &[u8], value: &[u8]) -> Option<usize> {
        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n.as_bytes() == name && v.as_bytes() == value {
                return Some(i + 1);
            }
        }
        for age in 0..self.dynamic.len() {
            if let Some((n, v)) = self.dynamic.get(age) {
                if n == name && v == value {
                    return Some(STATIC_TABLE.len() + age + 1);
                }
            }
        }
        None
    }

    /// Find a name-only match (static preferred, as it never needs a
    /// dynamic-table round trip), returning its 1-based index.
    pub fn find_name_match(&self, name: &[u8]) -> Option<usize> {
        for (i, &(n, _)) in STATIC_TABLE.iter().enumerate() {
            if n.as_bytes() == name {
                return Some(i + 1);
            }
        }
        for age in 0..self.dynamic.len() {
            if let Some((n, _)) = self.dynamic.get(age) {
                if n == name {
                    return Some(STATIC_TABLE.len() + age + 1);
                }
            }
        }
        None
    }
}
