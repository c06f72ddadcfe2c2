// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Context-key association table (§4.8): tracks the most recent context
packet per stream id and attaches its key to subsequent signal-data
records.
*/

use std::collections::HashMap;

/// A caller-supplied function mapping a frame index to a context key. The
/// `{stream_id}` placeholder in its output is substituted before the key
/// is attached to a record.
pub type KeyFn = Box<dyn Fn(usize) -> String>;

/// Last-writer-wins map from stream id to the key of its governing context
/// packet, plus the configured orphan key for data seen before any context.
pub struct ContextKeyTable {
    keys: HashMap<u32, String>,
    key_fn: KeyFn,
    orphan_key: String,
}

impl ContextKeyTable {
    /// Builds an association table. `key_fn` renders a frame index into a
    /// context key (with `{stream_id}` left as a literal placeholder for
    /// `update` to substitute); `orphan_key` is attached to signal-data
    /// records whose stream id has no prior context.
    pub fn new(key_fn: KeyFn, orphan_key: impl Into<String>) -> ContextKeyTable {
        ContextKeyTable {
            keys: HashMap::new(),
            key_fn,
            orphan_key: orphan_key.into(),
        }
    }

    /// Records a context packet observed for `stream_id` at frame index
    /// `frame_index` (§4.8).
    pub fn update(&mut self, stream_id: u32, frame_index: usize) {
        let key = (self.key_fn)(frame_index).replace("{stream_id}", &stream_id.to_string());
        self.keys.insert(stream_id, key);
    }

    /// Looks up the key currently governing `stream_id`, or the orphan key
    /// if no context packet has been seen for it yet.
    pub fn lookup(&self, stream_id: u32) -> String {
        self.keys
            .get(&stream_id)
            .cloned()
            .unwrap_or_else(|| self.orphan_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ContextKeyTable {
        ContextKeyTable::new(Box::new(|f| format!("ctx-{f}")), "ORPHAN_DATA")
    }

    #[test]
    fn p7_attaches_most_recent_context_key_per_stream() {
        let mut t = table();
        t.update(1, 10);
        assert_eq!(t.lookup(1), "ctx-10");
        assert_eq!(t.lookup(1), "ctx-10");
        t.update(1, 20);
        assert_eq!(t.lookup(1), "ctx-20");
    }

    #[test]
    fn data_before_any_context_gets_orphan_key() {
        let t = table();
        assert_eq!(t.lookup(99), "ORPHAN_DATA");
    }

    #[test]
    fn stream_id_placeholder_is_substituted() {
        let mut t = ContextKeyTable::new(Box::new(|f| format!("prefix-{{stream_id}}-{f}")), "X");
        t.update(42, 3);
        assert_eq!(t.lookup(42), "prefix-42-3");
    }

    #[test]
    fn distinct_stream_ids_are_independent() {
        let mut t = table();
        t.update(1, 1);
        assert_eq!(t.lookup(2), "ORPHAN_DATA");
        assert_eq!(t.lookup(1), "ctx-1");
    }
}
