//! Undo/redo history over compressed graph snapshots
//!
//! Each discrete editor commit pushes a serialized [`GraphData`] which is
//! stored zstd-compressed in a bounded ring. A cursor marks the snapshot
//! the editor currently shows.

use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::error::{AutomationError, Result};
use crate::types::GraphData;

/// Bounded snapshot ring with a cursor
pub struct HistoryManager {
    snapshots: VecDeque<Vec<u8>>,
    cursor: usize,
    capacity: usize,
    level: i32,
}

impl HistoryManager {
    /// Create a history holding at most `capacity` snapshots
    pub fn new(capacity: usize) -> Self {
        Self::with_config(&HistoryConfig {
            capacity,
            ..HistoryConfig::default()
        })
    }

    pub fn with_config(config: &HistoryConfig) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            capacity: config.capacity.max(1),
            level: config.compression_level,
        }
    }

    /// Record a snapshot at the cursor
    ///
    /// Any redo branch past the cursor is discarded; the oldest snapshot is
    /// evicted when the ring is full.
    pub fn push(&mut self, snapshot: &GraphData) -> Result<()> {
        let json = serde_json::to_vec(snapshot)?;
        let compressed = zstd::encode_all(&json[..], self.level)
            .map_err(|e| AutomationError::Compression(e.to_string()))?;

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push_back(compressed);

        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;

        log::trace!(
            "History push: {} snapshot(s), {} bytes",
            self.snapshots.len(),
            self.compressed_size()
        );
        Ok(())
    }

    /// Step back one snapshot; `None` at the earliest entry
    pub fn undo(&mut self) -> Option<Result<GraphData>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.decompress(self.cursor))
    }

    /// Step forward one snapshot; `None` at the latest entry
    pub fn redo(&mut self) -> Option<Result<GraphData>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.decompress(self.cursor))
    }

    /// Snapshot at the cursor, without moving it
    pub fn current(&self) -> Option<Result<GraphData>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.decompress(self.cursor))
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the current snapshot
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every snapshot
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }

    /// Total bytes held by compressed snapshots
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(Vec::len).sum()
    }

    fn decompress(&self, index: usize) -> Result<GraphData> {
        let compressed = self
            .snapshots
            .get(index)
            .ok_or_else(|| AutomationError::Compression(format!("no snapshot at {}", index)))?;
        let json = zstd::decode_all(&compressed[..])
            .map_err(|e| AutomationError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::with_config(&HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeConfig, NodeRecord, Point};

    fn snapshot(tag: &str) -> GraphData {
        GraphData {
            nodes: vec![NodeRecord {
                id: tag.to_string(),
                module_id: "proc".to_string(),
                position: Point::default(),
                config: NodeConfig::new(),
            }],
            edges: vec![],
        }
    }

    fn tag(data: GraphData) -> String {
        data.nodes[0].id.clone()
    }

    #[test]
    fn test_undo_redo_walk() {
        let mut history = HistoryManager::new(10);
        for name in ["a", "b", "c"] {
            history.push(&snapshot(name)).unwrap();
        }

        assert_eq!(tag(history.current().unwrap().unwrap()), "c");
        assert_eq!(tag(history.undo().unwrap().unwrap()), "b");
        assert_eq!(tag(history.undo().unwrap().unwrap()), "a");
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), 0);

        assert_eq!(tag(history.redo().unwrap().unwrap()), "b");
        assert_eq!(tag(history.redo().unwrap().unwrap()), "c");
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut history = HistoryManager::new(10);
        history.push(&snapshot("a")).unwrap();
        history.push(&snapshot("b")).unwrap();
        history.undo();

        history.push(&snapshot("c")).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(tag(history.undo().unwrap().unwrap()), "a");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryManager::new(3);
        for i in 0..5 {
            history.push(&snapshot(&format!("s{}", i))).unwrap();
        }

        assert_eq!(history.len(), 3);
        assert_eq!(tag(history.current().unwrap().unwrap()), "s4");
        history.undo();
        assert_eq!(tag(history.undo().unwrap().unwrap()), "s2");
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_empty_history() {
        let mut history = HistoryManager::default();
        assert_eq!(history.capacity(), crate::constants::history::CAPACITY);
        assert!(history.is_empty());
        assert!(history.current().is_none());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());

        history.push(&snapshot("only")).unwrap();
        assert!(!history.can_undo());
        assert!(history.compressed_size() > 0);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.compressed_size(), 0);
    }
}
