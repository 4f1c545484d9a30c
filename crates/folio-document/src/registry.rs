// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document registry: the ordered collection of source documents.
//
// Insertion order is the merge order. Ids are minted on `add` and are the
// only key for removal, reordering and metadata updates; paths may repeat.

use tracing::{debug, info};

use folio_core::types::{DocumentEntry, DocumentMetadata, EntryId, NewDocument};

use crate::reorder::{self, Direction};

/// Ordered collection of document entries with unique ids.
///
/// Owned by the UI-facing caller. Jobs take a value snapshot of it and never
/// write back.
#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    entries: Vec<DocumentEntry>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents at the end, each with a fresh id and unknown page
    /// count. Never fails; duplicate paths get distinct ids.
    pub fn add(&mut self, documents: impl IntoIterator<Item = NewDocument>) -> Vec<EntryId> {
        let start = self.entries.len();
        self.entries.extend(documents.into_iter().map(|doc| DocumentEntry {
            id: EntryId::new(),
            display_name: doc.display_name,
            source_path: doc.source_path,
            page_count: 0,
            byte_size: doc.byte_size,
            thumbnail: None,
            selected_pages: doc.selected_pages,
        }));

        let ids: Vec<EntryId> = self.entries[start..].iter().map(|e| e.id).collect();
        info!(added = ids.len(), total = self.entries.len(), "documents added");
        ids
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        debug!(entry_id = %id, removed, "remove document");
        removed
    }

    pub fn clear(&mut self) {
        info!(cleared = self.entries.len(), "document list cleared");
        self.entries.clear();
    }

    /// Stable ascending sort by display name (case-sensitive, code point
    /// order). Idempotent.
    pub fn sort_by_name(&mut self) {
        self.entries
            .sort_by(|a, b| a.display_name.cmp(&b.display_name));
    }

    pub fn reverse(&mut self) {
        self.entries.reverse();
    }

    /// Drag-and-drop move. Returns whether the order changed.
    pub fn move_entry(&mut self, from: EntryId, to: EntryId) -> bool {
        let moved = reorder::move_entry(&self.entries, from, to);
        let changed = moved != self.entries;
        self.entries = moved;
        debug!(from = %from, to = %to, changed, "move document");
        changed
    }

    /// Keyboard move by one slot. Returns whether the order changed.
    pub fn shift(&mut self, id: EntryId, direction: Direction) -> bool {
        match reorder::neighbour(&self.entries, id, direction) {
            Some(target) => self.move_entry(id, target),
            None => false,
        }
    }

    /// Fill in lazily resolved metadata.
    ///
    /// A no-op if the entry was removed while the lookup was in flight.
    /// Unknown values (0 / `None`) never overwrite known ones.
    pub fn resolve_metadata(&mut self, id: EntryId, metadata: DocumentMetadata) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            debug!(entry_id = %id, "metadata for removed document dropped");
            return false;
        };

        if metadata.page_count > 0 {
            entry.page_count = metadata.page_count;
        }
        if metadata.byte_size > 0 {
            entry.byte_size = metadata.byte_size;
        }
        if metadata.thumbnail.is_some() {
            entry.thumbnail = metadata.thumbnail;
        }
        true
    }

    pub fn get(&self, id: EntryId) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of known page counts.
    pub fn total_pages(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.page_count)).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn doc(name: &str) -> NewDocument {
        NewDocument::new(name, format!("/docs/{name}"), 0)
    }

    fn names(registry: &DocumentRegistry) -> Vec<&str> {
        registry.entries().iter().map(|e| e.display_name.as_str()).collect()
    }

    fn assert_unique(registry: &DocumentRegistry) {
        let ids: HashSet<_> = registry.ids().into_iter().collect();
        assert_eq!(ids.len(), registry.len(), "duplicate ids");
    }

    #[test]
    fn add_appends_with_fresh_ids() {
        let mut registry = DocumentRegistry::new();
        let first = registry.add([doc("a.pdf"), doc("b.pdf")]);
        let second = registry.add([doc("a.pdf")]);

        assert_eq!(names(&registry), ["a.pdf", "b.pdf", "a.pdf"]);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(!first.contains(&second[0]));
        assert!(registry.entries().iter().all(|e| e.page_count == 0));
        assert_unique(&registry);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([doc("a.pdf")]);
        assert!(!registry.remove(EntryId::new()));
        assert!(registry.remove(ids[0]));
        assert!(!registry.remove(ids[0]));
        assert!(registry.is_empty());
    }

    #[test]
    fn sort_then_reverse_is_descending() {
        let mut registry = DocumentRegistry::new();
        registry.add([doc("c.pdf"), doc("a.pdf"), doc("B.pdf"), doc("b.pdf")]);

        registry.sort_by_name();
        assert_eq!(names(&registry), ["B.pdf", "a.pdf", "b.pdf", "c.pdf"]);

        let sorted = registry.entries().to_vec();
        registry.sort_by_name();
        assert_eq!(registry.entries(), sorted.as_slice());

        registry.reverse();
        assert_eq!(names(&registry), ["c.pdf", "b.pdf", "a.pdf", "B.pdf"]);
    }

    #[test]
    fn sort_keeps_ids() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([doc("z.pdf"), doc("y.pdf")]);
        registry.sort_by_name();
        assert_eq!(registry.ids(), vec![ids[1], ids[0]]);
    }

    #[test]
    fn sort_is_stable_for_equal_names() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([doc("same.pdf"), doc("other.pdf"), doc("same.pdf")]);
        registry.sort_by_name();
        assert_eq!(registry.ids(), vec![ids[1], ids[0], ids[2]]);
    }

    #[test]
    fn shift_moves_one_slot() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([doc("a"), doc("b"), doc("c")]);

        assert!(registry.shift(ids[0], Direction::Down));
        assert_eq!(names(&registry), ["b", "a", "c"]);

        assert!(registry.shift(ids[2], Direction::Up));
        assert_eq!(names(&registry), ["b", "c", "a"]);

        assert!(!registry.shift(ids[1], Direction::Up));
    }

    #[test]
    fn metadata_for_removed_entry_is_dropped() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([doc("a.pdf"), doc("b.pdf")]);
        registry.remove(ids[0]);

        let meta = DocumentMetadata {
            page_count: 10,
            byte_size: 100,
            thumbnail: Some("thumb".into()),
        };
        assert!(!registry.resolve_metadata(ids[0], meta.clone()));
        assert!(registry.resolve_metadata(ids[1], meta));

        let b = registry.get(ids[1]).expect("present");
        assert_eq!(b.page_count, 10);
        assert_eq!(b.byte_size, 100);
        assert_eq!(b.thumbnail.as_deref(), Some("thumb"));
        assert_eq!(registry.total_pages(), 10);
    }

    #[test]
    fn unknown_metadata_does_not_clobber() {
        let mut registry = DocumentRegistry::new();
        let ids = registry.add([NewDocument::new("a.pdf", "/a.pdf", 512)]);
        registry.resolve_metadata(
            ids[0],
            DocumentMetadata {
                page_count: 3,
                ..Default::default()
            },
        );
        let a = registry.get(ids[0]).expect("present");
        assert_eq!(a.byte_size, 512);
        assert_eq!(a.page_count, 3);
    }

    /// Drive a long deterministic mix of add/remove/move and check that ids
    /// stay unique and that moves only permute.
    #[test]
    fn mixed_operations_keep_ids_unique() {
        let mut registry = DocumentRegistry::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for round in 0..500 {
            let ids = registry.ids();
            match next() % 4 {
                0 | 1 => {
                    registry.add([doc(&format!("doc-{round}.pdf"))]);
                }
                2 if !ids.is_empty() => {
                    registry.remove(ids[next() % ids.len()]);
                }
                _ if !ids.is_empty() => {
                    let before = registry.entries().to_vec();
                    let from = ids[next() % ids.len()];
                    let to = ids[next() % ids.len()];
                    registry.move_entry(from, to);

                    assert_eq!(registry.len(), before.len());
                    for entry in &before {
                        let after = registry.get(entry.id).expect("entry kept");
                        assert_eq!(after.display_name, entry.display_name);
                        assert_eq!(after.source_path, entry.source_path);
                    }
                }
                _ => {}
            }
            assert_unique(&registry);
        }
    }
}
