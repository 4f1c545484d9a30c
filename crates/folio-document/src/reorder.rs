// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reorder engine: id-addressed moves over a document sequence.
//
// Positions are always looked up against the sequence passed in, never
// cached, so a move computed after a concurrent removal is still correct.

use folio_core::types::{DocumentEntry, EntryId};

/// Keyboard reorder direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Move the entry `from` to the slot currently held by `to`.
///
/// The entry is removed and reinserted at `to`'s index, so moving down lands
/// it just after `to` and moving up lands it just before. Returns the input
/// unchanged when `from == to` or either id is absent.
pub fn move_entry(entries: &[DocumentEntry], from: EntryId, to: EntryId) -> Vec<DocumentEntry> {
    let mut moved = entries.to_vec();
    if from == to {
        return moved;
    }

    let (Some(from_idx), Some(to_idx)) = (position(entries, from), position(entries, to)) else {
        return moved;
    };

    let entry = moved.remove(from_idx);
    moved.insert(to_idx, entry);
    moved
}

/// Id of the entry adjacent to `id` in `direction`, if any.
pub fn neighbour(entries: &[DocumentEntry], id: EntryId, direction: Direction) -> Option<EntryId> {
    let idx = position(entries, id)?;
    let target = match direction {
        Direction::Up => idx.checked_sub(1)?,
        Direction::Down => idx + 1,
    };
    entries.get(target).map(|e| e.id)
}

fn position(entries: &[DocumentEntry], id: EntryId) -> Option<usize> {
    entries.iter().position(|e| e.id == id)
}
