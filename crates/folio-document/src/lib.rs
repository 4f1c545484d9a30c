// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — The ordered document collection.
//
// The registry owns the list of source documents in assembly order and hands
// out stable ids; the reorder engine computes moves purely from ids so that a
// drag started before a removal still lands correctly.

pub mod registry;
pub mod reorder;

pub use registry::DocumentRegistry;
pub use reorder::{Direction, move_entry};
