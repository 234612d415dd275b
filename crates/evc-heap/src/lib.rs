//! `evc-heap` — the priority queue behind every search in the workspace.
//!
//! # Crate layout
//!
//! | Module    | Contents                                         |
//! |-----------|--------------------------------------------------|
//! | [`fib`]   | `FibHeap<T>`, `HeapHandle`, `MergeOffset`        |
//! | [`error`] | `HeapError`, `HeapResult<T>`                     |
//!
//! Nodes live in one arena `Vec`; links are `u32` slot indices, and freed
//! slots are recycled through a free list.  A `HeapHandle` carries a slot
//! generation so a handle to a removed item is detected instead of aliasing
//! whatever reused the slot.

pub mod error;
pub mod fib;


pub use error::{HeapError, HeapResult};
pub use fib::{FibHeap, HeapHandle, MergeOffset};
