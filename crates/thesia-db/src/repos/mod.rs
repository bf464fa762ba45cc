//! Repository modules implementing Thesia operations.
//!
//! Each module adds methods to `ThesiaService` via `impl ThesiaService` blocks.

pub mod committee;
pub mod history;
pub mod thesis;
pub mod topic;
