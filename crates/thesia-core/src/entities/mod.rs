//! Entity structs for all Thesia domain objects.
//!
//! Each entity maps to a table in the libSQL database. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema validation.

mod history;
mod invitation;
mod thesis;
mod topic;

pub use history::StatusHistoryEntry;
pub use invitation::CommitteeInvitation;
pub use thesis::{GeneralAssembly, MAX_FINAL_GRADE, MIN_FINAL_GRADE, Thesis, validate_final_grade};
pub use topic::Topic;
