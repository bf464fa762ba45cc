//! ID prefix constants.
//!
//! Every row gets a prefixed random ID (e.g., `"ths-a3f8b2c1"`), generated in
//! SQL by `ThesiaDb::generate_id`. Actor IDs (professors, students, the
//! secretary) come from the external identity layer and are stored verbatim.

pub const PREFIX_TOPIC: &str = "top";
pub const PREFIX_THESIS: &str = "ths";
pub const PREFIX_INVITATION: &str = "inv";
pub const PREFIX_HISTORY: &str = "hst";

/// All prefixes minted by this system, for exhaustive tests.
pub const ALL_PREFIXES: &[&str] = &[PREFIX_TOPIC, PREFIX_THESIS, PREFIX_INVITATION, PREFIX_HISTORY];
