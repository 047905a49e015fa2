//! Decoders for Internet Explorer Automatic Crash Recovery artifacts.
//!
//! IE keeps crash-recovery state in OLE compound documents: one
//! `RecoveryStore*.dat` per browsing session, plus one `{GUID}.dat` per tab.
//! This crate turns those containers into auditable records: session
//! open/close times, InPrivate detection, tab pointer lists, per-tab travel
//! logs and recovered page URLs/titles.
//!
//! The two entry points are [`decode_session`] and [`decode_tab`]; both are
//! independent, so a tab can be decoded without its owning session.
//! Forensic inputs are frequently partially corrupted, which drives the
//! error model: malformed identifiers and missing properties degrade to
//! sentinels (nil GUID, unknown time), while read and format failures are
//! surfaced per container and never abort sibling work.

pub mod container;
pub mod err;
pub mod guid;
pub mod natural_sort;
pub mod session;
pub mod strings;
pub mod tab;
pub mod timestamp;

pub use err::{AcrError, Result};
pub use guid::Guid;
pub use session::{SessionRecord, decode_session};
pub use tab::{DecodeOptions, PageError, PageRecord, TabRecord, decode_tab};
