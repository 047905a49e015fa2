use std::path::{Path, PathBuf};

use jiff::Timestamp;
use log::debug;
use serde::Serialize;

use crate::container::Container;
use crate::err::Result;
use crate::guid::Guid;
use crate::timestamp::timestamp_from_guid;

// Property ids IE writes into the recovery-store property set.
const PROP_CLOSED_AT: u32 = 3;
const PROP_IN_PRIVATE: u32 = 5;
const PROP_OPENED_AT: u32 = 7;

/// Open-tab pointer streams are named `TS` plus a counter.
const OPEN_TAB_STREAM_PREFIX: &str = "TS";
const CLOSED_TAB_STREAM: &str = "ClosedTabList";

/// Everything recovered from one `RecoveryStore*.dat` container.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub source: PathBuf,
    pub opened_at: Option<Timestamp>,
    /// Equals `opened_at` when the session never closed cleanly.
    pub closed_at: Option<Timestamp>,
    pub private_browsing: bool,
    pub open_tabs: Vec<Guid>,
    pub closed_tabs: Vec<Guid>,
}

/// Decodes a recovery-store container into a [`SessionRecord`].
///
/// Any failure is this session's alone; callers processing a directory of
/// stores report it and move on to the siblings.
pub fn decode_session(path: impl AsRef<Path>) -> Result<SessionRecord> {
    let path = path.as_ref();
    let mut container = Container::open(path)?;

    let properties = container.property_set()?;
    let opened_at = properties
        .string(PROP_OPENED_AT)
        .and_then(timestamp_from_guid);
    let closed_at = properties
        .string(PROP_CLOSED_AT)
        .and_then(timestamp_from_guid);
    // Documented existence test: the id being present marks an InPrivate
    // session, whatever value it carries.
    let private_browsing = properties.contains(PROP_IN_PRIVATE);

    let mut open_tabs = Vec::new();
    let mut closed_tabs = Vec::new();
    for name in container.stream_names() {
        if name.starts_with(OPEN_TAB_STREAM_PREFIX) {
            open_tabs.extend(tab_pointers(&container.read_stream(&name)?));
        } else if name == CLOSED_TAB_STREAM {
            closed_tabs.extend(tab_pointers(&container.read_stream(&name)?));
        }
    }

    debug!(
        "session `{}`: {} open tabs, {} closed tabs, in_private={private_browsing}",
        path.display(),
        open_tabs.len(),
        closed_tabs.len(),
    );

    Ok(SessionRecord {
        source: path.to_path_buf(),
        opened_at,
        closed_at,
        private_browsing,
        open_tabs,
        closed_tabs,
    })
}

/// Slices a tab pointer stream into consecutive 16-byte identifier windows.
/// Nil windows are list terminators and are skipped, never resolved to a
/// file; a short trailing window decodes to nil and is dropped the same way.
pub(crate) fn tab_pointers(data: &[u8]) -> Vec<Guid> {
    data.chunks(16)
        .map(Guid::from_slice)
        .filter(|guid| !guid.is_nil())
        .collect()
}
