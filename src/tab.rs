use std::path::{Path, PathBuf};

use jiff::Timestamp;
use log::{debug, warn};
use serde::Serialize;

use crate::container::Container;
use crate::err::Result;
use crate::guid::Guid;
use crate::natural_sort::natural_cmp;
use crate::strings::extract_page_fields;
use crate::timestamp::timestamp_from_guid;

/// In tab data files, property id 3 holds the index of the page the tab was
/// showing when the session died.
const PROP_CURRENT_PAGE: u32 = 3;

const TRAVEL_LOG_STREAM: &str = "TravelLog";
/// Page streams are `TL` plus a short numeric suffix; the length bound keeps
/// longer unrelated names (like `TravelLog` itself) out.
const PAGE_STREAM_PREFIX: &str = "TL";
const PAGE_STREAM_MAX_NAME_LEN: usize = 6;

/// Per-call configuration, threaded explicitly instead of living in global
/// state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Collect every recovered string per page, not just URL and title.
    /// The extra strings may include referrers, form values and credentials.
    pub collect_strings: bool,
}

/// One visited page inside a tab.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    /// Index extracted from the originating stream name.
    pub index: u32,
    /// `None` when the stream yielded no candidate text at all.
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_strings: Vec<String>,
}

/// A page whose stream could not be read. Only that page is lost; its
/// siblings still decode.
#[derive(Debug, Clone, Serialize)]
pub struct PageError {
    pub stream: String,
    pub message: String,
}

/// Everything recovered from one `{GUID}.dat` tab data container.
#[derive(Debug, Clone, Serialize)]
pub struct TabRecord {
    pub id: Guid,
    pub source: PathBuf,
    pub created_at: Option<Timestamp>,
    /// Page indices in the order they were visited; revisits repeat.
    pub navigation_order: Vec<u8>,
    pub current_page: Option<u32>,
    pub pages: Vec<PageRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub page_errors: Vec<PageError>,
}

/// Decodes a tab data container into a [`TabRecord`].
///
/// Failures are contained to this tab and never propagate to the owning
/// session or to sibling tabs. A tab may be decoded without its session.
pub fn decode_tab(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<TabRecord> {
    let path = path.as_ref();
    let mut container = Container::open(path)?;

    let id = id_from_file_name(path);
    // The tab's creation time is embedded in its own identifier.
    let created_at = timestamp_from_guid(&id.to_string());

    let properties = container.property_set()?;
    let current_page = properties
        .string(PROP_CURRENT_PAGE)
        .map(|value| value.trim_end_matches('\0'))
        .and_then(|value| value.parse().ok());

    let names = container.stream_names();

    let mut navigation_order = Vec::new();
    if names.iter().any(|name| name == TRAVEL_LOG_STREAM) {
        navigation_order = travel_log(&container.read_stream(TRAVEL_LOG_STREAM)?);
    }

    let mut page_streams: Vec<(&str, u32)> = names
        .iter()
        .filter_map(|name| page_stream_index(name).map(|index| (name.as_str(), index)))
        .collect();
    page_streams.sort_by(|(a, _), (b, _)| natural_cmp(a, b));

    let mut pages = Vec::new();
    let mut page_errors = Vec::new();
    for (name, index) in page_streams {
        match container.read_stream(name) {
            Ok(raw) => {
                let fields = extract_page_fields(&raw, options.collect_strings);
                pages.push(PageRecord {
                    index,
                    url: fields.url,
                    title: fields.title,
                    all_strings: fields.all_strings,
                });
            }
            Err(error) => {
                warn!("tab `{}`: page stream `{name}` unreadable: {error}", id);
                page_errors.push(PageError {
                    stream: name.to_owned(),
                    message: error.to_string(),
                });
            }
        }
    }

    debug!(
        "tab {id}: {} pages, {} navigation steps",
        pages.len(),
        navigation_order.len()
    );

    Ok(TabRecord {
        id,
        source: path.to_path_buf(),
        created_at,
        navigation_order,
        current_page,
        pages,
        page_errors,
    })
}

/// Tab data files are named `{GUID}.dat`; anything else yields the nil id
/// (and therefore an unknown creation time).
fn id_from_file_name(path: &Path) -> Guid {
    let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) => stem,
        None => return Guid::nil(),
    };

    match stem.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => Guid::from_dashed(inner),
        None => Guid::from_dashed(stem),
    }
}

/// Travel-log records are 4 bytes; only the first byte of each carries a
/// page index, the rest is padding. A short trailing record is not emitted.
pub(crate) fn travel_log(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4).map(|record| record[0]).collect()
}

/// Accepts `TL` names with a short all-digit suffix and returns the suffix
/// as a page index.
fn page_stream_index(name: &str) -> Option<u32> {
    if name.len() >= PAGE_STREAM_MAX_NAME_LEN {
        return None;
    }
    let suffix = name.strip_prefix(PAGE_STREAM_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
