//! Recovers printable text from the wide-character page streams inside a tab
//! data container.

/// Shortest byte run worth reporting as a field.
const MIN_RUN: usize = 5;
/// Longest single candidate; longer runs split here and the remainder is
/// scanned again.
const MAX_RUN: usize = 500;
/// The first narrow bytes are structural and never part of a field.
const SCAN_OFFSET: usize = 4;

/// Extracted fields for one page stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFields {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Every candidate run, deduplicated in first-seen order. Only populated
    /// when string collection is requested; may contain referrers, form
    /// values and credentials.
    pub all_strings: Vec<String>,
}

/// Narrow-byte projection of a 2-byte-per-character stream: keeps every
/// even-indexed byte, halving the length.
///
/// This assumes ASCII-range text. Non-ASCII content is outside the format's
/// observed use and may produce garbled or no matches.
pub fn narrow_projection(wide: &[u8]) -> Vec<u8> {
    wide.iter().step_by(2).copied().collect()
}

fn is_candidate_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'/' | b'-'
                | b'+'
                | b':'
                | b'.'
                | b','
                | b'_'
                | b'$'
                | b'%'
                | b'?'
                | b'\''
                | b'('
                | b')'
                | b'['
                | b']'
                | b'='
                | b'<'
                | b'>'
                | b' '
                | b'&'
        )
}

/// Scans a narrow byte stream for maximal runs of candidate bytes, starting
/// `SCAN_OFFSET` bytes in. Runs shorter than `MIN_RUN` are dropped; runs
/// longer than `MAX_RUN` are emitted in `MAX_RUN`-sized pieces.
pub fn candidate_runs(narrow: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut i = SCAN_OFFSET;

    while i < narrow.len() {
        if !is_candidate_byte(narrow[i]) {
            i += 1;
            continue;
        }

        let start = i;
        while i < narrow.len() && is_candidate_byte(narrow[i]) {
            i += 1;
        }

        let mut run = &narrow[start..i];
        while run.len() >= MIN_RUN {
            let piece = run.len().min(MAX_RUN);
            // Candidate bytes are all ASCII, so this never replaces anything.
            runs.push(String::from_utf8_lossy(&run[..piece]).into_owned());
            run = &run[piece..];
        }
    }

    runs
}

/// Reduces a raw page stream to its reportable fields.
///
/// By positional convention the first candidate run is the URL and the
/// second is the Title; the format carries no structural marker
/// distinguishing them. No first run means the page has no fields at all.
pub fn extract_page_fields(raw: &[u8], collect_strings: bool) -> PageFields {
    let narrow = narrow_projection(raw);
    let runs = candidate_runs(&narrow);

    let mut fields = PageFields {
        url: runs.first().cloned(),
        title: runs.get(1).cloned(),
        all_strings: Vec::new(),
    };

    if collect_strings {
        for run in runs {
            if !fields.all_strings.contains(&run) {
                fields.all_strings.push(run);
            }
        }
    }

    fields
}
