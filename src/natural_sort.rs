use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(&'a str),
    Text(&'a str),
}

fn segments(s: &str) -> Vec<Segment<'_>> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;

    while start < bytes.len() {
        let digits = bytes[start].is_ascii_digit();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() == digits {
            end += 1;
        }
        let segment = &s[start..end];
        out.push(if digits {
            Segment::Number(segment)
        } else {
            Segment::Text(segment)
        });
        start = end;
    }

    out
}

// Compares two decimal digit runs by value without parsing them, so runs of
// any width stay comparable.
fn cmp_number(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|b| b.to_ascii_lowercase())
        .cmp(b.bytes().map(|b| b.to_ascii_lowercase()))
}

/// Orders strings with embedded decimal runs by the numeric value of those
/// runs, so `TL2` sorts before `TL10`. The order is total: numeric ties
/// (`01` vs `1`) and case-insensitive ties fall back to plain byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);

    for pair in sa.iter().zip(sb.iter()) {
        let ordering = match pair {
            (Segment::Number(x), Segment::Number(y)) => cmp_number(x, y),
            (Segment::Text(x), Segment::Text(y)) => cmp_text(x, y),
            // Mixed kinds only happen for differently-shaped names; digits
            // sort first, consistent with ASCII.
            (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    sa.len().cmp(&sb.len()).then_with(|| a.cmp(b))
}
