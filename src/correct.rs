use std::sync::LazyLock;

use regex::Regex;

/// Terminated fenced blocks and inline code spans; markers inside them are literal.
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`]+`").expect("code pattern compiles"));

const BOLD: &str = "**";
const ITALIC: &str = "__";

#[derive(Debug, Default, Clone, Copy)]
struct MarkerScan {
    count: usize,
    last: Option<usize>,
}

/// Repair unterminated `**` and `__` spans by appending the missing closers.
///
/// When both are open, the one opened later is closed first so the result
/// stays properly nested. Balanced but crossed spans such as `**a __b** c__`
/// are left verbatim. Applying this twice gives the same result as applying
/// it once.
pub fn correct(text: &str) -> String {
    let mut closers: Vec<(usize, &str)> = [BOLD, ITALIC]
        .into_iter()
        .filter_map(|marker| {
            let scan = scan_markers(text, marker);
            match scan.last {
                Some(offset) if scan.count % 2 == 1 => Some((offset, marker)),
                _ => None,
            }
        })
        .collect();

    if closers.is_empty() {
        return text.to_string();
    }

    closers.sort_by(|a, b| b.0.cmp(&a.0));

    let mut out = String::with_capacity(text.len() + 4);
    out.push_str(text);
    for (_, marker) in closers {
        out.push_str(marker);
    }
    out
}

/// Count non-overlapping `marker` occurrences outside code, left to right.
fn scan_markers(text: &str, marker: &str) -> MarkerScan {
    let mut scan = MarkerScan::default();
    let mut segment_start = 0;

    let code_ranges = CODE
        .find_iter(text)
        .map(|m| m.range())
        .chain(std::iter::once(text.len()..text.len()));

    for code in code_ranges {
        let segment = &text[segment_start..code.start];
        for (offset, _) in segment.match_indices(marker) {
            scan.count += 1;
            scan.last = Some(segment_start + offset);
        }
        segment_start = code.end;
    }

    scan
}
