//! Splitting rendered MarkdownV2 into messages Telegram will accept.

const FENCE: &str = "```";

/// Emphasis delimiters the renderer emits, longest first.
const MARKERS: [&str; 3] = ["**", "__", "~"];

/// Room kept in every chunk for re-opening and closing whatever a boundary
/// cuts: a fence on both sides, or every emphasis marker at once.
const RESERVE: usize = 10;

/// Emphasis left open at the end of the text scanned so far.
#[derive(Debug, Default)]
struct OpenMarkers {
    open: Vec<&'static str>,
    in_code: bool,
}

impl OpenMarkers {
    /// Update the open set from one piece of a line outside any fence.
    fn scan(&mut self, piece: &str) {
        let mut rest = piece;
        let mut escaped = false;

        while let Some(ch) = rest.chars().next() {
            if escaped {
                escaped = false;
                rest = &rest[ch.len_utf8()..];
                continue;
            }
            if ch == '\\' {
                escaped = true;
                rest = &rest[1..];
                continue;
            }
            if ch == '`' {
                self.in_code = !self.in_code;
                rest = &rest[1..];
                continue;
            }
            let marker = if self.in_code {
                None
            } else {
                MARKERS.into_iter().find(|m| rest.starts_with(m))
            };
            match marker {
                Some(marker) => {
                    self.toggle(marker);
                    rest = &rest[marker.len()..];
                }
                None => rest = &rest[ch.len_utf8()..],
            }
        }
    }

    fn toggle(&mut self, marker: &'static str) {
        match self.open.iter().rposition(|m| *m == marker) {
            Some(index) => {
                self.open.remove(index);
            }
            None => self.open.push(marker),
        }
    }

    fn closers(&self) -> String {
        self.open.iter().rev().copied().collect()
    }

    fn openers(&self) -> String {
        self.open.concat()
    }
}

/// Split a message into chunks of at most `max_len` characters.
///
/// Splits at line boundaries where possible. A line longer than a chunk is
/// cut at a character boundary, never between an escaping backslash and the
/// character it escapes. A fenced code block or emphasis span cut by a
/// boundary is closed at the end of one chunk and re-opened at the start of
/// the next.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let budget = max_len.saturating_sub(RESERVE).max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut in_fence = false;
    let mut markers = OpenMarkers::default();

    for line in text.split_inclusive('\n') {
        let fence_line = line.trim_start().starts_with(FENCE);

        for piece in hard_split(line, budget) {
            let piece_len = piece.chars().count();
            if current_len + piece_len > budget && !current.is_empty() {
                chunks.push(finish(&current, in_fence, &markers));
                current.clear();
                if in_fence {
                    current.push_str(FENCE);
                    current.push('\n');
                } else {
                    current.push_str(&markers.openers());
                }
                current_len = current.chars().count();
            }
            current.push_str(piece);
            current_len += piece_len;
            if !in_fence && !fence_line {
                markers.scan(piece);
            }
        }

        if fence_line {
            in_fence = !in_fence;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim_end_matches('\n').to_string());
    }

    chunks
}

fn finish(chunk: &str, in_fence: bool, markers: &OpenMarkers) -> String {
    let mut out = chunk.trim_end_matches('\n').to_string();
    if in_fence {
        out.push('\n');
        out.push_str(FENCE);
    } else {
        out.push_str(&markers.closers());
    }
    out
}

fn hard_split(line: &str, budget: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.chars().count() > budget {
        let mut cut = rest
            .char_indices()
            .nth(budget)
            .map_or(rest.len(), |(offset, _)| offset);
        let backslashes = rest[..cut].chars().rev().take_while(|c| *c == '\\').count();
        if cut > 1 && backslashes % 2 == 1 {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}
