use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::span::{FormattingSpan, SpanKind};

/// One pattern per kind, scanned in this order by [`parse`].
static KIND_PATTERNS: LazyLock<Vec<(SpanKind, Regex)>> = LazyLock::new(|| {
    [
        (SpanKind::Bold, r"\*\*(.*?)\*\*"),
        (SpanKind::Italic, r"__(.*?)__"),
        (SpanKind::Link, r"\[(.*?)\]\((.*?)\)"),
        (SpanKind::FencedCode, r"(?s)```(.*?)```"),
        (SpanKind::InlineCode, r"`([^`]+)`"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("span pattern compiles")))
    .collect()
});

/// Every construct in one alternation, for the document-order scan.
static ORDERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)(?:(?s:```(?P<fence>.*?)```)",
        r"|`(?P<code>[^`]+)`",
        r"|\*\*(?P<bold>.*?)\*\*",
        r"|__(?P<italic>.*?)__",
        r"|\[(?P<label>.*?)\]\((?P<href>.*?)\)",
        r"|^>[ ]?(?P<quote>.*)$",
        r"|^[-*][ ](?P<bullet>.*)$",
        r"|^(?P<ordinal>\d{1,9})\.[ ](?P<item>.*)$)",
    ))
    .expect("ordered span pattern compiles")
});

/// Extract bold, italic, link, fenced code and inline code spans.
///
/// Each kind is scanned over the whole input in turn, so the result is
/// grouped by kind rather than in document order. Overlapping matches of
/// different kinds are all kept, and text outside any match is dropped.
pub fn parse(text: &str) -> Vec<FormattingSpan> {
    let mut spans = Vec::new();

    for (kind, pattern) in KIND_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let content = caps.get(1).map_or("", |m| m.as_str());
            let span = match kind {
                SpanKind::Link => {
                    FormattingSpan::link(content, caps.get(2).map_or("", |m| m.as_str()))
                }
                _ => FormattingSpan::new(*kind, content),
            };
            spans.push(span);
        }
    }

    spans
}

/// Scan `text` once, left to right, into a mixed-kind sequence in document order.
///
/// Besides the inline constructs this recognizes `> ` quote lines and `- `,
/// `* ` and `N. ` list item lines. Text between matches becomes
/// [`SpanKind::PlainText`], so concatenating every span's source gives back
/// the whole input.
pub fn parse_ordered(text: &str) -> Vec<FormattingSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in ORDERED.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            spans.push(FormattingSpan::new(
                SpanKind::PlainText,
                &text[cursor..whole.start()],
            ));
        }
        spans.push(ordered_span(&caps));
        cursor = whole.end();
    }

    if cursor < text.len() {
        spans.push(FormattingSpan::new(SpanKind::PlainText, &text[cursor..]));
    }

    spans
}

fn ordered_span(caps: &Captures<'_>) -> FormattingSpan {
    let group = |name: &str| caps.name(name).map(|m| m.as_str());

    if let Some(label) = group("label") {
        return FormattingSpan::link(label, group("href").unwrap_or(""));
    }
    if let Some(item) = group("item") {
        let ordinal = group("ordinal").and_then(|n| n.parse().ok());
        return FormattingSpan::list_item(item, ordinal);
    }
    if let Some(item) = group("bullet") {
        return FormattingSpan::list_item(item, None);
    }

    let simple = [
        ("fence", SpanKind::FencedCode),
        ("code", SpanKind::InlineCode),
        ("bold", SpanKind::Bold),
        ("italic", SpanKind::Italic),
        ("quote", SpanKind::Quote),
    ];
    simple
        .into_iter()
        .find_map(|(name, kind)| group(name).map(|content| FormattingSpan::new(kind, content)))
        .unwrap_or_else(|| {
            FormattingSpan::new(SpanKind::PlainText, caps.get(0).map_or("", |m| m.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bold(content: &str) -> FormattingSpan {
        FormattingSpan::new(SpanKind::Bold, content)
    }

    fn plain(content: &str) -> FormattingSpan {
        FormattingSpan::new(SpanKind::PlainText, content)
    }

    #[test]
    fn spans_are_grouped_by_kind() {
        assert_eq!(
            parse("**b** and __i__ then **c**"),
            vec![bold("b"), bold("c"), FormattingSpan::new(SpanKind::Italic, "i")]
        );
    }

    #[test]
    fn link_keeps_href() {
        assert_eq!(
            parse("see [x](http://a.b)"),
            vec![FormattingSpan::link("x", "http://a.b")]
        );
    }

    #[test]
    fn overlapping_kinds_are_not_deduplicated() {
        assert_eq!(
            parse("**`code`**"),
            vec![bold("`code`"), FormattingSpan::new(SpanKind::InlineCode, "code")]
        );
    }

    #[test]
    fn fenced_block_also_matches_inline_code() {
        let spans = parse("```js\nlet a;\n```");
        assert_eq!(
            spans,
            vec![
                FormattingSpan::new(SpanKind::FencedCode, "js\nlet a;\n"),
                FormattingSpan::new(SpanKind::InlineCode, "js\nlet a;\n"),
            ]
        );
    }

    #[test]
    fn plain_text_alone_yields_nothing() {
        assert!(parse("nothing to see.").is_empty());
    }

    #[test]
    fn ordered_scan_keeps_document_order() {
        assert_eq!(
            parse_ordered("Hi **b** and `c`!\n- item\n2. two\n> q"),
            vec![
                plain("Hi "),
                bold("b"),
                plain(" and "),
                FormattingSpan::new(SpanKind::InlineCode, "c"),
                plain("!\n"),
                FormattingSpan::list_item("item", None),
                plain("\n"),
                FormattingSpan::list_item("two", Some(2)),
                plain("\n"),
                FormattingSpan::new(SpanKind::Quote, "q"),
            ]
        );
    }

    #[test]
    fn ordered_scan_prefers_fence_over_inline_code() {
        assert_eq!(
            parse_ordered("```\na_b\n```"),
            vec![FormattingSpan::new(SpanKind::FencedCode, "\na_b\n")]
        );
    }

    #[test]
    fn leading_bold_is_not_a_bullet() {
        assert_eq!(
            parse_ordered("**x** y"),
            vec![bold("x"), plain(" y")]
        );
    }
}
