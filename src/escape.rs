//! Backslash escaping for Telegram MarkdownV2.
//!
//! Telegram rejects a MarkdownV2 message if any reserved character appears
//! bare outside an entity. Two text escapers live here:
//!
//! - [`escape`] leaves alone the delimiters of complete `**bold**`,
//!   `__italic__` and `[label](url)` constructs, so markup the renderer has
//!   already emitted does not get escaped a second time.
//! - [`escape_all`] escapes every reserved character. Use it when the input
//!   is to be shown with no structure at all.
//!
//! Both skip characters that are already escaped, meaning those preceded by
//! an odd run of backslashes. Code bodies follow different rules and go
//! through [`escape_code`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// Characters MarkdownV2 requires to be escaped outside of entities.
pub const RESERVED: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^\n]+?\*\*").expect("bold pattern compiles"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__[^\n]+?__").expect("italic pattern compiles"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]\n]+)\]\(([^()\s]+)\)").expect("link pattern compiles")
});

pub fn is_reserved(ch: char) -> bool {
    RESERVED.contains(&ch)
}

/// Escape `text`, exempting delimiters of complete bold, italic and link constructs.
pub fn escape(text: &str) -> String {
    let delimiters = markup_delimiters(text);
    escape_with(text, |offset| delimiters.contains(&offset))
}

/// Escape every reserved character in `text` that is not already escaped.
pub fn escape_all(text: &str) -> String {
    escape_with(text, |_| false)
}

/// Escape the body of a code span or pre block.
///
/// Inside code entities only `` ` `` and `\` are special, so everything
/// else passes through untouched.
pub fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '`' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Like [`escape`], for raw bytes. Input that is not UTF-8 is rejected, never decoded lossily.
pub fn escape_bytes(bytes: &[u8]) -> Result<String, Error> {
    Ok(escape(std::str::from_utf8(bytes)?))
}

/// Whether the character at byte `offset` is a structural delimiter of a
/// complete `**x**`, `__x__` or `[x](y)` construct in `text`.
///
/// Only the delimiter characters themselves count: the two markers at each
/// end of bold and italic, and the `[`, `]`, `(` and `)` of a link. The text
/// between them is still subject to escaping.
pub fn is_inside_valid_markup(text: &str, offset: usize) -> bool {
    markup_delimiters(text).contains(&offset)
}

fn markup_delimiters(text: &str) -> HashSet<usize> {
    let mut offsets = HashSet::new();

    for pattern in [&*BOLD, &*ITALIC] {
        for m in pattern.find_iter(text) {
            offsets.extend([m.start(), m.start() + 1, m.end() - 2, m.end() - 1]);
        }
    }

    for caps in LINK.captures_iter(text) {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        offsets.extend([whole.start(), label.end(), label.end() + 1, whole.end() - 1]);
    }

    offsets
}

fn escape_with(text: &str, exempt: impl Fn(usize) -> bool) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut backslashes = 0usize;

    for (offset, ch) in text.char_indices() {
        let already_escaped = backslashes % 2 == 1;
        backslashes = if ch == '\\' { backslashes + 1 } else { 0 };

        if is_reserved(ch) && !already_escaped && !exempt(offset) {
            out.push('\\');
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("no specials", "no specials")]
    #[case::punctuation("1.5 * 2 = 3!", "1\\.5 \\* 2 \\= 3\\!")]
    #[case::snake_case("snake_case_name", "snake\\_case\\_name")]
    #[case::already_escaped("\\!", "\\!")]
    #[case::escaped_backslash("\\\\!", "\\\\\\!")]
    #[case::bold_kept("Use **/start** now!", "Use **/start** now\\!")]
    #[case::italic_kept("__it__", "__it__")]
    #[case::unterminated_bold("**open", "\\*\\*open")]
    #[case::link_url("[x](http://a.b/c_d)", "[x](http://a\\.b/c\\_d)")]
    #[case::braces("{a|b}", "\\{a\\|b\\}")]
    #[case::unicode("héllo – wörld.", "héllo – wörld\\.")]
    fn escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape(input), expected);
    }

    #[test]
    fn escape_all_ignores_markup() {
        assert_eq!(escape_all("**b**"), "\\*\\*b\\*\\*");
        assert_eq!(escape_all("a\\.b."), "a\\.b\\.");
    }

    #[test]
    fn delimiters_are_exempt_but_content_is_not() {
        let text = "[a.b](u)";
        assert!(is_inside_valid_markup(text, 0));
        assert!(!is_inside_valid_markup(text, 2));
        assert!(is_inside_valid_markup(text, 4));
        assert!(is_inside_valid_markup(text, 5));
        assert!(is_inside_valid_markup(text, 7));
        assert!(!is_inside_valid_markup("a.b", 1));
    }

    #[rstest]
    #[case::markdown_chars_untouched("a_b*c.", "a_b*c.")]
    #[case::backtick("a`b", "a\\`b")]
    #[case::windows_path("C:\\dir\\", "C:\\\\dir\\\\")]
    fn escapes_code(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_code(input), expected);
    }

    #[test]
    fn bytes_must_be_utf8() {
        assert_eq!(escape_bytes(b"ok!").unwrap(), "ok\\!");
        assert!(matches!(
            escape_bytes(&[0x66, 0xff, 0x21]),
            Err(Error::NotUtf8(_))
        ));
    }

    fn unambiguous_reserved() -> impl Strategy<Value = String> {
        // Without `*`, `_` and `[` no bold, italic or link construct can form.
        let chars = vec![
            ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        ];
        proptest::collection::vec(proptest::sample::select(chars), 0..48)
            .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn every_reserved_char_gets_a_backslash(text in unambiguous_reserved()) {
            let expected: String = text.chars().flat_map(|c| ['\\', c]).collect();
            prop_assert_eq!(escape(&text), expected);
        }

        #[test]
        fn escaping_twice_changes_nothing(text in "\\PC{0,64}") {
            let once = escape_all(&text);
            prop_assert_eq!(escape_all(&once), once);
        }
    }
}
