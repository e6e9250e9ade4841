/// The closed set of formatting kinds the structural parser recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Bold,
    Italic,
    Link,
    InlineCode,
    FencedCode,
    Quote,
    ListItem,
    PlainText,
}

/// A typed unit of parsed formatting.
///
/// `content` is the literal captured text, without delimiters. `href` is only
/// set for links and `ordinal` only for ordered list items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingSpan {
    pub kind: SpanKind,
    pub content: String,
    pub href: Option<String>,
    pub ordinal: Option<u64>,
}

impl FormattingSpan {
    pub fn new(kind: SpanKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            href: None,
            ordinal: None,
        }
    }

    pub fn link(content: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::new(SpanKind::Link, content)
        }
    }

    /// A list item; `ordinal` is `None` for bullet items.
    pub fn list_item(content: impl Into<String>, ordinal: Option<u64>) -> Self {
        Self {
            ordinal,
            ..Self::new(SpanKind::ListItem, content)
        }
    }
}
