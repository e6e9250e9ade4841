//! Convert chat-style Markdown into Telegram's MarkdownV2 wire format.
//!
//! Two pipelines share the same escaper:
//!
//! - [`transform`] repairs unterminated emphasis with [`correct`], parses the
//!   text as CommonMark, and walks the result with a [`RendererRuleTable`].
//! - [`transform_spans`] runs the lighter pattern scanner ([`parse_ordered`])
//!   and renders its spans directly.
//!
//! Every call is a pure function of its arguments. Rule tables and configs
//! are passed by reference and render state lives on the stack of a single
//! call, so calls can run concurrently.

mod config;
mod correct;
mod error;
mod escape;
mod parser;
mod rules;
mod span;
mod telegram;
mod tokens;

use std::sync::LazyLock;

pub use config::{Config, LimitsConfig, OutputConfig, RenderConfig};
pub use correct::correct;
pub use error::{Error, ParseError};
pub use escape::{
    RESERVED, escape, escape_all, escape_bytes, escape_code, is_inside_valid_markup, is_reserved,
};
pub use parser::{parse, parse_ordered};
pub use rules::{
    LinkState, ListKind, ListRenderState, Node, NodeKind, RenderContext, RendererRuleTable, Rule,
};
pub use span::{FormattingSpan, SpanKind};

static DEFAULT_CONFIG: LazyLock<Config> = LazyLock::new(Config::compiled_default);
static DEFAULT_RULES: LazyLock<RendererRuleTable> = LazyLock::new(RendererRuleTable::default);

/// Parse markdown into the flat node stream the renderer walks.
pub fn tokenize(markdown: &str, config: &Config) -> Result<Vec<Node>, ParseError> {
    tokens::tokenize(markdown, config.limits.max_nesting)
}

/// Render markdown to MarkdownV2 with the given rules and the default config.
pub fn render(markdown: &str, rules: &RendererRuleTable) -> Result<String, Error> {
    render_with_config(markdown, rules, &DEFAULT_CONFIG)
}

/// Render markdown to MarkdownV2 with the given rules and config.
pub fn render_with_config(
    markdown: &str,
    rules: &RendererRuleTable,
    config: &Config,
) -> Result<String, Error> {
    let nodes = tokenize(markdown, config)?;
    Ok(telegram::nodes_to_markdown_v2(&nodes, rules, &config.render))
}

/// Render spans from [`parse`] or [`parse_ordered`] to MarkdownV2.
pub fn render_spans(spans: &[FormattingSpan]) -> String {
    telegram::spans_to_markdown_v2(spans, &DEFAULT_CONFIG.render)
}

/// Correct, parse and render `text` with the default rules and config.
pub fn transform(text: &str) -> Result<String, Error> {
    transform_with_config(text, &DEFAULT_CONFIG)
}

pub fn transform_with_config(text: &str, config: &Config) -> Result<String, Error> {
    render_with_config(&correct(text), &DEFAULT_RULES, config)
}

/// Like [`transform`], but falls back to escaping the raw text when parsing fails.
pub fn transform_or_escape(text: &str) -> String {
    transform_or_escape_with_config(text, &DEFAULT_CONFIG)
}

pub fn transform_or_escape_with_config(text: &str, config: &Config) -> String {
    match transform_with_config(text, config) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(%err, "markdown rendering failed, sending escaped plain text");
            escape_all(text)
        }
    }
}

/// Correct `text`, scan it in document order and render the spans.
pub fn transform_spans(text: &str) -> String {
    transform_spans_with_config(text, &DEFAULT_CONFIG)
}

pub fn transform_spans_with_config(text: &str, config: &Config) -> String {
    let spans = parse_ordered(&correct(text));
    telegram::spans_to_markdown_v2(&spans, &config.render)
}
