use crate::config::RenderConfig;
use crate::escape::{escape, escape_code};
use crate::rules::{Node, RenderContext, RendererRuleTable};
use crate::span::{FormattingSpan, SpanKind};

/// Walk the node stream once, concatenating each rule's output.
///
/// Nodes whose kind has no rule contribute their raw `content`. The result is
/// trimmed, so block separators never trail the message.
pub fn nodes_to_markdown_v2(
    nodes: &[Node],
    rules: &RendererRuleTable,
    config: &RenderConfig,
) -> String {
    let mut ctx = RenderContext::new(config);
    let mut out = String::new();

    for (index, node) in nodes.iter().enumerate() {
        let piece = match rules.get(node.kind) {
            Some(rule) => rule(node, index, &mut ctx),
            None => node.content.clone(),
        };
        ctx.record(&piece);
        out.push_str(&piece);
    }

    out.trim().to_string()
}

/// Convert spans from the structural parser to MarkdownV2
pub fn spans_to_markdown_v2(spans: &[FormattingSpan], config: &RenderConfig) -> String {
    let mut out = String::new();
    for span in spans {
        span_to_markdown_v2(span, config, &mut out);
    }
    out
}

fn span_to_markdown_v2(span: &FormattingSpan, config: &RenderConfig, out: &mut String) {
    match span.kind {
        SpanKind::Bold => {
            out.push_str("**");
            out.push_str(&escape(&span.content));
            out.push_str("**");
        }
        SpanKind::Italic => {
            out.push_str("__");
            out.push_str(&escape(&span.content));
            out.push_str("__");
        }
        SpanKind::Link => {
            out.push('[');
            out.push_str(&escape(&span.content));
            out.push_str("](");
            out.push_str(&escape(span.href.as_deref().unwrap_or("")));
            out.push(')');
        }
        SpanKind::InlineCode => {
            out.push('`');
            out.push_str(&escape_code(&span.content));
            out.push('`');
        }
        SpanKind::FencedCode => {
            out.push_str("```");
            out.push_str(&escape_code(&span.content));
            out.push_str("```");
        }
        SpanKind::Quote => {
            out.push('>');
            out.push_str(&escape(&span.content));
        }
        SpanKind::ListItem => {
            match span.ordinal {
                Some(ordinal) => out.push_str(&format!("{ordinal}\\. ")),
                None => out.push_str(&config.bullet),
            }
            out.push_str(&escape(&span.content));
        }
        SpanKind::PlainText => {
            out.push_str(&escape(&span.content));
        }
    }
}
