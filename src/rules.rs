//! Per-node-kind render rules and the state they share during one render.
//!
//! A [`RendererRuleTable`] is a plain value. Callers override entries by
//! building a new table, and every render call gets its own
//! [`RenderContext`], so concurrent renders never share mutable state.

use std::collections::HashMap;
use std::fmt;

use crate::config::RenderConfig;
use crate::escape::{escape, escape_code};

/// Kinds of node in the flat open/close token stream produced from Markdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    ParagraphOpen,
    ParagraphClose,
    HeadingOpen,
    HeadingClose,
    BlockquoteOpen,
    BlockquoteClose,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    BulletItemOpen,
    BulletItemClose,
    OrderedItemOpen,
    OrderedItemClose,
    StrongOpen,
    StrongClose,
    EmphasisOpen,
    EmphasisClose,
    StrikethroughOpen,
    StrikethroughClose,
    LinkOpen,
    LinkClose,
    CodeSpan,
    FencedCode,
    HorizontalRule,
    SoftBreak,
    HardBreak,
    Text,
}

/// One token of the render stream.
///
/// Only the fields relevant to `kind` are set: `content` for text and code,
/// `href` for link opens, `language` for code blocks and `start` for ordered
/// list opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub content: String,
    pub href: Option<String>,
    pub language: Option<String>,
    pub start: Option<u64>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            content: String::new(),
            href: None,
            language: None,
            start: None,
        }
    }

    pub fn with_content(kind: NodeKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(kind)
        }
    }
}

/// Render function for one node: `(node, index in stream, context) -> text`
pub type Rule = fn(&Node, usize, &mut RenderContext<'_>) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered,
}

/// State of one open list; created at list open, dropped at list close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRenderState {
    pub kind: ListKind,
    pub next_ordinal: u64,
}

/// Hrefs of the links currently open, innermost last.
///
/// Bridges the link-open and link-close rules. Images inside links are the
/// only way CommonMark nests them, and each close pops its own href.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    open: Vec<String>,
}

impl LinkState {
    pub fn push(&mut self, href: String) {
        self.open.push(href);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.open.pop()
    }
}

/// Mutable state threaded through a single render walk
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub config: &'a RenderConfig,
    pub lists: Vec<ListRenderState>,
    pub link: LinkState,
    pub quote_depth: usize,
    last: Option<char>,
    // The current line holds nothing but quote markers and a list marker.
    prefix_only: bool,
    prefix_pending: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self {
            config,
            lists: Vec::new(),
            link: LinkState::default(),
            quote_depth: 0,
            last: None,
            prefix_only: false,
            prefix_pending: false,
        }
    }

    /// Note the text just emitted so rules can tell where the output stands.
    pub fn record(&mut self, emitted: &str) {
        let prefix = std::mem::take(&mut self.prefix_pending);
        if let Some(ch) = emitted.chars().next_back() {
            self.last = Some(ch);
            self.prefix_only = prefix;
        }
    }

    /// Mark the text a rule is about to return as a line prefix, so the
    /// next block starts on the same line instead of a new one.
    pub fn mark_line_prefix(&mut self) {
        self.prefix_pending = true;
    }

    pub fn at_line_start(&self) -> bool {
        matches!(self.last, None | Some('\n'))
    }

    fn at_top_level(&self) -> bool {
        self.quote_depth == 0 && self.lists.is_empty()
    }

    /// Text that moves the output to a fresh line, re-entering any open
    /// quote and indenting under any open list item.
    fn start_line(&self) -> String {
        if self.prefix_only {
            return String::new();
        }
        format!("{}{}", self.newline_if_needed(), self.continuation())
    }

    /// Prefix of a line that continues the innermost open block.
    fn continuation(&self) -> String {
        format!(
            "{}{}",
            ">".repeat(self.quote_depth),
            self.config.list_indent.repeat(self.lists.len())
        )
    }

    /// Quote markers owed at the start of a line inside a block quote.
    fn line_prefix(&self) -> String {
        if self.at_line_start() {
            ">".repeat(self.quote_depth)
        } else {
            String::new()
        }
    }

    /// Newline before a nested container, unless the line is still bare.
    fn break_line(&self) -> &'static str {
        if self.prefix_only { "" } else { self.newline_if_needed() }
    }

    /// What to emit after a block-level construct closes.
    fn block_end(&self) -> String {
        if self.at_top_level() {
            self.config.paragraph_separator.clone()
        } else {
            "\n".to_string()
        }
    }

    fn newline_if_needed(&self) -> &'static str {
        if self.at_line_start() { "" } else { "\n" }
    }
}

/// Mapping from node kind to render rule.
///
/// [`Default`] maps every kind. A kind with no rule renders as its raw
/// `content`, so unknown constructs degrade to visible text.
#[derive(Clone)]
pub struct RendererRuleTable {
    rules: HashMap<NodeKind, Rule>,
}

impl RendererRuleTable {
    /// A table with no rules; every node passes through as raw content.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, kind: NodeKind, rule: Rule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn without_rule(mut self, kind: NodeKind) -> Self {
        self.rules.remove(&kind);
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<Rule> {
        self.rules.get(&kind).copied()
    }
}

impl Default for RendererRuleTable {
    fn default() -> Self {
        use NodeKind::*;

        Self::empty()
            .with_rule(ParagraphOpen, paragraph_open)
            .with_rule(ParagraphClose, paragraph_close)
            .with_rule(HeadingOpen, heading_open)
            .with_rule(HeadingClose, heading_close)
            .with_rule(BlockquoteOpen, blockquote_open)
            .with_rule(BlockquoteClose, blockquote_close)
            .with_rule(BulletListOpen, bullet_list_open)
            .with_rule(BulletListClose, list_close)
            .with_rule(OrderedListOpen, ordered_list_open)
            .with_rule(OrderedListClose, list_close)
            .with_rule(BulletItemOpen, bullet_item_open)
            .with_rule(BulletItemClose, item_close)
            .with_rule(OrderedItemOpen, ordered_item_open)
            .with_rule(OrderedItemClose, item_close)
            .with_rule(StrongOpen, bold_marker)
            .with_rule(StrongClose, bold_marker)
            .with_rule(EmphasisOpen, italic_marker)
            .with_rule(EmphasisClose, italic_marker)
            .with_rule(StrikethroughOpen, strike_marker)
            .with_rule(StrikethroughClose, strike_marker)
            .with_rule(LinkOpen, link_open)
            .with_rule(LinkClose, link_close)
            .with_rule(CodeSpan, code_span)
            .with_rule(FencedCode, fenced_code)
            .with_rule(HorizontalRule, horizontal_rule)
            .with_rule(SoftBreak, line_break)
            .with_rule(HardBreak, line_break)
            .with_rule(Text, text)
    }
}

impl fmt::Debug for RendererRuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

fn paragraph_open(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    // A later paragraph inside a quote or list item starts a new continuation line.
    if ctx.at_top_level() {
        String::new()
    } else {
        ctx.start_line()
    }
}

fn paragraph_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    if ctx.at_top_level() {
        ctx.config.paragraph_separator.clone()
    } else {
        String::new()
    }
}

fn heading_open(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    format!("{}**", ctx.start_line())
}

fn heading_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    format!("**{}", ctx.block_end())
}

fn blockquote_open(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    ctx.quote_depth += 1;
    ctx.mark_line_prefix();
    if ctx.prefix_only {
        ">".to_string()
    } else {
        format!("{}{}", ctx.newline_if_needed(), ">".repeat(ctx.quote_depth))
    }
}

fn blockquote_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    ctx.quote_depth = ctx.quote_depth.saturating_sub(1);
    if ctx.quote_depth == 0 {
        ctx.block_end()
    } else {
        String::new()
    }
}

fn open_list(ctx: &mut RenderContext<'_>, kind: ListKind, start: u64) -> String {
    let lead = ctx.break_line();
    ctx.lists.push(ListRenderState {
        kind,
        next_ordinal: start,
    });
    lead.to_string()
}

fn bullet_list_open(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    open_list(ctx, ListKind::Bullet, 1)
}

fn ordered_list_open(node: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    open_list(ctx, ListKind::Ordered, node.start.unwrap_or(1))
}

fn list_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    ctx.lists.pop();
    if ctx.at_top_level() {
        "\n".to_string()
    } else {
        String::new()
    }
}

fn item_indent(ctx: &RenderContext<'_>) -> String {
    if ctx.prefix_only {
        return String::new();
    }
    let nesting = ctx.lists.len().saturating_sub(1);
    format!("{}{}", ctx.line_prefix(), ctx.config.list_indent.repeat(nesting))
}

fn bullet_item_open(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    let indent = item_indent(ctx);
    ctx.mark_line_prefix();
    format!("{indent}{}", ctx.config.bullet)
}

/// Numbered item; an item whose list is not ordered gets a bullet instead.
fn ordered_item_open(node: &Node, index: usize, ctx: &mut RenderContext<'_>) -> String {
    let ordered = matches!(ctx.lists.last(), Some(list) if list.kind == ListKind::Ordered);
    if !ordered {
        return bullet_item_open(node, index, ctx);
    }
    let indent = item_indent(ctx);
    let ordinal = match ctx.lists.last_mut() {
        Some(list) => {
            let ordinal = list.next_ordinal;
            list.next_ordinal += 1;
            ordinal
        }
        None => 1,
    };
    ctx.mark_line_prefix();
    format!("{indent}{ordinal}\\. ")
}

fn item_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    ctx.newline_if_needed().to_string()
}

fn bold_marker(_: &Node, _: usize, _: &mut RenderContext<'_>) -> String {
    "**".to_string()
}

fn italic_marker(_: &Node, _: usize, _: &mut RenderContext<'_>) -> String {
    "__".to_string()
}

fn strike_marker(_: &Node, _: usize, _: &mut RenderContext<'_>) -> String {
    "~".to_string()
}

fn link_open(node: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    ctx.link.push(node.href.clone().unwrap_or_default());
    "[".to_string()
}

fn link_close(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    let href = ctx.link.pop().unwrap_or_default();
    format!("]({})", escape(&href))
}

fn code_span(node: &Node, _: usize, _: &mut RenderContext<'_>) -> String {
    format!("`{}`", escape_code(&node.content))
}

fn fenced_code(node: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    let language = node.language.as_deref().unwrap_or("");
    let body = escape_code(node.content.trim_matches('\n'));
    format!("{}```{language}\n{body}\n```{}", ctx.start_line(), ctx.block_end())
}

fn horizontal_rule(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    format!("{}{}\n", ctx.start_line(), escape(&ctx.config.rule_line))
}

fn line_break(_: &Node, _: usize, ctx: &mut RenderContext<'_>) -> String {
    format!("\n{}", ctx.continuation())
}

fn text(node: &Node, _: usize, _: &mut RenderContext<'_>) -> String {
    escape(&node.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(rules: &RendererRuleTable, nodes: &[Node]) -> String {
        let config = RenderConfig::default();
        let mut ctx = RenderContext::new(&config);
        let mut out = String::new();
        for (index, node) in nodes.iter().enumerate() {
            let piece = match rules.get(node.kind) {
                Some(rule) => rule(node, index, &mut ctx),
                None => node.content.clone(),
            };
            ctx.record(&piece);
            out.push_str(&piece);
        }
        out
    }

    fn ordered(start: u64) -> Node {
        Node {
            start: Some(start),
            ..Node::new(NodeKind::OrderedListOpen)
        }
    }

    #[test]
    fn ordinals_count_from_list_start_with_escaped_period() {
        let nodes = [
            ordered(1),
            Node::new(NodeKind::OrderedItemOpen),
            Node::with_content(NodeKind::Text, "one"),
            Node::new(NodeKind::OrderedItemClose),
            Node::new(NodeKind::OrderedItemOpen),
            Node::with_content(NodeKind::Text, "two"),
            Node::new(NodeKind::OrderedItemClose),
            Node::new(NodeKind::OrderedListClose),
        ];
        assert_eq!(
            run(&RendererRuleTable::default(), &nodes),
            "1\\. one\n2\\. two\n\n"
        );
    }

    #[test]
    fn each_list_gets_a_fresh_counter() {
        let list = |text: &str| {
            vec![
                ordered(1),
                Node::new(NodeKind::OrderedItemOpen),
                Node::with_content(NodeKind::Text, text),
                Node::new(NodeKind::OrderedItemClose),
                Node::new(NodeKind::OrderedListClose),
            ]
        };
        let nodes: Vec<Node> = list("a").into_iter().chain(list("b")).collect();
        assert_eq!(
            run(&RendererRuleTable::default(), &nodes),
            "1\\. a\n\n1\\. b\n\n"
        );
    }

    #[test]
    fn numbered_item_in_bullet_list_gets_a_bullet() {
        let nodes = [
            Node::new(NodeKind::BulletListOpen),
            Node::new(NodeKind::OrderedItemOpen),
            Node::with_content(NodeKind::Text, "x"),
            Node::new(NodeKind::OrderedItemClose),
            Node::new(NodeKind::BulletListClose),
        ];
        assert_eq!(run(&RendererRuleTable::default(), &nodes), "• x\n\n");
    }

    #[test]
    fn link_close_uses_its_own_href() {
        let outer = Node {
            href: Some("https://a.example".into()),
            ..Node::new(NodeKind::LinkOpen)
        };
        let inner = Node {
            href: Some("img.png".into()),
            ..Node::new(NodeKind::LinkOpen)
        };
        let nodes = [
            outer,
            inner,
            Node::with_content(NodeKind::Text, "alt"),
            Node::new(NodeKind::LinkClose),
            Node::new(NodeKind::LinkClose),
        ];
        assert_eq!(
            run(&RendererRuleTable::default(), &nodes),
            "[[alt](img\\.png)](https://a\\.example)"
        );
    }

    #[test]
    fn unmapped_kind_passes_content_through() {
        let rules = RendererRuleTable::default().without_rule(NodeKind::Text);
        let nodes = [Node::with_content(NodeKind::Text, "a.b!")];
        assert_eq!(run(&rules, &nodes), "a.b!");
        assert!(rules.get(NodeKind::Text).is_none());
        assert!(rules.get(NodeKind::CodeSpan).is_some());
    }

    #[test]
    fn empty_table_is_raw_passthrough() {
        let nodes = [
            Node::new(NodeKind::StrongOpen),
            Node::with_content(NodeKind::CodeSpan, "x_y"),
            Node::new(NodeKind::StrongClose),
        ];
        assert_eq!(run(&RendererRuleTable::empty(), &nodes), "x_y");
    }
}
