use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::error::ParseError;
use crate::rules::{Node, NodeKind};

/// Parse markdown into the flat open/close node stream the renderer walks.
///
/// Fails with [`ParseError::TooDeep`] once container nesting passes `max_nesting`.
pub fn tokenize(markdown: &str, max_nesting: usize) -> Result<Vec<Node>, ParseError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut nodes = Vec::new();
    let mut state = TokenizeState {
        max_nesting,
        ..TokenizeState::default()
    };

    for event in parser {
        process_event(event, &mut state, &mut nodes)?;
    }

    tracing::debug!(nodes = nodes.len(), "tokenized markdown");
    Ok(nodes)
}

#[derive(Default)]
struct TokenizeState {
    // Open containers and the allowed maximum
    depth: usize,
    max_nesting: usize,

    // Code block state
    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    // One entry per open list: whether it is ordered
    list_stack: Vec<bool>,
}

impl TokenizeState {
    fn in_ordered_list(&self) -> bool {
        self.list_stack.last().copied().unwrap_or(false)
    }
}

fn open(state: &mut TokenizeState, nodes: &mut Vec<Node>, node: Node) -> Result<(), ParseError> {
    state.depth += 1;
    if state.depth > state.max_nesting {
        return Err(ParseError::TooDeep {
            depth: state.depth,
            limit: state.max_nesting,
        });
    }
    nodes.push(node);
    Ok(())
}

fn close(state: &mut TokenizeState, nodes: &mut Vec<Node>, kind: NodeKind) {
    state.depth = state.depth.saturating_sub(1);
    nodes.push(Node::new(kind));
}

/// Append text, merging with a directly preceding text node.
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    match nodes.last_mut() {
        Some(last) if last.kind == NodeKind::Text => last.content.push_str(text),
        _ => nodes.push(Node::with_content(NodeKind::Text, text)),
    }
}

fn link_node(dest_url: CowStr<'_>) -> Node {
    Node {
        href: Some(dest_url.into_string()),
        ..Node::new(NodeKind::LinkOpen)
    }
}

fn process_event(
    event: Event,
    state: &mut TokenizeState,
    nodes: &mut Vec<Node>,
) -> Result<(), ParseError> {
    match event {
        // Paragraphs and headings
        Event::Start(Tag::Paragraph) => open(state, nodes, Node::new(NodeKind::ParagraphOpen))?,
        Event::End(TagEnd::Paragraph) => close(state, nodes, NodeKind::ParagraphClose),
        Event::Start(Tag::Heading { .. }) => open(state, nodes, Node::new(NodeKind::HeadingOpen))?,
        Event::End(TagEnd::Heading(_)) => close(state, nodes, NodeKind::HeadingClose),

        // Block quotes
        Event::Start(Tag::BlockQuote(_)) => {
            open(state, nodes, Node::new(NodeKind::BlockquoteOpen))?
        }
        Event::End(TagEnd::BlockQuote(_)) => close(state, nodes, NodeKind::BlockquoteClose),

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                push_text(nodes, &text);
            }
        }

        // Raw HTML is shown as text, never passed through
        Event::Html(html) | Event::InlineHtml(html) => push_text(nodes, &html),

        // Inline code
        Event::Code(code) => nodes.push(Node::with_content(NodeKind::CodeSpan, code.into_string())),

        // Bold, italic, strikethrough
        Event::Start(Tag::Strong) => open(state, nodes, Node::new(NodeKind::StrongOpen))?,
        Event::End(TagEnd::Strong) => close(state, nodes, NodeKind::StrongClose),
        Event::Start(Tag::Emphasis) => open(state, nodes, Node::new(NodeKind::EmphasisOpen))?,
        Event::End(TagEnd::Emphasis) => close(state, nodes, NodeKind::EmphasisClose),
        Event::Start(Tag::Strikethrough) => {
            open(state, nodes, Node::new(NodeKind::StrikethroughOpen))?
        }
        Event::End(TagEnd::Strikethrough) => close(state, nodes, NodeKind::StrikethroughClose),

        // Links; images render as links to their source
        Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
            open(state, nodes, link_node(dest_url))?
        }
        Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
            close(state, nodes, NodeKind::LinkClose)
        }

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .map(|lang| lang.to_string()),
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            nodes.push(Node {
                language: state.code_language.take(),
                ..Node::with_content(NodeKind::FencedCode, std::mem::take(&mut state.code_content))
            });
        }

        // Lists
        Event::Start(Tag::List(first_item)) => {
            state.list_stack.push(first_item.is_some());
            let node = match first_item {
                Some(start) => Node {
                    start: Some(start),
                    ..Node::new(NodeKind::OrderedListOpen)
                },
                None => Node::new(NodeKind::BulletListOpen),
            };
            open(state, nodes, node)?;
        }
        Event::End(TagEnd::List(ordered)) => {
            state.list_stack.pop();
            let kind = if ordered {
                NodeKind::OrderedListClose
            } else {
                NodeKind::BulletListClose
            };
            close(state, nodes, kind);
        }

        Event::Start(Tag::Item) => {
            let kind = if state.in_ordered_list() {
                NodeKind::OrderedItemOpen
            } else {
                NodeKind::BulletItemOpen
            };
            open(state, nodes, Node::new(kind))?;
        }
        Event::End(TagEnd::Item) => {
            let kind = if state.in_ordered_list() {
                NodeKind::OrderedItemClose
            } else {
                NodeKind::BulletItemClose
            };
            close(state, nodes, kind);
        }

        // Horizontal rule
        Event::Rule => nodes.push(Node::new(NodeKind::HorizontalRule)),

        // Soft/hard breaks
        Event::SoftBreak => nodes.push(Node::new(NodeKind::SoftBreak)),
        Event::HardBreak => nodes.push(Node::new(NodeKind::HardBreak)),

        // Ignore other events
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(markdown: &str) -> Vec<NodeKind> {
        tokenize(markdown, 32)
            .unwrap()
            .into_iter()
            .map(|node| node.kind)
            .collect()
    }

    #[test]
    fn paragraph_with_strong() {
        use NodeKind::*;
        assert_eq!(
            kinds("a **b** c"),
            vec![ParagraphOpen, Text, StrongOpen, Text, StrongClose, Text, ParagraphClose]
        );
    }

    #[test]
    fn adjacent_text_events_merge() {
        let nodes = tokenize("Hello there, world!", 32).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].content, "Hello there, world!");
    }

    #[test]
    fn ordered_list_carries_start_and_item_kinds() {
        use NodeKind::*;
        let nodes = tokenize("3. c\n4. d", 32).unwrap();
        assert_eq!(nodes[0].start, Some(3));
        assert_eq!(
            nodes.iter().map(|n| n.kind).collect::<Vec<_>>(),
            vec![
                OrderedListOpen,
                OrderedItemOpen,
                Text,
                OrderedItemClose,
                OrderedItemOpen,
                Text,
                OrderedItemClose,
                OrderedListClose,
            ]
        );
    }

    #[test]
    fn fenced_code_is_one_node_with_language() {
        let nodes = tokenize("```rust ignore\nlet a_b = 1;\n```", 32).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::FencedCode);
        assert_eq!(nodes[0].language.as_deref(), Some("rust"));
        assert_eq!(nodes[0].content, "let a_b = 1;\n");
    }

    #[test]
    fn link_keeps_destination() {
        let nodes = tokenize("[x](http://a.b/c_d)", 32).unwrap();
        assert_eq!(nodes[1].kind, NodeKind::LinkOpen);
        assert_eq!(nodes[1].href.as_deref(), Some("http://a.b/c_d"));
    }

    #[test]
    fn inline_html_becomes_text() {
        let nodes = tokenize("a <b>x</b>", 32).unwrap();
        assert!(nodes.iter().all(|n| n.kind != NodeKind::CodeSpan));
        assert_eq!(nodes[1].kind, NodeKind::Text);
        assert_eq!(nodes[1].content, "a <b>x</b>");
    }

    #[test]
    fn nesting_past_limit_fails() {
        let deep = format!("{} deep", ">".repeat(40));
        assert_eq!(
            tokenize(&deep, 32),
            Err(ParseError::TooDeep {
                depth: 33,
                limit: 32
            })
        );
        assert!(tokenize(&deep, 64).is_ok());
    }
}
