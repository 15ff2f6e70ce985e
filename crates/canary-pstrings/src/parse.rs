//! Parsing of placeholder strings into a node tree.

use crate::error::PStringError;
use std::collections::BTreeSet;
use std::mem;

/// One element of a parsed placeholder string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// `%user%`
    User,
    /// `%channel%`
    Channel,
    /// `%1%` through `%9%`
    Group(u8),
    /// `%[a,b,...]%`; each option is itself a node sequence.
    Choice(Vec<Vec<Node>>),
}

/// A parsed placeholder string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PString {
    source: String,
    nodes: Vec<Node>,
}

/// An open `%[` whose options are still being collected.
struct Frame {
    offset: usize,
    options: Vec<Vec<Node>>,
    current: Vec<Node>,
}

impl PString {
    /// Parses `input`.
    ///
    /// Unrecognised `%` sequences and a stray `]%` are kept as literal text.
    pub fn parse(input: &str) -> Result<Self, PStringError> {
        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while let Some(ch) = input[i..].chars().next() {
            let rest = &input[i..];

            if rest.starts_with("%[") {
                flush(&mut text, target(&mut root, &mut stack));
                stack.push(Frame {
                    offset: i,
                    options: Vec::new(),
                    current: Vec::new(),
                });
                i += 2;
                continue;
            }

            if !stack.is_empty() && rest.starts_with("]%") {
                flush(&mut text, target(&mut root, &mut stack));
                if let Some(mut frame) = stack.pop() {
                    frame.options.push(trim_option(frame.current));
                    target(&mut root, &mut stack).push(Node::Choice(frame.options));
                }
                i += 2;
                continue;
            }

            if ch == ',' {
                if let Some(frame) = stack.last_mut() {
                    flush(&mut text, &mut frame.current);
                    let option = mem::take(&mut frame.current);
                    frame.options.push(trim_option(option));
                    i += 1;
                    continue;
                }
            }

            if ch == '%' {
                if let Some((node, len)) = placeholder(rest) {
                    flush(&mut text, target(&mut root, &mut stack));
                    target(&mut root, &mut stack).push(node);
                    i += len;
                    continue;
                }
            }

            text.push(ch);
            i += ch.len_utf8();
        }

        if let Some(frame) = stack.first() {
            return Err(PStringError::UnclosedChoice {
                offset: frame.offset,
            });
        }
        flush(&mut text, &mut root);

        Ok(Self {
            source: input.to_string(),
            nodes: root,
        })
    }

    /// The text this was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed node sequence.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether the string contains nothing at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Capture group numbers used anywhere in the string, ascending.
    pub fn groups(&self) -> Vec<u8> {
        let mut found = BTreeSet::new();
        collect_groups(&self.nodes, &mut found);
        found.into_iter().collect()
    }
}

fn collect_groups(nodes: &[Node], found: &mut BTreeSet<u8>) {
    for node in nodes {
        match node {
            Node::Group(n) => {
                found.insert(*n);
            }
            Node::Choice(options) => {
                for option in options {
                    collect_groups(option, found);
                }
            }
            Node::Text(_) | Node::User | Node::Channel => {}
        }
    }
}

/// The node list new nodes are appended to: the innermost open choice
/// option, or the top level.
fn target<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => &mut frame.current,
        None => root,
    }
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(mem::take(text)));
    }
}

/// Recognises `%user%`, `%channel%` and `%1%`..`%9%` at the start of `rest`.
fn placeholder(rest: &str) -> Option<(Node, usize)> {
    if rest.starts_with("%user%") {
        return Some((Node::User, "%user%".len()));
    }
    if rest.starts_with("%channel%") {
        return Some((Node::Channel, "%channel%".len()));
    }
    match rest.as_bytes() {
        [b'%', d @ b'1'..=b'9', b'%', ..] => Some((Node::Group(d - b'0'), 3)),
        _ => None,
    }
}

/// Strips whitespace around a choice option.
fn trim_option(mut option: Vec<Node>) -> Vec<Node> {
    if let Some(Node::Text(first)) = option.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Node::Text(last)) = option.last_mut() {
        *last = last.trim_end().to_string();
    }
    option.retain(|node| !matches!(node, Node::Text(t) if t.is_empty()));
    option
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        let p = PString::parse("hello there").unwrap();
        assert_eq!(p.nodes(), &[text("hello there")]);
        assert!(p.groups().is_empty());
    }

    #[test]
    fn test_placeholders() {
        let p = PString::parse("hi %user%, welcome to %channel%! %1% %2%").unwrap();
        assert_eq!(
            p.nodes(),
            &[
                text("hi "),
                Node::User,
                text(", welcome to "),
                Node::Channel,
                text("! "),
                Node::Group(1),
                text(" "),
                Node::Group(2),
            ]
        );
        assert_eq!(p.groups(), vec![1, 2]);
    }

    #[test]
    fn test_unknown_percent_is_literal() {
        let p = PString::parse("100% sure %0% %10% %usr%").unwrap();
        assert_eq!(p.nodes(), &[text("100% sure %0% %10% %usr%")]);
    }

    #[test]
    fn test_choice_options_are_trimmed() {
        let p = PString::parse("%[hi, hello ,hey]% there").unwrap();
        assert_eq!(
            p.nodes(),
            &[
                Node::Choice(vec![vec![text("hi")], vec![text("hello")], vec![text("hey")]]),
                text(" there"),
            ]
        );
    }

    #[test]
    fn test_nested_choice() {
        let p = PString::parse("%[a,%[b,c]%d]%").unwrap();
        assert_eq!(
            p.nodes(),
            &[Node::Choice(vec![
                vec![text("a")],
                vec![
                    Node::Choice(vec![vec![text("b")], vec![text("c")]]),
                    text("d")
                ],
            ])]
        );
    }

    #[test]
    fn test_groups_inside_choice() {
        let p = PString::parse("%[%2% is cool,%1%]%").unwrap();
        assert_eq!(p.groups(), vec![1, 2]);
    }

    #[test]
    fn test_empty_option_allowed() {
        let p = PString::parse("yes%[!,]%").unwrap();
        assert_eq!(
            p.nodes(),
            &[text("yes"), Node::Choice(vec![vec![text("!")], vec![]])]
        );
    }

    #[test]
    fn test_comma_outside_choice_is_text() {
        let p = PString::parse("a, b").unwrap();
        assert_eq!(p.nodes(), &[text("a, b")]);
    }

    #[test]
    fn test_stray_close_is_literal() {
        let p = PString::parse("oops ]% done").unwrap();
        assert_eq!(p.nodes(), &[text("oops ]% done")]);
    }

    #[test]
    fn test_unclosed_choice() {
        let err = PString::parse("ok %[a,%[b]% c").unwrap_err();
        assert_eq!(err, PStringError::UnclosedChoice { offset: 3 });
    }

    #[test]
    fn test_multibyte_text() {
        let p = PString::parse("héllo %[🐦,canary]%").unwrap();
        assert_eq!(
            p.nodes(),
            &[
                text("héllo "),
                Node::Choice(vec![vec![text("🐦")], vec![text("canary")]])
            ]
        );
    }
}
