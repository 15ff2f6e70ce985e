//! Compilation of prompts into regular expressions.

use crate::error::PStringError;
use crate::parse::{Node, PString};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::iter;

const USER_MENTION: &str = r"<@!?\d+>";
const CHANNEL_MENTION: &str = r"<#\d+>";

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w").expect("word pattern is valid"));

/// Text captured by a prompt's `%N%` groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: BTreeMap<u8, String>,
}

impl Captures {
    /// The text captured by group `n`, if it took part in the match.
    pub fn get(&self, n: u8) -> Option<&str> {
        self.groups.get(&n).map(String::as_str)
    }

    /// Number of groups that captured text.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group captured text.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A compiled prompt.
///
/// Every prompt compiles to a single expression. A prompt that repeats a
/// `%N%` also keeps a lowered copy of its nodes, matched by backtracking
/// over every split of the message, since the expression alone cannot tie
/// the repeats together.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    /// Regex group names of every occurrence of each `%N%`, in order.
    occurrences: BTreeMap<u8, Vec<String>>,
    program: Option<Vec<Piece>>,
    anywhere: bool,
}

#[derive(Debug, Clone)]
enum Piece {
    /// Text or a mention, anchored at the current position.
    Fixed(Regex),
    Group(u8),
    Choice(Vec<Vec<Piece>>),
}

/// What is left to match once the current sequence is done.
#[derive(Clone, Copy)]
enum Rest<'a> {
    End,
    Then(&'a [Piece], &'a Rest<'a>),
}

/// Byte range bound to each group so far.
type Spans = BTreeMap<u8, (usize, usize)>;

impl Matcher {
    /// Compiles a prompt.
    ///
    /// Without `anywhere` the whole message must match. With it the prompt
    /// may appear inside a longer message as long as it is not glued to
    /// surrounding word characters.
    pub fn compile(prompt: &PString, anywhere: bool) -> Result<Self, PStringError> {
        if prompt.is_empty() {
            return Err(PStringError::EmptyPrompt);
        }

        let mut occurrences = BTreeMap::new();
        let mut body = String::new();
        emit(prompt.nodes(), &mut body, &mut occurrences);

        let pattern = if anywhere {
            format!(r"(?is)(?:^|\W)(?:{body})(?:\W|$)")
        } else {
            format!(r"(?is)^(?:{body})$")
        };

        let repeats = occurrences.values().any(|names| names.len() > 1);
        let program = if repeats {
            Some(lower(prompt.nodes())?)
        } else {
            None
        };

        Ok(Self {
            regex: Regex::new(&pattern)?,
            occurrences,
            program,
            anywhere,
        })
    }

    /// Whether this matcher searches inside longer messages.
    pub const fn anywhere(&self) -> bool {
        self.anywhere
    }

    /// The generated expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Matches `text`, returning the captured groups.
    ///
    /// A repeated `%N%` must capture the same text, ignoring case, each time
    /// it takes part in the match. Every way of splitting the message is
    /// tried before giving up, and a repeated group reports the text of its
    /// first occurrence.
    pub fn captures(&self, text: &str) -> Option<Captures> {
        let Some(program) = &self.program else {
            let caps = self.regex.captures(text)?;
            let groups = self
                .occurrences
                .iter()
                .filter_map(|(&n, names)| {
                    let found = caps.name(names.first()?)?;
                    Some((n, found.as_str().to_string()))
                })
                .collect();
            return Some(Captures { groups });
        };

        // the expression ignores repeats, so a miss there rules out any split
        if !self.regex.is_match(text) {
            return None;
        }
        let whole = Rest::Then(program.as_slice(), &Rest::End);
        let mut spans = Spans::new();
        self.starts(text)
            .into_iter()
            .find(|&start| self.step(&whole, text, start, &mut spans))?;
        let groups = spans
            .into_iter()
            .map(|(n, (start, end))| (n, text[start..end].to_string()))
            .collect();
        Some(Captures { groups })
    }

    /// Whether `text` matches at all.
    pub fn is_match(&self, text: &str) -> bool {
        self.captures(text).is_some()
    }

    /// Offsets the prompt may start at.
    fn starts(&self, text: &str) -> Vec<usize> {
        if !self.anywhere {
            return vec![0];
        }
        text.char_indices()
            .map(|(i, _)| i)
            .filter(|&i| !ends_with_word(&text[..i]))
            .collect()
    }

    fn ends_at(&self, text: &str, pos: usize) -> bool {
        if self.anywhere {
            !WORD.is_match(&text[pos..])
        } else {
            pos == text.len()
        }
    }

    /// Matches what `rest` describes from `pos` on, binding groups in
    /// `spans`. Bindings made on a failed path are removed again.
    fn step(&self, rest: &Rest<'_>, text: &str, pos: usize, spans: &mut Spans) -> bool {
        let Rest::Then(sequence, after) = *rest else {
            return self.ends_at(text, pos);
        };
        let Some((piece, remaining)) = sequence.split_first() else {
            return self.step(after, text, pos, spans);
        };
        let next = Rest::Then(remaining, after);

        match piece {
            Piece::Fixed(regex) => regex
                .find(&text[pos..])
                .is_some_and(|found| self.step(&next, text, pos + found.end(), spans)),
            Piece::Group(n) => {
                if let Some(&(start, end)) = spans.get(n) {
                    return prefix_len_ignoring_case(&text[start..end], &text[pos..])
                        .is_some_and(|len| self.step(&next, text, pos + len, spans));
                }
                if pos >= text.len() {
                    return false;
                }
                let ends: Vec<usize> = text[pos..]
                    .char_indices()
                    .skip(1)
                    .map(|(i, _)| pos + i)
                    .chain(iter::once(text.len()))
                    .collect();
                // longest first, like the greedy expression
                for &end in ends.iter().rev() {
                    spans.insert(*n, (pos, end));
                    if self.step(&next, text, end, spans) {
                        return true;
                    }
                }
                spans.remove(n);
                false
            }
            Piece::Choice(options) => options
                .iter()
                .any(|option| self.step(&Rest::Then(option.as_slice(), &next), text, pos, spans)),
        }
    }
}

fn ends_with_word(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| WORD.is_match(c.encode_utf8(&mut [0; 4])))
}

/// Byte length of the start of `text` that equals `expected` when case is
/// ignored.
fn prefix_len_ignoring_case(expected: &str, text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let mut len = 0;
    for want in expected.chars() {
        let got = chars.next()?;
        if got != want && !got.to_lowercase().eq(want.to_lowercase()) {
            return None;
        }
        len += got.len_utf8();
    }
    Some(len)
}

/// Lowers `nodes` for the backtracking matcher.
fn lower(nodes: &[Node]) -> Result<Vec<Piece>, regex::Error> {
    nodes
        .iter()
        .map(|node| {
            Ok(match node {
                Node::Text(text) => Piece::Fixed(anchored(&regex::escape(text))?),
                Node::User => Piece::Fixed(anchored(USER_MENTION)?),
                Node::Channel => Piece::Fixed(anchored(CHANNEL_MENTION)?),
                Node::Group(n) => Piece::Group(*n),
                Node::Choice(options) => Piece::Choice(
                    options
                        .iter()
                        .map(|option| lower(option))
                        .collect::<Result<_, _>>()?,
                ),
            })
        })
        .collect()
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?is)^(?:{pattern})"))
}

/// Appends the expression for `nodes` to `out`.
///
/// Choice lists recurse before their alternation group is closed, so nested
/// lists are expanded innermost-first.
fn emit(nodes: &[Node], out: &mut String, occurrences: &mut BTreeMap<u8, Vec<String>>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&regex::escape(text)),
            Node::User => out.push_str(USER_MENTION),
            Node::Channel => out.push_str(CHANNEL_MENTION),
            Node::Group(n) => {
                let names = occurrences.entry(*n).or_default();
                let name = if names.is_empty() {
                    format!("g{n}")
                } else {
                    format!("g{n}_{}", names.len())
                };
                out.push_str(&format!("(?P<{name}>.+)"));
                names.push(name);
            }
            Node::Choice(options) => {
                out.push_str("(?:");
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    emit(option, out, occurrences);
                }
                out.push(')');
            }
        }
    }
}
