//! Filling response templates.

use crate::error::PStringError;
use crate::matcher::Captures;
use crate::parse::{Node, PString};

/// Values substituted into a response.
#[derive(Debug, Clone, Copy)]
pub struct FillContext<'a> {
    /// Mention of the message author, substituted for `%user%`.
    pub user_mention: &'a str,
    /// Name of the channel, substituted for `%channel%`.
    pub channel_name: &'a str,
    /// Groups captured by the prompt.
    pub captures: Option<&'a Captures>,
}

impl<'a> FillContext<'a> {
    /// A context without captures.
    pub const fn new(user_mention: &'a str, channel_name: &'a str) -> Self {
        Self {
            user_mention,
            channel_name,
            captures: None,
        }
    }

    /// Adds the prompt's captures.
    #[must_use]
    pub const fn with_captures(mut self, captures: &'a Captures) -> Self {
        self.captures = Some(captures);
        self
    }
}

/// A parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pstring: PString,
}

impl Template {
    /// Parses a response.
    pub fn parse(response: &str) -> Result<Self, PStringError> {
        Ok(Self {
            pstring: PString::parse(response)?,
        })
    }

    /// The response text as written.
    pub fn source(&self) -> &str {
        self.pstring.source()
    }

    /// Fails when the response refers to a group `prompt` does not define.
    pub fn validate_against(&self, prompt: &PString) -> Result<(), PStringError> {
        let available = prompt.groups();
        match self
            .pstring
            .groups()
            .into_iter()
            .find(|n| !available.contains(n))
        {
            Some(missing) => Err(PStringError::UnknownGroup(missing)),
            None => Ok(()),
        }
    }

    /// Produces the response text.
    ///
    /// Groups that did not capture anything fill as empty text. Every choice
    /// list, nested ones included, picks one option uniformly.
    pub fn fill(&self, ctx: &FillContext<'_>, rng: &mut fastrand::Rng) -> String {
        let mut out = String::new();
        fill_nodes(self.pstring.nodes(), ctx, rng, &mut out);
        out
    }
}

fn fill_nodes(nodes: &[Node], ctx: &FillContext<'_>, rng: &mut fastrand::Rng, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::User => out.push_str(ctx.user_mention),
            Node::Channel => out.push_str(ctx.channel_name),
            Node::Group(n) => {
                if let Some(text) = ctx.captures.and_then(|c| c.get(*n)) {
                    out.push_str(text);
                }
            }
            Node::Choice(options) => {
                if !options.is_empty() {
                    let picked = &options[rng.usize(..options.len())];
                    fill_nodes(picked, ctx, rng, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use std::collections::HashSet;

    #[test]
    fn test_user_and_channel() {
        let t = Template::parse("hey %user%, this is #%channel%").unwrap();
        let mut rng = fastrand::Rng::with_seed(1);
        let out = t.fill(&FillContext::new("<@5>", "general"), &mut rng);
        assert_eq!(out, "hey <@5>, this is #general");
    }

    #[test]
    fn test_groups_fill_from_captures() {
        let prompt = PString::parse("%1% > %2%").unwrap();
        let matcher = Matcher::compile(&prompt, false).unwrap();
        let caps = matcher.captures("tea > coffee").unwrap();

        let t = Template::parse("%2% < %1%").unwrap();
        t.validate_against(&prompt).unwrap();
        let mut rng = fastrand::Rng::with_seed(1);
        let out = t.fill(&FillContext::new("", "").with_captures(&caps), &mut rng);
        assert_eq!(out, "coffee < tea");
    }

    #[test]
    fn test_missing_capture_fills_empty() {
        let t = Template::parse("[%1%]").unwrap();
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(t.fill(&FillContext::new("", ""), &mut rng), "[]");
    }

    #[test]
    fn test_unknown_group_rejected() {
        let prompt = PString::parse("hello %1%").unwrap();
        let t = Template::parse("%1% %3%").unwrap();
        assert_eq!(
            t.validate_against(&prompt),
            Err(PStringError::UnknownGroup(3))
        );
    }

    #[test]
    fn test_choices_cover_every_option() {
        let t = Template::parse("%[a,b,%[c,d]%]%").unwrap();
        let mut rng = fastrand::Rng::with_seed(42);
        let seen: HashSet<String> = (0..500)
            .map(|_| t.fill(&FillContext::new("", ""), &mut rng))
            .collect();
        let expected: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_seeded_fill_is_deterministic() {
        let t = Template::parse("%[x,y,z]%%[1,2,3]%").unwrap();
        let ctx = FillContext::new("", "");
        let a: Vec<String> = {
            let mut rng = fastrand::Rng::with_seed(9);
            (0..10).map(|_| t.fill(&ctx, &mut rng)).collect()
        };
        let b: Vec<String> = {
            let mut rng = fastrand::Rng::with_seed(9);
            (0..10).map(|_| t.fill(&ctx, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}
