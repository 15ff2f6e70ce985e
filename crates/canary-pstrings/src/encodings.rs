//! Dispatching messages against every known custom reaction.

use crate::error::PStringError;
use crate::matcher::Matcher;
use crate::parse::PString;
use crate::template::{FillContext, Template};
use tracing::{debug, warn};

/// A stored custom reaction, as handed to [`PStringEncodings::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionSpec {
    /// Database id.
    pub id: i64,
    /// Placeholder string the message must match.
    pub prompt: String,
    /// Placeholder string the bot answers with.
    pub response: String,
    /// Delete the triggering message after answering.
    pub delete_prompt: bool,
    /// Match inside longer messages.
    pub anywhere: bool,
    /// Answer by direct message instead of in the channel.
    pub dm: bool,
}

/// The reaction chosen for a message, with its filled response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Database id of the reaction that matched.
    pub id: i64,
    /// Filled response text.
    pub response: String,
    /// Delete the triggering message after answering.
    pub delete_prompt: bool,
    /// Answer by direct message instead of in the channel.
    pub dm: bool,
}

#[derive(Debug, Clone)]
struct Encoding {
    id: i64,
    matcher: Matcher,
    template: Template,
    delete_prompt: bool,
    dm: bool,
}

impl Encoding {
    fn compile(spec: &ReactionSpec) -> Result<Self, PStringError> {
        let prompt = PString::parse(&spec.prompt)?;
        let matcher = Matcher::compile(&prompt, spec.anywhere)?;
        let template = Template::parse(&spec.response)?;
        template.validate_against(&prompt)?;
        Ok(Self {
            id: spec.id,
            matcher,
            template,
            delete_prompt: spec.delete_prompt,
            dm: spec.dm,
        })
    }
}

/// Compiled set of custom reactions.
///
/// Whole-message prompts are tried before anywhere prompts; within each
/// class the lowest id wins.
#[derive(Debug, Clone, Default)]
pub struct PStringEncodings {
    encodings: Vec<Encoding>,
    skipped: Vec<(i64, PStringError)>,
}

impl PStringEncodings {
    /// Compiles every reaction. Reactions that fail to compile are logged
    /// and left out.
    pub fn new(specs: impl IntoIterator<Item = ReactionSpec>) -> Self {
        let mut encodings = Vec::new();
        let mut skipped = Vec::new();

        for spec in specs {
            match Encoding::compile(&spec) {
                Ok(encoding) => encodings.push(encoding),
                Err(e) => {
                    warn!(reaction_id = spec.id, error = %e, "Skipping custom reaction that does not compile");
                    skipped.push((spec.id, e));
                }
            }
        }

        encodings.sort_by_key(|e| (e.matcher.anywhere(), e.id));
        debug!(
            compiled = encodings.len(),
            skipped = skipped.len(),
            "Compiled custom reactions"
        );

        Self { encodings, skipped }
    }

    /// An empty set that never matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of compiled reactions.
    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    /// Whether no reaction compiled.
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Reactions left out because they did not compile.
    pub fn skipped(&self) -> &[(i64, PStringError)] {
        &self.skipped
    }

    /// Finds the reaction for `message` and fills its response.
    pub fn parser(
        &self,
        message: &str,
        user_mention: &str,
        channel_name: &str,
        rng: &mut fastrand::Rng,
    ) -> Option<Resolved> {
        self.encodings.iter().find_map(|encoding| {
            let captures = encoding.matcher.captures(message)?;
            let ctx = FillContext::new(user_mention, channel_name).with_captures(&captures);
            Some(Resolved {
                id: encoding.id,
                response: encoding.template.fill(&ctx, rng),
                delete_prompt: encoding.delete_prompt,
                dm: encoding.dm,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: i64, prompt: &str, response: &str, anywhere: bool) -> ReactionSpec {
        ReactionSpec {
            id,
            prompt: prompt.to_string(),
            response: response.to_string(),
            delete_prompt: false,
            anywhere,
            dm: false,
        }
    }

    #[test]
    fn test_whole_message_beats_anywhere() {
        let encodings = PStringEncodings::new(vec![
            spec(1, "canary", "anywhere hit", true),
            spec(2, "hello canary", "exact hit", false),
        ]);
        let mut rng = fastrand::Rng::with_seed(0);
        let resolved = encodings
            .parser("hello canary", "<@1>", "general", &mut rng)
            .unwrap();
        assert_eq!(resolved.id, 2);
        assert_eq!(resolved.response, "exact hit");

        let resolved = encodings
            .parser("the canary sings", "<@1>", "general", &mut rng)
            .unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[test]
    fn test_lowest_id_wins_ties() {
        let encodings = PStringEncodings::new(vec![
            spec(9, "ping", "second", false),
            spec(3, "ping", "first", false),
        ]);
        let mut rng = fastrand::Rng::with_seed(0);
        assert_eq!(
            encodings.parser("PING", "", "", &mut rng).unwrap().response,
            "first"
        );
    }

    #[test]
    fn test_broken_reactions_are_skipped() {
        let encodings = PStringEncodings::new(vec![
            spec(1, "%[unclosed", "x", false),
            spec(2, "hi %1%", "%2%", false),
            spec(3, "fine", "ok", false),
        ]);
        assert_eq!(encodings.len(), 1);
        let ids: Vec<i64> = encodings.skipped().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_flags_are_carried() {
        let mut s = spec(4, "secret", "psst %user%", false);
        s.dm = true;
        s.delete_prompt = true;
        let encodings = PStringEncodings::new(vec![s]);
        let mut rng = fastrand::Rng::with_seed(0);
        let resolved = encodings.parser("secret", "<@8>", "", &mut rng).unwrap();
        assert!(resolved.dm);
        assert!(resolved.delete_prompt);
        assert_eq!(resolved.response, "psst <@8>");
    }

    #[test]
    fn test_no_match() {
        let encodings = PStringEncodings::new(vec![spec(1, "a", "b", false)]);
        let mut rng = fastrand::Rng::with_seed(0);
        assert!(encodings.parser("z", "", "", &mut rng).is_none());
        assert!(PStringEncodings::empty()
            .parser("anything", "", "", &mut rng)
            .is_none());
    }
}
