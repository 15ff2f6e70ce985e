//! # Canary P-Strings
//!
//! Placeholder strings ("p-strings") describe both what a custom reaction
//! listens for and what it answers with:
//!
//! | Placeholder    | In a prompt                       | In a response                    |
//! |----------------|-----------------------------------|----------------------------------|
//! | `%user%`       | a user mention                    | the author's mention             |
//! | `%channel%`    | a channel mention                 | the channel name                 |
//! | `%1%`..`%9%`   | capture group                     | the captured text                |
//! | `%[a,b,...]%`  | any one of the options            | one option picked at random      |
//!
//! Prompts are compiled to case-insensitive regular expressions by
//! [`Matcher`], responses are filled by [`Template`], and
//! [`PStringEncodings`] dispatches an incoming message against every
//! known reaction.
//!
//! ```
//! use canary_pstrings::{Matcher, PString, Template, FillContext};
//!
//! let prompt = PString::parse("i love %1%").unwrap();
//! let matcher = Matcher::compile(&prompt, false).unwrap();
//! let captures = matcher.captures("I love Rust").unwrap();
//!
//! let template = Template::parse("%user% also loves %1%").unwrap();
//! let mut rng = fastrand::Rng::with_seed(7);
//! let ctx = FillContext::new("<@1>", "general").with_captures(&captures);
//! assert_eq!(template.fill(&ctx, &mut rng), "<@1> also loves Rust");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod encodings;
pub mod error;
pub mod matcher;
pub mod parse;
pub mod template;

pub use encodings::*;
pub use error::*;
pub use matcher::*;
pub use parse::*;
pub use template::*;

/// Checks that a prompt/response pair would compile into a working reaction.
pub fn validate_reaction(prompt: &str, response: &str, anywhere: bool) -> Result<(), PStringError> {
    let prompt = PString::parse(prompt)?;
    Matcher::compile(&prompt, anywhere)?;
    Template::parse(response)?.validate_against(&prompt)
}
