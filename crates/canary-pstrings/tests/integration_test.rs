//! Integration tests for canary-pstrings crate.
//!
//! These exercise the prompt/response pipeline end to end the way the
//! custom reaction dispatcher drives it.

use canary_common::test_utils::init_test_logging;
use canary_pstrings::{
    validate_reaction, Matcher, PString, PStringEncodings, PStringError, ReactionSpec,
};
use proptest::prelude::*;

fn reaction(id: i64, prompt: &str, response: &str, anywhere: bool) -> ReactionSpec {
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
fn test_realistic_reaction_set() {
    init_test_logging();

    let encodings = PStringEncodings::new(vec![
        reaction(1, "%[good,great,best]% bot", "%[thanks,ty,:)]% %user%", false),
        reaction(2, "is %1% a good course?", "%1% is a %[great,terrible]% course", false),
        reaction(3, "f", "F", false),
        reaction(4, "rip", "rest in peace in %channel%", true),
    ]);
    assert_eq!(encodings.len(), 4);
    let mut rng = fastrand::Rng::with_seed(2024);

    let r = encodings.parser("Best bot", "<@10>", "general", &mut rng).unwrap();
    assert_eq!(r.id, 1);
    assert!(r.response.ends_with(" <@10>"));
    assert!(["thanks", "ty", ":)"].iter().any(|w| r.response.starts_with(w)));

    let r = encodings
        .parser("is COMP 251 a good course?", "<@10>", "general", &mut rng)
        .unwrap();
    assert!(r.response.starts_with("COMP 251 is a "));

    let r = encodings.parser("F", "<@10>", "general", &mut rng).unwrap();
    assert_eq!(r.response, "F");

    let r = encodings
        .parser("my grades, rip.", "<@10>", "memes", &mut rng)
        .unwrap();
    assert_eq!(r.response, "rest in peace in memes");

    assert!(encodings
        .parser("friendly bot", "<@10>", "general", &mut rng)
        .is_none());
}

#[test]
fn test_validate_reaction() {
    assert!(validate_reaction("hi %1%", "hello %1%", false).is_ok());
    assert_eq!(
        validate_reaction("hi", "hello %1%", false),
        Err(PStringError::UnknownGroup(1))
    );
    assert_eq!(
        validate_reaction("", "hello", true),
        Err(PStringError::EmptyPrompt)
    );
    assert!(matches!(
        validate_reaction("%[a,b", "x", false),
        Err(PStringError::UnclosedChoice { offset: 0 })
    ));
}

proptest! {
    #[test]
    fn test_literal_prompt_matches_itself(text in "[a-zA-Z0-9 .?!*+()\\[\\]{}^$|\\\\-]{1,40}") {
        let prompt = PString::parse(&text).unwrap();
        let matcher = Matcher::compile(&prompt, false).unwrap();
        prop_assert!(matcher.is_match(&text));
        prop_assert!(matcher.is_match(&text.to_uppercase()));
    }

    #[test]
    fn test_literal_prompt_rejects_extensions(text in "[a-z]{1,20}", suffix in "[a-z]{1,5}") {
        let prompt = PString::parse(&text).unwrap();
        let matcher = Matcher::compile(&prompt, false).unwrap();
        let extended = format!("{text}{suffix}");
        prop_assert!(!matcher.is_match(&extended));
    }

    #[test]
    fn test_single_group_captures_everything(prefix in "[a-z]{1,10}", body in "[a-zA-Z0-9 ]{1,30}") {
        let prompt = PString::parse(&format!("{prefix}: %1%")).unwrap();
        let matcher = Matcher::compile(&prompt, false).unwrap();
        let caps = matcher.captures(&format!("{prefix}: {body}")).unwrap();
        prop_assert_eq!(caps.get(1), Some(body.as_str()));
    }
}
