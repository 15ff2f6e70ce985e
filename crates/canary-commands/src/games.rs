//! Dice and random picks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::framework::{user_error, Context, Error};

static ROLL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d*)d(\d+)(?:\s*([+-])\s*(\d+))?$").expect("roll pattern is valid")
});

/// A parsed `NdM+K` roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollSpec {
    /// Number of dice
    pub count: u32,
    /// Faces per die
    pub sides: u32,
    /// Added to the sum
    pub modifier: i64,
}

impl Default for RollSpec {
    fn default() -> Self {
        Self {
            count: 1,
            sides: 6,
            modifier: 0,
        }
    }
}

/// Outcome of a roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResult {
    /// Each die in roll order
    pub dice: Vec<u32>,
    /// Dice sum plus modifier
    pub total: i64,
}

/// Parses `NdM`, `dM` or `NdM+K`/`NdM-K`.
pub fn parse_roll(input: &str) -> Result<RollSpec, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(RollSpec::default());
    }
    let caps = ROLL_PATTERN
        .captures(input)
        .ok_or_else(|| format!("`{input}` is not a roll. Try something like `2d6+3`."))?;

    let count = match caps.get(1).map(|m| m.as_str()) {
        None | Some("") => 1,
        Some(n) => n.parse::<u32>().unwrap_or(u32::MAX),
    };
    let sides = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(u32::MAX);
    let modifier = caps
        .get(4)
        .map_or(Some(0), |m| m.as_str().parse::<i64>().ok())
        .unwrap_or(i64::MAX);
    let modifier = if caps.get(3).is_some_and(|m| m.as_str() == "-") {
        -modifier
    } else {
        modifier
    };

    if !(1..=100).contains(&count) {
        return Err("You can roll between 1 and 100 dice.".to_string());
    }
    if !(2..=1000).contains(&sides) {
        return Err("Dice have between 2 and 1000 sides.".to_string());
    }
    if modifier.abs() > 10_000 {
        return Err("The modifier can be at most 10000.".to_string());
    }
    Ok(RollSpec {
        count,
        sides,
        modifier,
    })
}

/// Rolls the dice of `spec`.
pub fn roll_dice(spec: RollSpec, rng: &mut fastrand::Rng) -> RollResult {
    let dice: Vec<u32> = (0..spec.count).map(|_| rng.u32(1..=spec.sides)).collect();
    let total = dice.iter().map(|&d| i64::from(d)).sum::<i64>() + spec.modifier;
    RollResult { dice, total }
}

/// Renders a roll for chat.
pub fn format_roll(spec: RollSpec, result: &RollResult) -> String {
    let dice = result
        .dice
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let modifier = match spec.modifier {
        0 => String::new(),
        m if m > 0 => format!(" + {m}"),
        m => format!(" - {}", -m),
    };
    format!(
        "🎲 {}d{}: [{dice}]{modifier} = **{}**",
        spec.count, spec.sides, result.total
    )
}

/// Roll dice, e.g. `2d6+3` (default `1d6`)
#[poise::command(prefix_command, slash_command, category = "Games")]
pub async fn roll(
    ctx: Context<'_>,
    #[description = "Dice to roll, like 2d6+3"]
    #[rest]
    dice: Option<String>,
) -> Result<(), Error> {
    let spec = parse_roll(dice.as_deref().unwrap_or_default()).map_err(user_error)?;
    let result = roll_dice(spec, &mut fastrand::Rng::new());
    ctx.say(format_roll(spec, &result)).await?;
    Ok(())
}

/// Splits `a, b, c` into trimmed, non-empty options.
pub fn parse_options(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect()
}

/// Pick one of several comma-separated options
#[poise::command(prefix_command, slash_command, category = "Games")]
pub async fn choose(
    ctx: Context<'_>,
    #[description = "Options separated by commas"]
    #[rest]
    options: String,
) -> Result<(), Error> {
    let options = parse_options(&options);
    if options.len() < 2 {
        return Err(user_error("Give me at least two options, separated by commas."));
    }
    let pick = options[fastrand::usize(..options.len())];
    ctx.say(format!("I choose **{pick}**.")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_roll_forms() {
        assert_eq!(parse_roll("").unwrap(), RollSpec::default());
        assert_eq!(
            parse_roll("d20").unwrap(),
            RollSpec { count: 1, sides: 20, modifier: 0 }
        );
        assert_eq!(
            parse_roll("3D8 - 2").unwrap(),
            RollSpec { count: 3, sides: 8, modifier: -2 }
        );
        assert_eq!(
            parse_roll(" 2d6+10000 ").unwrap(),
            RollSpec { count: 2, sides: 6, modifier: 10_000 }
        );
    }

    #[test]
    fn test_parse_roll_limits() {
        assert!(parse_roll("0d6").is_err());
        assert!(parse_roll("101d6").is_err());
        assert!(parse_roll("1d1").is_err());
        assert!(parse_roll("1d1001").is_err());
        assert!(parse_roll("1d6+10001").is_err());
        assert!(parse_roll("99999999999d6").is_err());
        assert!(parse_roll("two dice").is_err());
    }

    #[test]
    fn test_format_roll() {
        let spec = RollSpec { count: 2, sides: 6, modifier: -1 };
        let result = RollResult { dice: vec![3, 5], total: 7 };
        assert_eq!(format_roll(spec, &result), "🎲 2d6: [3, 5] - 1 = **7**");
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options(" tea, coffee ,, water "), vec!["tea", "coffee", "water"]);
        assert!(parse_options(" , ").is_empty());
    }

    proptest! {
        #[test]
        fn prop_dice_stay_in_range(count in 1_u32..=100, sides in 2_u32..=1000, modifier in -10_000_i64..=10_000, seed: u64) {
            let spec = RollSpec { count, sides, modifier };
            let result = roll_dice(spec, &mut fastrand::Rng::with_seed(seed));
            prop_assert_eq!(result.dice.len(), count as usize);
            prop_assert!(result.dice.iter().all(|&d| (1..=sides).contains(&d)));
            let sum: i64 = result.dice.iter().map(|&d| i64::from(d)).sum();
            prop_assert_eq!(result.total, sum + modifier);
        }
    }
}
