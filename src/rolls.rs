use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Most dice a single `/roll` may throw.
pub const MAX_DICE: u32 = 1000;

static DICE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)d([0-9]+)$").expect("dice pattern is valid"));
static DICE_WITH_MODIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+d[0-9]+[+-][0-9]+$").expect("pattern is valid"));
static MODIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("modifier pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidExpression {
    #[error("Invalid `dice` format! Format has to be in NdN!")]
    Dice,
    #[error(
        "Invalid `dice` format! Format has to be in NdN!\nOops, you put a modifier in the `dice` \
         parameter. Please specify the modifier separately in the `modifier` parameter!"
    )]
    ModifierInDice,
    #[error("Invalid `modifier` format! Format has to be in +/-N!")]
    Modifier,
    #[error("Too many dice! You can roll at most {max} at once.")]
    TooManyDice { max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    count: u32,
    sides: u32,
    modifier: Option<i32>,
}

impl DiceExpression {
    /// Parses `NdN` plus an optional `+N`, `-N` or `N` modifier.
    pub fn parse(dice: &str, modifier: Option<&str>) -> Result<Self, InvalidExpression> {
        let dice = dice.trim();
        let captures = match DICE_PATTERN.captures(dice) {
            Some(captures) => captures,
            None if DICE_WITH_MODIFIER_PATTERN.is_match(dice) => {
                return Err(InvalidExpression::ModifierInDice)
            }
            None => return Err(InvalidExpression::Dice),
        };

        // digits only, so a parse failure means the number overflowed
        let count = match captures[1].parse::<u32>() {
            Ok(0) => return Err(InvalidExpression::Dice),
            Ok(count) if count <= MAX_DICE => count,
            _ => return Err(InvalidExpression::TooManyDice { max: MAX_DICE }),
        };
        let sides = match captures[2].parse::<u32>() {
            Ok(0) | Err(_) => return Err(InvalidExpression::Dice),
            Ok(sides) => sides,
        };

        let modifier = match modifier.map(str::trim) {
            None => None,
            Some(text) if MODIFIER_PATTERN.is_match(text) => Some(
                text.parse::<i32>()
                    .map_err(|_| InvalidExpression::Modifier)?,
            ),
            Some(_) => return Err(InvalidExpression::Modifier),
        };

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn modifier(&self) -> Option<i32> {
        self.modifier
    }

    pub fn roll<R: Rng>(&self, rng: &mut R) -> RollResult {
        let outcomes: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let modifier = self.modifier.unwrap_or(0);
        let total = outcomes.iter().map(|&o| i64::from(o)).sum::<i64>() + i64::from(modifier);

        RollResult {
            outcomes,
            modifier,
            total,
        }
    }
}

impl std::fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        if let Some(modifier) = self.modifier {
            write!(f, "{modifier:+}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResult {
    outcomes: Vec<u32>,
    modifier: i32,
    total: i64,
}

impl RollResult {
    pub fn outcomes(&self) -> &[u32] {
        &self.outcomes
    }

    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    pub fn total(&self) -> i64 {
        self.total
    }
}

/// Parses and rolls in one step using the thread-local RNG.
pub fn evaluate(dice: &str, modifier: Option<&str>) -> Result<RollResult, InvalidExpression> {
    let expression = DiceExpression::parse(dice, modifier)?;
    Ok(expression.roll(&mut rand::thread_rng()))
}

/// Template fields for a roll reply.
pub fn roll_fields(
    user: &str,
    expression: &DiceExpression,
    result: &RollResult,
) -> Vec<(&'static str, String)> {
    let outcomes = result
        .outcomes()
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let total_line = if expression.modifier().is_some() {
        format!("\n{user}'s total (with modifier) is {}.", result.total())
    } else if expression.count() > 1 {
        format!("\n{user}'s total is {}.", result.total())
    } else {
        String::new()
    };

    vec![
        ("expression", expression.to_string()),
        ("user", user.to_string()),
        ("outcomes", outcomes),
        ("total_line", total_line),
    ]
}

pub mod commands {
    use super::{roll_fields, DiceExpression};
    use crate::reply::{say_ephemeral, send_chunked};
    use crate::templates::TemplateKind;
    use crate::{Context, Error};

    use poise::serenity_prelude::Mentionable;
    use tracing::debug;

    /// Roll the dice!
    ///
    /// Rolls dice written in NdN format, such as 1d20 or 2d6. An optional
    /// modifier in +/-N format is added to the total.
    #[poise::command(slash_command)]
    pub async fn roll(
        ctx: Context<'_>,
        #[description = "The dice to roll, in NdN format (e.g., 1d20, 2d4...)."] dice: String,
        #[description = "A modifier to add to the total, in +/-N format."]
        modifier: Option<String>,
    ) -> Result<(), Error> {
        let expression = match DiceExpression::parse(&dice, modifier.as_deref()) {
            Ok(expression) => expression,
            Err(e) => {
                debug!("Rejected roll {:?} {:?}: {}", dice, modifier, e);
                return say_ephemeral(ctx, e.to_string()).await;
            }
        };

        let result = expression.roll(&mut rand::thread_rng());
        debug!("Rolled {} for {}: {:?}", expression, ctx.author().name, result);

        let user = ctx.author().mention().to_string();
        let message = ctx
            .data()
            .templates
            .render(TemplateKind::Roll, &roll_fields(&user, &expression, &result))?;

        send_chunked(ctx, message.trim_end(), false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn single_d20_without_modifier() {
        let mut rng = StdRng::seed_from_u64(7);
        let expression = DiceExpression::parse("1d20", None).unwrap();

        let result = expression.roll(&mut rng);

        assert_eq!(result.outcomes().len(), 1);
        assert!((1..=20).contains(&result.total()));
        assert_eq!(result.modifier(), 0);
    }

    #[test]
    fn two_d6_plus_three() {
        let mut rng = StdRng::seed_from_u64(11);
        let expression = DiceExpression::parse("2d6", Some("+3")).unwrap();

        let result = expression.roll(&mut rng);

        assert_eq!(result.outcomes().len(), 2);
        assert!((5..=15).contains(&result.total()));
        let sum: i64 = result.outcomes().iter().map(|&o| i64::from(o)).sum();
        assert_eq!(result.total(), sum + 3);
    }

    #[test]
    fn outcomes_stay_within_sides_and_total_adds_up() {
        let mut rng = StdRng::seed_from_u64(42);
        for (dice, modifier) in [("10d4", Some("-2")), ("50d12", None), ("3d100", Some("7"))] {
            let expression = DiceExpression::parse(dice, modifier).unwrap();

            let result = expression.roll(&mut rng);

            assert_eq!(result.outcomes().len() as u32, expression.count());
            assert!(result
                .outcomes()
                .iter()
                .all(|&o| (1..=expression.sides()).contains(&o)));
            let sum: i64 = result.outcomes().iter().map(|&o| i64::from(o)).sum();
            assert_eq!(result.total(), sum + i64::from(result.modifier()));
        }
    }

    #[test]
    fn one_sided_die_always_rolls_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let expression = DiceExpression::parse("5d1", None).unwrap();

        let result = expression.roll(&mut rng);

        assert_eq!(result.outcomes(), &[1, 1, 1, 1, 1]);
        assert_eq!(result.total(), 5);
    }

    #[test]
    fn malformed_dice_are_rejected() {
        for dice in ["2x6", "0d6", "d20", "2d", "2d0", "", "1d20 extra", "2D6", "-1d6"] {
            assert_eq!(
                DiceExpression::parse(dice, None),
                Err(InvalidExpression::Dice),
                "{dice}"
            );
        }
    }

    #[test]
    fn modifier_inside_dice_gets_a_hint() {
        assert_eq!(
            DiceExpression::parse("1d20+5", None),
            Err(InvalidExpression::ModifierInDice)
        );
    }

    #[test]
    fn malformed_modifier_is_rejected() {
        for modifier in ["+", "three", "+-3", "1d4", "99999999999"] {
            assert_eq!(
                DiceExpression::parse("1d20", Some(modifier)),
                Err(InvalidExpression::Modifier),
                "{modifier}"
            );
        }
    }

    #[test]
    fn unsigned_and_negative_modifiers_are_accepted() {
        assert_eq!(
            DiceExpression::parse("1d20", Some("4")).unwrap().modifier(),
            Some(4)
        );
        assert_eq!(
            DiceExpression::parse("1d20", Some("-4")).unwrap().modifier(),
            Some(-4)
        );
    }

    #[test]
    fn dice_count_is_bounded() {
        assert!(DiceExpression::parse("1000d6", None).is_ok());
        assert_eq!(
            DiceExpression::parse("1001d6", None),
            Err(InvalidExpression::TooManyDice { max: MAX_DICE })
        );
        assert_eq!(
            DiceExpression::parse("99999999999999d6", None),
            Err(InvalidExpression::TooManyDice { max: MAX_DICE })
        );
    }

    #[test]
    fn evaluate_parses_and_rolls() {
        let result = evaluate("3d8", Some("-1")).unwrap();

        assert_eq!(result.outcomes().len(), 3);
        assert!((2..=23).contains(&result.total()));
        assert!(evaluate("3x8", None).is_err());
    }

    #[test]
    fn expression_display_includes_signed_modifier() {
        let with_modifier = DiceExpression::parse(" 2d6 ", Some("3")).unwrap();
        let without = DiceExpression::parse("1d20", None).unwrap();

        assert_eq!(with_modifier.to_string(), "2d6+3");
        assert_eq!(without.to_string(), "1d20");
    }

    #[test]
    fn total_line_depends_on_modifier_and_count() {
        let mut rng = StdRng::seed_from_u64(5);
        let single = DiceExpression::parse("1d20", None).unwrap();
        let several = DiceExpression::parse("2d6", None).unwrap();
        let modified = DiceExpression::parse("1d20", Some("+2")).unwrap();

        let line = |expression: &DiceExpression, rng: &mut StdRng| {
            let result = expression.roll(rng);
            roll_fields("bob", expression, &result)
                .into_iter()
                .find(|(key, _)| *key == "total_line")
                .map(|(_, value)| value)
                .unwrap()
        };

        assert_eq!(line(&single, &mut rng), "");
        assert!(line(&several, &mut rng).starts_with("\nbob's total is "));
        assert!(line(&modified, &mut rng).starts_with("\nbob's total (with modifier) is "));
    }
}
