//! Transformers turn the leading tokens of a command line into typed arguments.
//!
//! Each transformer consumes as much of an [`Args`] cursor as it needs.  They are deliberately
//! simple: no grammar, no lookahead beyond the current token.  [`Args::parse`] restores the cursor
//! when a transformer fails, which is what [`Optional`] relies on.

use crate::framework::args::Args;
use regex::Regex;
use serenity::all::UserId;
use std::sync::LazyLock;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("missing {expected}")]
    Missing { expected: &'static str },
    #[error("`{found}` is not a valid {expected}")]
    Invalid {
        expected: &'static str,
        found: String,
    },
    #[error("`{found}` must be between {min} and {max}")]
    OutOfRange {
        found: String,
        min: String,
        max: String,
    },
    #[error("unclosed quotation mark")]
    UnclosedQuote,
    #[error("unexpected argument `{found}`")]
    TooManyArguments { found: String },
}

pub trait Transformer {
    type Output;

    fn transform(&self, args: &mut Args) -> Result<Self::Output, TransformError>;
}

/// A single token.
pub struct Word;

impl Transformer for Word {
    type Output = String;

    fn transform(&self, args: &mut Args) -> Result<String, TransformError> {
        args.require_token("word")
    }
}

/// Everything that is left.  Must not be empty.
pub struct Rest;

impl Transformer for Rest {
    type Output = String;

    fn transform(&self, args: &mut Args) -> Result<String, TransformError> {
        if args.is_empty() {
            return Err(TransformError::Missing { expected: "text" });
        }
        Ok(args.take_rest())
    }
}

/// Integer within an inclusive range.
pub struct Integer {
    pub min: i64,
    pub max: i64,
}

impl Integer {
    pub const fn range(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Transformer for Integer {
    type Output = i64;

    fn transform(&self, args: &mut Args) -> Result<i64, TransformError> {
        let token = args.require_token("number")?;
        let value: i64 = token.parse().map_err(|_| TransformError::Invalid {
            expected: "number",
            found: token.clone(),
        })?;

        if !(self.min..=self.max).contains(&value) {
            return Err(TransformError::OutOfRange {
                found: token,
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(value)
    }
}

/// One of a fixed set of keywords, matched case-insensitively.
pub struct Choice(pub &'static [&'static str]);

impl Transformer for Choice {
    type Output = &'static str;

    fn transform(&self, args: &mut Args) -> Result<&'static str, TransformError> {
        let token = args.require_token("option")?;
        self.0
            .iter()
            .find(|choice| choice.eq_ignore_ascii_case(&token))
            .copied()
            .ok_or(TransformError::Invalid {
                expected: "option",
                found: token,
            })
    }
}

/// Strips one of the mention `prefixes` and the closing `>`.  Bare ids are accepted too.
fn parse_mention(token: &str, prefixes: &[&str]) -> Option<u64> {
    let id = prefixes
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix)?.strip_suffix('>'))
        .unwrap_or(token);

    id.parse::<u64>().ok().filter(|id| *id != 0)
}

/// `<@id>`, `<@!id>` or a bare user id.
pub struct UserMention;

impl Transformer for UserMention {
    type Output = UserId;

    fn transform(&self, args: &mut Args) -> Result<UserId, TransformError> {
        let token = args.require_token("user")?;
        parse_mention(&token, &["<@!", "<@"])
            .map(UserId::new)
            .ok_or(TransformError::Invalid {
                expected: "user",
                found: token,
            })
    }
}

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap()
});

/// Parses `1w2d3h4m5s` and any in-order subset of it.  A bare number means minutes.
pub fn parse_duration(token: &str) -> Option<Duration> {
    if let Ok(minutes) = token.parse::<u64>() {
        return minutes.checked_mul(60).map(Duration::from_secs);
    }

    let caps = DURATION_REGEX.captures(token)?;
    const UNITS: [u64; 5] = [7 * 24 * 60 * 60, 24 * 60 * 60, 60 * 60, 60, 1];

    let mut seconds: u64 = 0;
    let mut any = false;
    for (i, unit) in UNITS.iter().enumerate() {
        if let Some(value) = caps.get(i + 1) {
            let value: u64 = value.as_str().parse().ok()?;
            seconds = seconds.checked_add(value.checked_mul(*unit)?)?;
            any = true;
        }
    }

    any.then(|| Duration::from_secs(seconds))
}

/// A non-zero duration such as `1h30m`, optionally capped.
pub struct DurationArg {
    pub max: Option<Duration>,
}

impl DurationArg {
    pub const fn max(max: Duration) -> Self {
        Self { max: Some(max) }
    }
}

impl Transformer for DurationArg {
    type Output = Duration;

    fn transform(&self, args: &mut Args) -> Result<Duration, TransformError> {
        let token = args.require_token("duration")?;
        let duration = parse_duration(&token)
            .filter(|duration| !duration.is_zero())
            .ok_or(TransformError::Invalid {
                expected: "duration (e.g. 1h30m)",
                found: token.clone(),
            })?;

        match self.max {
            Some(max) if duration > max => Err(TransformError::OutOfRange {
                found: token,
                min: "1s".to_owned(),
                max: crate::helper::format_duration(max),
            }),
            _ => Ok(duration),
        }
    }
}

/// `#rrggbb`, `rrggbb` or `#rgb`.
pub struct HexColor;

fn parse_hex_color(token: &str) -> Option<[u8; 3]> {
    let hex = token.strip_prefix('#').unwrap_or(token);
    if !hex.is_ascii() {
        return None;
    }

    match hex.len() {
        6 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some([channel(0)?, channel(2)?, channel(4)?])
        }
        3 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some([channel(0)?, channel(1)?, channel(2)?])
        }
        _ => None,
    }
}

impl Transformer for HexColor {
    type Output = [u8; 3];

    fn transform(&self, args: &mut Args) -> Result<[u8; 3], TransformError> {
        let token = args.require_token("color")?;
        parse_hex_color(&token).ok_or(TransformError::Invalid {
            expected: "hex color",
            found: token,
        })
    }
}

/// Dice notation: `NdM`, optionally followed by `+K` or `-K`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl Default for DiceSpec {
    fn default() -> Self {
        Self {
            count: 1,
            sides: 6,
            modifier: 0,
        }
    }
}

impl std::fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

pub const MAX_DICE: u32 = 100;
pub const MAX_SIDES: u32 = 1000;
pub const MAX_MODIFIER: i64 = 1_000_000;

static DICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(\d*)d(\d+)(?:([+-])(\d+))?$").unwrap());

pub struct Dice;

impl Transformer for Dice {
    type Output = DiceSpec;

    fn transform(&self, args: &mut Args) -> Result<DiceSpec, TransformError> {
        let token = args.require_token("dice")?;
        let invalid = || TransformError::Invalid {
            expected: "dice (e.g. 2d20+3)",
            found: token.clone(),
        };

        let caps = DICE_REGEX.captures(&token).ok_or_else(invalid)?;
        let count = match caps.get(1).map(|m| m.as_str()) {
            None | Some("") => 1,
            Some(count) => count.parse::<u32>().map_err(|_| invalid())?,
        };
        let sides = caps[2].parse::<u32>().map_err(|_| invalid())?;
        let modifier = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(value)) => {
                let value = match value.as_str().parse::<i64>() {
                    Ok(value) if value <= MAX_MODIFIER => value,
                    _ => {
                        return Err(TransformError::OutOfRange {
                            found: token.clone(),
                            min: format!("-{MAX_MODIFIER}"),
                            max: format!("+{MAX_MODIFIER}"),
                        })
                    }
                };
                if sign.as_str() == "-" {
                    -value
                } else {
                    value
                }
            }
            _ => 0,
        };

        if !(1..=MAX_DICE).contains(&count) || !(2..=MAX_SIDES).contains(&sides) {
            return Err(TransformError::OutOfRange {
                found: token.clone(),
                min: "1d2".to_owned(),
                max: format!("{MAX_DICE}d{MAX_SIDES}"),
            });
        }

        Ok(DiceSpec {
            count,
            sides,
            modifier,
        })
    }
}

/// Returns `None` if nothing is left or the inner transformer does not match.
pub struct Optional<T>(pub T);

impl<T: Transformer> Transformer for Optional<T> {
    type Output = Option<T::Output>;

    fn transform(&self, args: &mut Args) -> Result<Self::Output, TransformError> {
        if args.is_empty() {
            return Ok(None);
        }
        Ok(args.parse(&self.0).ok())
    }
}

/// Splits the remainder on `separator` and transforms every non-blank piece with `inner`.
pub struct Separated<T> {
    pub separator: char,
    pub inner: T,
}

impl<T: Transformer> Transformer for Separated<T> {
    type Output = Vec<T::Output>;

    fn transform(&self, args: &mut Args) -> Result<Self::Output, TransformError> {
        let rest = args.take_rest();
        let values = rest
            .split(self.separator)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                let mut piece_args = Args::new(piece);
                let value = piece_args.parse(&self.inner)?;
                piece_args.finish()?;
                Ok(value)
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        if values.is_empty() {
            return Err(TransformError::Missing {
                expected: "options",
            });
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse<T: Transformer>(input: &str, transformer: T) -> Result<T::Output, TransformError> {
        Args::new(input).parse(&transformer)
    }

    #[test]
    fn integer_respects_range() {
        assert_eq!(parse("42", Integer::range(i64::MIN, i64::MAX)), Ok(42));
        assert_eq!(parse("-7", Integer::range(-10, 10)), Ok(-7));
        assert_eq!(
            parse("11", Integer::range(0, 10)),
            Err(TransformError::OutOfRange {
                found: "11".to_owned(),
                min: "0".to_owned(),
                max: "10".to_owned(),
            })
        );
        assert!(matches!(
            parse("ten", Integer::range(i64::MIN, i64::MAX)),
            Err(TransformError::Invalid { .. })
        ));
        assert_eq!(
            parse("", Integer::range(i64::MIN, i64::MAX)),
            Err(TransformError::Missing { expected: "number" })
        );
    }

    #[test]
    fn choice_is_case_insensitive() {
        let choice = Choice(&["view", "draw"]);
        assert_eq!(parse("DRAW", choice), Ok("draw"));
        assert!(parse("erase", Choice(&["view", "draw"])).is_err());
    }

    #[test]
    fn mentions_and_raw_ids() {
        assert_eq!(parse("<@123>", UserMention), Ok(UserId::new(123)));
        assert_eq!(parse("<@!123>", UserMention), Ok(UserId::new(123)));
        assert_eq!(parse("123", UserMention), Ok(UserId::new(123)));
        assert!(parse("<@&123>", UserMention).is_err());
        assert!(parse("0", UserMention).is_err());
        assert!(parse("@someone", UserMention).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(
            parse_duration("1W2D"),
            Some(Duration::from_secs(9 * 24 * 60 * 60))
        );
        assert_eq!(parse_duration("15"), Some(Duration::from_secs(15 * 60)));
        assert_eq!(parse_duration("30m1h"), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn duration_arg_rejects_zero_and_caps() {
        assert!(parse("0m", DurationArg { max: None }).is_err());
        assert_eq!(
            parse("2h", DurationArg::max(Duration::from_secs(3600)))
                .unwrap_err()
                .to_string(),
            "`2h` must be between 1s and 1 hour"
        );
        assert_eq!(
            parse("45m", DurationArg::max(Duration::from_secs(3600))),
            Ok(Duration::from_secs(2700))
        );
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse("#ff8000", HexColor), Ok([255, 128, 0]));
        assert_eq!(parse("00FF00", HexColor), Ok([0, 255, 0]));
        assert_eq!(parse("#f0a", HexColor), Ok([255, 0, 170]));
        assert!(parse("#ff80", HexColor).is_err());
        assert!(parse("#gggggg", HexColor).is_err());
    }

    #[test]
    fn dice_notation() {
        assert_eq!(
            parse("2d20+3", Dice),
            Ok(DiceSpec {
                count: 2,
                sides: 20,
                modifier: 3
            })
        );
        assert_eq!(
            parse("d8-1", Dice),
            Ok(DiceSpec {
                count: 1,
                sides: 8,
                modifier: -1
            })
        );
        assert!(matches!(
            parse("101d6", Dice),
            Err(TransformError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse("1d1", Dice),
            Err(TransformError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse("roll", Dice),
            Err(TransformError::Invalid { .. })
        ));
        assert_eq!(DiceSpec::default().to_string(), "1d6");
        assert_eq!(
            DiceSpec {
                count: 3,
                sides: 4,
                modifier: -2
            }
            .to_string(),
            "3d4-2"
        );
    }

    #[test]
    fn dice_modifier_is_bounded() {
        assert_eq!(
            parse("d6-1000000", Dice),
            Ok(DiceSpec {
                count: 1,
                sides: 6,
                modifier: -MAX_MODIFIER
            })
        );
        assert!(matches!(
            parse("d6+1000001", Dice),
            Err(TransformError::OutOfRange { .. })
        ));
        // Too large for an i64 at all
        assert!(matches!(
            parse("d6+9223372036854775807", Dice),
            Err(TransformError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse("d6-99999999999999999999", Dice),
            Err(TransformError::OutOfRange { .. })
        ));
    }

    #[test]
    fn optional_leaves_unmatched_input() {
        let mut args = Args::new("hello <@5>");
        assert_eq!(args.parse(&Optional(UserMention)), Ok(None));
        assert_eq!(args.rest(), "hello <@5>");
        assert_eq!(args.parse(&Word).unwrap(), "hello");
        assert_eq!(args.parse(&Optional(UserMention)), Ok(Some(UserId::new(5))));
        assert_eq!(args.parse(&Optional(UserMention)), Ok(None));
    }

    #[test]
    fn rest_requires_text() {
        assert_eq!(parse("  spaced out  ", Rest), Ok("spaced out".to_owned()));
        assert_eq!(
            parse("   ", Rest),
            Err(TransformError::Missing { expected: "text" })
        );
    }

    #[test]
    fn separated_skips_blank_pieces() {
        let choices = Separated {
            separator: '|',
            inner: Rest,
        };
        assert_eq!(
            parse("pizza | tacos || sushi rolls ", choices),
            Ok(vec![
                "pizza".to_owned(),
                "tacos".to_owned(),
                "sushi rolls".to_owned()
            ])
        );

        let numbers = Separated {
            separator: ',',
            inner: Integer::range(i64::MIN, i64::MAX),
        };
        assert_eq!(parse("1, 2,3", numbers), Ok(vec![1, 2, 3]));
        assert!(parse(
            " | ",
            Separated {
                separator: '|',
                inner: Rest
            }
        )
        .is_err());
    }
}
