use crate::{
    context::Context,
    framework::{
        transformer::{Dice, DiceSpec, Rest, Separated},
        Args, Command, Group, UserError,
    },
    helper::MessageHelper,
};
use anyhow::Result;
use rand::{seq::SliceRandom, Rng};
use serenity::all::Message;

/// How many individual dice are listed before the output is abbreviated
const LISTED_ROLLS: usize = 20;

pub struct Roll;

pub struct DiceRoll {
    pub rolls: Vec<u32>,
    pub total: i64,
}

pub fn roll_dice<R: Rng>(spec: &DiceSpec, rng: &mut R) -> DiceRoll {
    let rolls: Vec<u32> = (0..spec.count)
        .map(|_| rng.gen_range(1..=spec.sides))
        .collect();
    let total = rolls
        .iter()
        .fold(spec.modifier, |total, &r| total.saturating_add(i64::from(r)));
    DiceRoll { rolls, total }
}

fn describe_roll(spec: &DiceSpec, roll: &DiceRoll) -> String {
    let mut listed: Vec<String> = roll
        .rolls
        .iter()
        .take(LISTED_ROLLS)
        .map(u32::to_string)
        .collect();
    if roll.rolls.len() > LISTED_ROLLS {
        listed.push("...".to_owned());
    }

    let modifier = match spec.modifier {
        0 => String::new(),
        m if m > 0 => format!(" + {m}"),
        m => format!(" - {}", -m),
    };
    format!(
        "\u{1F3B2} {}: [{}]{} = **{}**",
        spec,
        listed.join(", "),
        modifier,
        roll.total
    )
}

#[serenity::async_trait]
impl Command for Roll {
    fn name(&self) -> &'static str {
        "roll"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["dice"]
    }

    fn group(&self) -> Group {
        Group::Fun
    }

    fn usage(&self) -> &'static str {
        "[dice]"
    }

    fn description(&self) -> &'static str {
        "roll dice, e.g. `2d20+3` (default 1d6)"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let spec = if args.is_empty() {
            DiceSpec::default()
        } else {
            args.parse(&Dice)?
        };
        args.finish()?;

        let roll = roll_dice(&spec, &mut rand::thread_rng());
        msg.reply(&ctx.cache_http, describe_roll(&spec, &roll))
            .await?;
        Ok(())
    }
}

const EIGHT_BALL_ANSWERS: &[&str] = &[
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes, definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

pub struct EightBall;

#[serenity::async_trait]
impl Command for EightBall {
    fn name(&self) -> &'static str {
        "8ball"
    }

    fn group(&self) -> Group {
        Group::Fun
    }

    fn usage(&self) -> &'static str {
        "<question>"
    }

    fn description(&self) -> &'static str {
        "ask the magic 8-ball"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        args.parse(&Rest)?;

        let answer = EIGHT_BALL_ANSWERS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Ask again later.");
        msg.reply(&ctx.cache_http, format!("\u{1F3B1} {answer}"))
            .await?;
        Ok(())
    }
}

pub struct Choose;

#[serenity::async_trait]
impl Command for Choose {
    fn name(&self) -> &'static str {
        "choose"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["pick"]
    }

    fn group(&self) -> Group {
        Group::Fun
    }

    fn usage(&self) -> &'static str {
        "<option> | <option> | ..."
    }

    fn description(&self) -> &'static str {
        "pick one of several options"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let options = args.parse(&Separated {
            separator: '|',
            inner: Rest,
        })?;
        if options.len() < 2 {
            return Err(UserError::new("Give me at least two options separated by `|`.").into());
        }

        let choice = options
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();
        msg.reply_quietly(ctx, format!("I choose **{choice}**"))
            .await?;
        Ok(())
    }
}

pub struct CoinFlip;

#[serenity::async_trait]
impl Command for CoinFlip {
    fn name(&self) -> &'static str {
        "coinflip"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["flip"]
    }

    fn group(&self) -> Group {
        Group::Fun
    }

    fn description(&self) -> &'static str {
        "flip a coin"
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        let side = if rand::thread_rng().gen_bool(0.5) {
            "Heads"
        } else {
            "Tails"
        };
        msg.reply(&ctx.cache_http, side).await?;
        Ok(())
    }
}
