use crate::{
    context::Context,
    framework::{
        transformer::{HexColor, Integer},
        Args, Command, Group, UserError,
    },
    helper::{ceil_secs, format_duration},
    place::Canvas,
    timer::TimerKind,
    volatile_state::VolatileState,
};
use anyhow::Result;
use chrono::Utc;
use serenity::all::{CreateAttachment, CreateMessage, Message};
use std::{path::PathBuf, time::Duration};

const CANVAS_FILE: &str = "place.png";

/// Snapshot of the `[place]` configuration
struct Settings {
    width: u32,
    height: u32,
    scale: u32,
    cooldown: Duration,
    path: PathBuf,
}

impl Settings {
    async fn read(ctx: &Context) -> Self {
        let (width, height, scale, cooldown, path) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.place.width,
                cfg.place.height,
                cfg.place.scale,
                Duration::from_secs(cfg.place.cooldown_seconds),
                cfg.place.canvas_path.clone(),
            )
        };
        let path = match path {
            Some(path) => path,
            None => ctx.pstate.read().await.path().with_file_name(CANVAS_FILE),
        };

        Self {
            width,
            height,
            scale,
            cooldown,
            path,
        }
    }
}

/// The canvas, read from disk the first time it is needed.
async fn loaded<'a>(vstate: &'a mut VolatileState, settings: &Settings) -> Result<&'a mut Canvas> {
    if vstate.canvas.is_none() {
        let canvas = Canvas::load_or_blank(&settings.path, settings.width, settings.height).await?;
        vstate.canvas = Some(canvas);
    }
    Ok(vstate
        .canvas
        .get_or_insert_with(|| Canvas::blank(settings.width, settings.height)))
}

pub struct Place;

#[serenity::async_trait]
impl Command for Place {
    fn name(&self) -> &'static str {
        "place"
    }

    fn group(&self) -> Group {
        Group::Services
    }

    fn usage(&self) -> &'static str {
        "[<x> <y> <color>]"
    }

    fn description(&self) -> &'static str {
        "show the shared canvas, or paint one pixel of it, e.g. `3 7 #ff8800`"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let settings = Settings::read(ctx).await;

        if args.is_empty() {
            let png = {
                let mut vstate = ctx.vstate.write().await;
                loaded(&mut vstate, &settings).await?.render(settings.scale)?
            };
            return send_canvas(ctx, msg, png, String::new()).await;
        }

        let x = args.parse(&Integer::range(0, i64::from(settings.width) - 1))?;
        let y = args.parse(&Integer::range(0, i64::from(settings.height) - 1))?;
        let color = args.parse(&HexColor)?;
        args.finish()?;
        let (x, y) = (u32::try_from(x)?, u32::try_from(y)?);

        let author = msg.author.id;
        // The canvas lock is held from the cooldown check until the new cooldown is stored
        let png = {
            let mut vstate = ctx.vstate.write().await;

            if let Some(timer) = ctx
                .scheduler
                .find(|timer| timer.kind.is_place_cooldown_of(author))
                .await
            {
                return Err(UserError::new(format!(
                    "You can paint again in {}.",
                    format_duration(ceil_secs(timer.remaining()))
                ))
                .into());
            }

            let canvas = loaded(&mut vstate, &settings).await?;
            if canvas.get(x, y) == Some(color) {
                return Err(UserError::new("That pixel already has that color.").into());
            }
            if !canvas.set(x, y, color) {
                return Err(UserError::new("That pixel is outside the canvas.").into());
            }
            canvas.save(&settings.path).await?;
            let png = canvas.render(settings.scale)?;

            if !settings.cooldown.is_zero() {
                let expires_at = Utc::now() + chrono::Duration::from_std(settings.cooldown)?;
                ctx.scheduler
                    .schedule(TimerKind::PlaceCooldown { user_id: author }, expires_at)
                    .await?;
            }
            png
        };

        tracing::info!(user = %msg.author.name, x, y, color = ?color, "Painted pixel");
        let note = if settings.cooldown.is_zero() {
            String::new()
        } else {
            format!(
                "You can paint again in {}.",
                format_duration(settings.cooldown)
            )
        };
        send_canvas(ctx, msg, png, note).await
    }
}

async fn send_canvas(ctx: &Context, msg: &Message, png: Vec<u8>, content: String) -> Result<()> {
    msg.channel_id
        .send_message(
            &ctx.cache_http,
            CreateMessage::new()
                .content(content)
                .add_file(CreateAttachment::bytes(png, CANVAS_FILE))
                .reference_message(msg),
        )
        .await?;
    Ok(())
}
