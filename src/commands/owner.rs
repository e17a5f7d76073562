use crate::{
    context::{Context, ShardManagerContainer},
    framework::{transformer::Rest, Args, Command, Group, Requirements},
    log_internal,
    logging::PrintColor,
};
use anyhow::{anyhow, Result};
use serenity::all::{ActivityData, Message};

pub struct Reload;

#[serenity::async_trait]
impl Command for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    fn group(&self) -> Group {
        Group::Owner
    }

    fn description(&self) -> &'static str {
        "re-read the configuration file"
    }

    fn requirements(&self) -> Requirements {
        Requirements::owner()
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        // A broken file leaves the running configuration untouched
        let result = ctx.cfg.write().await.reload().await;
        match result {
            Ok(()) => {
                log_internal!("Configuration reloaded by {}", msg.author.color());
                msg.reply(&ctx.cache_http, "Reloaded configuration.").await?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Configuration reload failed");
                msg.reply(&ctx.cache_http, format!("Reload failed: {err}"))
                    .await?;
            }
        }
        Ok(())
    }
}

pub struct Shutdown;

#[serenity::async_trait]
impl Command for Shutdown {
    fn name(&self) -> &'static str {
        "shutdown"
    }

    fn group(&self) -> Group {
        Group::Owner
    }

    fn description(&self) -> &'static str {
        "disconnect and exit"
    }

    fn requirements(&self) -> Requirements {
        Requirements::owner()
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        let manager = ctx
            .cache_http
            .data
            .read()
            .await
            .get::<ShardManagerContainer>()
            .cloned()
            .ok_or_else(|| anyhow!("Shard manager is not registered"))?;

        msg.reply(&ctx.cache_http, "Shutting down.").await?;
        log_internal!("Shutdown requested by {}", msg.author.color());
        ctx.pstate.read().await.save().await?;
        manager.shutdown_all().await;
        Ok(())
    }
}

pub struct SetStatus;

#[serenity::async_trait]
impl Command for SetStatus {
    fn name(&self) -> &'static str {
        "setstatus"
    }

    fn group(&self) -> Group {
        Group::Owner
    }

    fn usage(&self) -> &'static str {
        "<text>"
    }

    fn description(&self) -> &'static str {
        "change the \"Playing ...\" status"
    }

    fn requirements(&self) -> Requirements {
        Requirements::owner()
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let status = args.parse(&Rest)?;

        ctx.cache_http
            .set_activity(Some(ActivityData::playing(status.clone())));
        log_internal!("Status set to \"{}\"", status);
        msg.reply(&ctx.cache_http, "Status updated.").await?;
        Ok(())
    }
}
