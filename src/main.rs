mod commands;
mod config;
mod context;
mod event;
mod framework;
mod handler;
mod helper;
mod logging;
mod persistent_state;
mod place;
mod plugin;
mod timer;
mod volatile_state;

use serenity::{
    all::{GatewayIntents, Http},
    Client,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let pstate = crate::persistent_state::PersistentState::load().await?;
    tracing::info!(
        path = %pstate.path().display(),
        timers = pstate.timers.len(),
        "Loaded persistent state"
    );
    let vstate = crate::volatile_state::VolatileState::new();

    let cfg = Arc::new(RwLock::new(cfg));
    let pstate = Arc::new(RwLock::new(pstate));
    let vstate = Arc::new(RwLock::new(vstate));

    let dispatcher = Arc::new(crate::framework::Dispatcher::new(commands::all())?);

    // Timers may fire before the gateway is connected, so they get their own REST client.
    let sink = crate::timer::DiscordTimerSink::new(Arc::new(Http::new(&token)));
    let scheduler = crate::timer::Scheduler::new(Arc::clone(&pstate), Arc::new(sink));

    let handler = handler::Handler::new(cfg, pstate, vstate, scheduler, dispatcher);

    // Things we want discord to tell us about.
    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await?;
    client
        .data
        .write()
        .await
        .insert::<crate::context::ShardManagerContainer>(Arc::clone(&client.shard_manager));

    client.start().await.map_err(Into::into)
}
