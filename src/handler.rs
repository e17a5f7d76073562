use crate::{
    config::Config, context::Context, event::Event, framework::Dispatcher,
    persistent_state::PersistentState, timer::Scheduler, volatile_state::VolatileState,
};
use serenity::all::{Member, Message, Ready};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discord event handler
pub struct Handler {
    cfg: Arc<RwLock<Config>>,
    pstate: Arc<RwLock<PersistentState>>,
    vstate: Arc<RwLock<VolatileState>>,
    scheduler: Arc<Scheduler>,
    dispatcher: Arc<Dispatcher>,
    web: reqwest::Client,
}

impl Handler {
    pub fn new(
        cfg: Arc<RwLock<Config>>,
        pstate: Arc<RwLock<PersistentState>>,
        vstate: Arc<RwLock<VolatileState>>,
        scheduler: Arc<Scheduler>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            cfg,
            pstate,
            vstate,
            scheduler,
            dispatcher,
            web: reqwest::Client::new(),
        }
    }

    fn ctx(&self, discord_ctx: serenity::all::Context) -> Context {
        Context {
            cfg: Arc::clone(&self.cfg),
            pstate: Arc::clone(&self.pstate),
            vstate: Arc::clone(&self.vstate),
            scheduler: Arc::clone(&self.scheduler),
            dispatcher: Arc::clone(&self.dispatcher),
            web: self.web.clone(),
            cache: Arc::clone(&discord_ctx.cache),
            http: Arc::clone(&discord_ctx.http),
            cache_http: discord_ctx,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(discord_ctx)).await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        Event::Message(msg).handle(self.ctx(discord_ctx)).await;
    }

    async fn guild_member_addition(&self, discord_ctx: serenity::all::Context, new_member: Member) {
        Event::MemberJoin(new_member)
            .handle(self.ctx(discord_ctx))
            .await;
    }
}
