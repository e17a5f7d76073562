use crate::{
    config::Config, framework::Dispatcher, persistent_state::PersistentState, timer::Scheduler,
    volatile_state::VolatileState,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Collection of data that is shared across events.
///
/// Cheap to clone so that commands can carry it onto their own task.
#[derive(Clone)]
pub struct Context {
    // Bot's own context types
    pub cfg: Arc<RwLock<Config>>,
    pub pstate: Arc<RwLock<PersistentState>>,
    pub vstate: Arc<RwLock<VolatileState>>,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<Dispatcher>,
    /// Client for third party web APIs
    pub web: reqwest::Client,
    // Discord/Serenity context types
    pub cache: Arc<serenity::all::Cache>,
    pub http: Arc<serenity::all::Http>,
    pub cache_http: CacheHttp,
}

/// Many Serenity functions take a `impl CacheHttp` in order to first check the cache if the item
/// is available and fall back to an http request otherwise.  The most readily available type that
/// impl's this is named very differently in a way that could be confusing, and so we alias it.
pub type CacheHttp = serenity::all::Context;

/// Lets the owner `shutdown` command stop every shard.  Inserted into the client's data map on
/// start-up.
pub struct ShardManagerContainer;

impl serenity::prelude::TypeMapKey for ShardManagerContainer {
    type Value = Arc<serenity::gateway::ShardManager>;
}
