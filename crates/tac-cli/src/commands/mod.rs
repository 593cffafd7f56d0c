//! CLI command implementations.

mod play;
mod session;

pub use session::{create, join, link, show};

use std::sync::Arc;

use anyhow::Result;
use tac_config::{Config, Paths};
use tac_realtime::{
    ChannelConfig, RealtimeTransport, ReplicationChannel, SupabaseRealtimeTransport,
};
use tac_session::SessionDirector;
use tac_snapshot_store::{LocalCache, SnapshotStore, SupabaseStore};
use tracing::info;

use crate::output::OutputFormat;

/// Everything a command needs from the command line and config file.
pub struct Context {
    pub config: Config,
    pub paths: Paths,
    pub format: OutputFormat,
    pub offline: bool,
}

struct Backends {
    store: SnapshotStore,
    transport: Option<Arc<dyn RealtimeTransport>>,
}

/// Opens the local cache and, unless offline or unconfigured, the Supabase
/// store and realtime transport.
fn open_backends(ctx: &Context) -> Result<Backends> {
    let cache = Arc::new(LocalCache::open(ctx.paths.cache_database_file())?);

    let supabase = if ctx.offline {
        None
    } else {
        ctx.config.supabase()?
    };

    let Some((url, key)) = supabase else {
        info!(offline = ctx.offline, "Supabase not configured, using local cache only");
        return Ok(Backends {
            store: SnapshotStore::with_local_only(cache),
            transport: None,
        });
    };

    let realtime = &ctx.config.realtime;
    let transport = SupabaseRealtimeTransport::new(&url, key.clone())?
        .with_timeouts(realtime.join_timeout(), realtime.heartbeat_interval());
    info!(url = %url, "Using Supabase for storage and realtime sync");

    Ok(Backends {
        store: SnapshotStore::new(Arc::new(SupabaseStore::new(url.as_str(), key)), cache),
        transport: Some(Arc::new(transport)),
    })
}

fn open_director(ctx: &Context) -> Result<SessionDirector> {
    let Backends { store, transport } = open_backends(ctx)?;
    let channel_config = ChannelConfig {
        max_reconnect_attempts: ctx.config.realtime.max_reconnect_attempts,
        reconnect_base_delay: ctx.config.realtime.reconnect_base_delay(),
    };
    let channel = ReplicationChannel::new(channel_config, transport, store.clone());
    Ok(SessionDirector::new(store, channel).with_offline(ctx.offline))
}
