//! Echo suppression between the board and the replication channel.
//!
//! Inbound `GameUpdate` handlers run with an "applying remote" mark raised
//! for their bridge on the calling thread. Any local send made through that
//! bridge from inside the handler's call stack is dropped, so a state that
//! arrived from the network is never broadcast back to it. Sends from other
//! threads are unaffected.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tac_core::{Field, GameId};
use tac_realtime::{
    listener, ChannelEvent, ChannelEventKind, Listener, ReplicationChannel, SendDisposition,
};
use tracing::{debug, warn};

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Bridges whose inbound handler is running on this thread.
    static APPLYING_REMOTE: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Clears the mark when dropped, including during a panic unwind.
struct RemoteApply(u64);

impl RemoteApply {
    fn enter(bridge_id: u64) -> Self {
        APPLYING_REMOTE.with(|marks| marks.borrow_mut().push(bridge_id));
        Self(bridge_id)
    }
}

impl Drop for RemoteApply {
    fn drop(&mut self) {
        APPLYING_REMOTE.with(|marks| {
            let mut marks = marks.borrow_mut();
            if let Some(pos) = marks.iter().rposition(|id| *id == self.0) {
                marks.remove(pos);
            }
        });
    }
}

#[derive(Clone)]
pub struct UpdateBridge {
    id: u64,
    channel: ReplicationChannel,
    attached: Arc<Mutex<Option<Listener>>>,
}

impl UpdateBridge {
    pub fn new(channel: ReplicationChannel) -> Self {
        Self {
            id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
            channel,
            attached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn channel(&self) -> &ReplicationChannel {
        &self.channel
    }

    /// True while this bridge's inbound handler is running on the current
    /// thread.
    pub fn is_applying_remote(&self) -> bool {
        APPLYING_REMOTE.with(|marks| marks.borrow().contains(&self.id))
    }

    /// Routes inbound board updates to `handler`, replacing any handler
    /// attached earlier. Returns the listener registered on the channel.
    pub fn attach<F>(&self, handler: F) -> Listener
    where
        F: Fn(&GameId, &[Field]) + Send + Sync + 'static,
    {
        self.detach();

        let bridge_id = self.id;
        let registered = listener(move |event| {
            if let ChannelEvent::GameUpdate { game_id, fields } = event {
                let _remote = RemoteApply::enter(bridge_id);
                handler(game_id, fields);
            }
        });

        self.channel
            .events()
            .on(ChannelEventKind::GameUpdate, registered.clone());
        *self.attached.lock().expect("lock poisoned") = Some(registered.clone());
        registered
    }

    /// Unregisters the attached handler. Returns false if none was attached.
    pub fn detach(&self) -> bool {
        let previous = self.attached.lock().expect("lock poisoned").take();
        match previous {
            Some(registered) => self
                .channel
                .events()
                .off(ChannelEventKind::GameUpdate, &registered),
            None => false,
        }
    }

    /// Hands a locally produced board to the channel, unless a remote update
    /// is being applied.
    pub fn send_local(&self, fields: Vec<Field>) -> SendDisposition {
        if self.is_applying_remote() {
            warn!("Suppressing outbound update while applying a remote update");
            return SendDisposition::Dropped;
        }
        let disposition = self.channel.send_update(fields);
        debug!(?disposition, "Local update sent");
        disposition
    }
}

impl std::fmt::Debug for UpdateBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateBridge")
            .field("id", &self.id)
            .field("applying_remote", &self.is_applying_remote())
            .finish_non_exhaustive()
    }
}
