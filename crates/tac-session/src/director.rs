//! Session lifecycle: which game is active, how its board is seeded, and how
//! board changes reach the channel.

use std::sync::{Arc, Mutex};

use tac_core::{initial_fields, BoardController, ClickOutcome, Field, GameId};
use tac_realtime::{ConnectionState, EventBus, ReplicationChannel};
use tac_snapshot_store::SnapshotStore;
use tracing::{debug, info, warn};
use url::Url;

use crate::bridge::UpdateBridge;
use crate::error::{SessionError, SessionResult};

/// Query parameter carrying the game id in share links.
pub const SHARE_QUERY_PARAM: &str = "game";

/// Owns one client's active game and its board.
pub struct SessionDirector {
    store: SnapshotStore,
    bridge: UpdateBridge,
    board: Arc<Mutex<BoardController>>,
    active: Arc<Mutex<Option<GameId>>>,
    offline: bool,
}

impl SessionDirector {
    /// Creates a director with no active game and wires inbound updates into
    /// the board.
    pub fn new(store: SnapshotStore, channel: ReplicationChannel) -> Self {
        let board = Arc::new(Mutex::new(BoardController::default()));
        let active: Arc<Mutex<Option<GameId>>> = Arc::new(Mutex::new(None));
        let bridge = UpdateBridge::new(channel);

        let inbound_board = board.clone();
        let inbound_active = active.clone();
        bridge.attach(move |game_id, fields| {
            let is_active = inbound_active.lock().expect("lock poisoned").as_ref() == Some(game_id);
            if !is_active {
                debug!(game_id = %game_id, "Ignoring update for inactive game");
                return;
            }
            inbound_board
                .lock()
                .expect("lock poisoned")
                .apply_remote(fields.to_vec());
        });

        Self {
            store,
            bridge,
            board,
            active,
            offline: false,
        }
    }

    /// Forces every session into local-only mode.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn channel(&self) -> &ReplicationChannel {
        self.bridge.channel()
    }

    pub fn bridge(&self) -> &UpdateBridge {
        &self.bridge
    }

    pub fn events(&self) -> &EventBus {
        self.channel().events()
    }

    /// Starts a new game on the initial board and connects to it.
    ///
    /// A failed durable write is logged; the game is still cached locally
    /// and stays playable.
    pub async fn create_session(&self) -> SessionResult<GameId> {
        let game_id = GameId::generate();
        let fields = initial_fields();
        info!(game_id = %game_id, "Creating game session");

        if let Err(err) = self.store.put(&game_id, &fields).await {
            warn!(game_id = %game_id, error = %err, "Initial board not stored remotely");
        }
        self.bind(game_id.clone(), fields);
        Ok(game_id)
    }

    /// Joins the game named by `reference`, a bare id or a share link.
    ///
    /// The board is seeded from the last stored snapshot before the channel
    /// connects. Joining the active game again reconnects it.
    pub async fn join_session(&self, reference: &str) -> SessionResult<GameId> {
        let game_id = parse_game_reference(reference)?;
        self.leave_session();

        let fields = match self.store.get(&game_id).await {
            Some(fields) => fields,
            None => {
                info!(game_id = %game_id, "No stored board, starting from the initial layout");
                initial_fields()
            }
        };
        info!(game_id = %game_id, "Joining game session");
        self.bind(game_id.clone(), fields);
        Ok(game_id)
    }

    /// Disconnects from the active game, if any.
    pub fn leave_session(&self) {
        let previous = self.active.lock().expect("lock poisoned").take();
        if let Some(game_id) = previous {
            info!(game_id = %game_id, "Leaving game session");
        }
        self.channel().disconnect();
    }

    fn bind(&self, game_id: GameId, fields: Vec<Field>) {
        self.board.lock().expect("lock poisoned").reset(fields);
        *self.active.lock().expect("lock poisoned") = Some(game_id.clone());

        if self.offline {
            self.channel().connect_local_only(game_id);
        } else {
            self.channel().connect(game_id);
        }
    }

    /// Clicks field `index`. A completed move is persisted and shared.
    pub fn click(&self, index: usize) -> ClickOutcome {
        let outcome = self.board.lock().expect("lock poisoned").click(index);
        if let ClickOutcome::Moved(fields) = &outcome {
            self.share(fields.clone());
        }
        outcome
    }

    /// Reverts the last local move and shares the restored board.
    pub fn undo(&self) -> Option<Vec<Field>> {
        let restored = self.board.lock().expect("lock poisoned").undo();
        if let Some(fields) = &restored {
            self.share(fields.clone());
        }
        restored
    }

    fn share(&self, fields: Vec<Field>) {
        if self.active.lock().expect("lock poisoned").is_none() {
            debug!("No active game, keeping change local");
            return;
        }
        self.bridge.send_local(fields);
    }

    pub fn fields(&self) -> Vec<Field> {
        self.board.lock().expect("lock poisoned").fields().to_vec()
    }

    pub fn selected(&self) -> Option<usize> {
        self.board.lock().expect("lock poisoned").selected()
    }

    pub fn history_len(&self) -> usize {
        self.board.lock().expect("lock poisoned").history_len()
    }

    pub fn active_game(&self) -> Option<GameId> {
        self.active.lock().expect("lock poisoned").clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel().connection_state()
    }

    /// Share link for the active game.
    pub fn share_link(&self, base: &Url) -> SessionResult<Url> {
        let game_id = self.active_game().ok_or(SessionError::NoActiveGame)?;
        Ok(share_link(base, &game_id))
    }
}

impl Drop for SessionDirector {
    fn drop(&mut self) {
        self.bridge.detach();
        self.channel().disconnect();
    }
}

impl std::fmt::Debug for SessionDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDirector")
            .field("active", &self.active_game())
            .field("offline", &self.offline)
            .finish_non_exhaustive()
    }
}

/// `base` with `?game=<id>` set, replacing any existing query.
pub fn share_link(base: &Url, game_id: &GameId) -> Url {
    let mut link = base.clone();
    link.query_pairs_mut()
        .clear()
        .append_pair(SHARE_QUERY_PARAM, game_id.as_str());
    link
}

/// The game id carried by a share link, if it has a valid one.
pub fn game_id_from_link(link: &Url) -> Option<GameId> {
    link.query_pairs()
        .find(|(key, _)| key == SHARE_QUERY_PARAM)
        .and_then(|(_, value)| GameId::parse(&value).ok())
}

/// Accepts either a bare game id or a share link.
pub fn parse_game_reference(reference: &str) -> SessionResult<GameId> {
    let reference = reference.trim();
    match Url::parse(reference) {
        Ok(link) => {
            game_id_from_link(&link).ok_or_else(|| SessionError::InvalidLink(reference.to_string()))
        }
        Err(_) => Ok(GameId::parse(reference)?),
    }
}
