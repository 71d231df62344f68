//! Persistence for sessions and players.
//!
//! The registry writes through a [`SessionStore`] on every mutation and
//! reads from it when a session is not live in memory. Each commit carries
//! the full session row plus all of its player rows, so a store only ever
//! sees consistent states.
//!
//! [`MemoryStore`] keeps everything in process and is what tests and the
//! demo use. A database-backed store implements the same trait.

use std::collections::HashMap;
use std::future::Future;

use tagforge_protocol::{OwnerId, PlayerId, SessionId};
use tagforge_session::{Player, SessionRecord};
use tokio::sync::RwLock;

use crate::StoreError;

/// Durable storage for session and player records.
///
/// # Atomicity
///
/// `commit` must apply the session row and every player row together or
/// not at all. The registry only swaps in a new in-memory state after
/// `commit` returns `Ok`, so a half-applied write would leave memory and
/// storage disagreeing.
pub trait SessionStore: Send + Sync + 'static {
    /// Inserts or replaces a session and all of its players.
    fn commit(
        &self,
        record: &SessionRecord,
        players: &[Player],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Loads a session and its players, or `None` if it was never committed.
    fn load(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<Option<(SessionRecord, Vec<Player>)>, StoreError>> + Send;

    /// All players of a session, in join order.
    fn players_by_session(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<Vec<Player>, StoreError>> + Send;

    /// The player `owner` holds in `session`, if any.
    fn player_by_owner(
        &self,
        session: SessionId,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<Option<Player>, StoreError>> + Send;

    /// Up to `limit` sessions, newest `created_at` first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, StoreError>> + Send;

    /// Every session `owner` has a player in, oldest first.
    fn sessions_by_owner(
        &self,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<Vec<SessionId>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, SessionRecord>,
    players: HashMap<PlayerId, Player>,
    /// Player ids per session, in join order.
    by_session: HashMap<SessionId, Vec<PlayerId>>,
    /// Session ids per owner, in the order the owner first appeared.
    by_owner: HashMap<OwnerId, Vec<SessionId>>,
}

/// An in-process [`SessionStore`].
///
/// One write lock covers a whole commit, which makes commits atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.sessions.is_empty()
    }
}

impl SessionStore for MemoryStore {
    async fn commit(
        &self,
        record: &SessionRecord,
        players: &[Player],
    ) -> Result<(), StoreError> {
        if let Some(stray) = players.iter().find(|p| p.session_id != record.id) {
            return Err(StoreError::Rejected(format!(
                "player {} belongs to session {}, not {}",
                stray.id, stray.session_id, record.id
            )));
        }

        let mut tables = self.tables.write().await;
        let Tables {
            sessions,
            players: player_rows,
            by_session,
            by_owner,
        } = &mut *tables;

        sessions.insert(record.id, record.clone());
        let ids = by_session.entry(record.id).or_default();
        for player in players {
            if !ids.contains(&player.id) {
                ids.push(player.id);
            }
            let owned = by_owner.entry(player.owner_id.clone()).or_default();
            if !owned.contains(&record.id) {
                owned.push(record.id);
            }
            player_rows.insert(player.id, player.clone());
        }
        Ok(())
    }

    async fn load(
        &self,
        id: SessionId,
    ) -> Result<Option<(SessionRecord, Vec<Player>)>, StoreError> {
        let tables = self.tables.read().await;
        let Some(record) = tables.sessions.get(&id) else {
            return Ok(None);
        };
        Ok(Some((record.clone(), tables.session_players(id))))
    }

    async fn players_by_session(&self, id: SessionId) -> Result<Vec<Player>, StoreError> {
        Ok(self.tables.read().await.session_players(id))
    }

    async fn player_by_owner(
        &self,
        session: SessionId,
        owner: &OwnerId,
    ) -> Result<Option<Player>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .session_players(session)
            .into_iter()
            .find(|p| &p.owner_id == owner))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut records: Vec<SessionRecord> = tables.sessions.values().cloned().collect();
        // Ties on created_at are broken by id so the order is stable.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn sessions_by_owner(&self, owner: &OwnerId) -> Result<Vec<SessionId>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .by_owner
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }
}

impl Tables {
    fn session_players(&self, id: SessionId) -> Vec<Player> {
        self.by_session
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|pid| self.players.get(pid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
