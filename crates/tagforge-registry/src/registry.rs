//! Session registry: creates, tracks, and routes operations to sessions.
//!
//! Store reads and writes happen outside the registry lock, so a slow
//! store only delays the session it is working on. An evicted session
//! stays unroutable until its actor has exited, which keeps at most one
//! actor per session id committing at any time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tagforge_protocol::{
    OwnerId, PlayerId, PlayerSnapshot, Point, SessionId, SessionSnapshot, SessionSummary,
    SessionUpdate,
};
use tagforge_session::{Clock, GameRules, MoveOutcome, Session, SessionError};
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::actor::{ActorContext, spawn_session};
use crate::{RegistryConfig, RegistryError, SessionHandle, SessionStore};

/// Routing table, guarded by one lock.
#[derive(Default)]
struct Live {
    /// Sessions with a running actor.
    sessions: HashMap<SessionId, SessionHandle>,
    /// Evicted sessions whose actor may still be finishing queued work.
    retiring: HashMap<SessionId, SessionHandle>,
    /// Ids picked by `create` whose first commit has not landed yet.
    reserved: HashSet<SessionId>,
    /// Bumped on every eviction. A load that spans one is stale.
    evictions: u64,
}

impl Live {
    /// Claims `id` for a new session. Returns `false` if it is in use.
    fn reserve(&mut self, id: SessionId) -> bool {
        !self.sessions.contains_key(&id)
            && !self.retiring.contains_key(&id)
            && self.reserved.insert(id)
    }

    fn forget_retired(&mut self, id: SessionId) {
        if self.retiring.get(&id).is_some_and(SessionHandle::is_stopped) {
            self.retiring.remove(&id);
        }
    }
}

/// Tracks every live session and the store behind them.
///
/// This is the entry point for session operations from higher layers.
/// A session is *live* while its actor is running. Sessions that exist
/// only in the store are brought back to life on first use, so callers
/// never need to know which sessions are currently in memory.
pub struct SessionRegistry<S: SessionStore, C: Clock> {
    live: RwLock<Live>,
    ctx: ActorContext<S, C>,
    config: RegistryConfig,
    /// Source of session ids, creator player ids, and actor seeds.
    rng: Mutex<StdRng>,
}

impl<S: SessionStore, C: Clock> SessionRegistry<S, C> {
    /// Creates an empty registry over `store`.
    pub fn new(store: S, clock: C, rules: GameRules, config: RegistryConfig) -> Self {
        let config = config.validated();
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            live: RwLock::new(Live::default()),
            ctx: ActorContext {
                store: Arc::new(store),
                clock: Arc::new(clock),
                rules: Arc::new(rules.validated()),
            },
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &S {
        &self.ctx.store
    }

    pub fn clock(&self) -> &C {
        &self.ctx.clock
    }

    pub fn rules(&self) -> &GameRules {
        &self.ctx.rules
    }

    /// Creates a session with `creator` as the runner and returns the new
    /// session id and the creator's player id.
    ///
    /// The session is committed to the store before it becomes reachable.
    pub async fn create(
        &self,
        radius: f64,
        creator: OwnerId,
    ) -> Result<(SessionId, PlayerId), RegistryError> {
        let (session_id, player_id, seed) = self.reserve_id().await?;
        let now = self.ctx.clock.now_ms();
        let created = self
            .commit_new(session_id, player_id, radius, creator, now)
            .await;

        let mut live = self.live.write().await;
        live.reserved.remove(&session_id);
        let session = created?;
        live.sessions.insert(session_id, self.spawn(session, seed));
        drop(live);

        tracing::info!(%session_id, %player_id, radius, "session created");
        Ok((session_id, player_id))
    }

    /// Returns a handle to a session, loading it from the store if it is
    /// not live.
    ///
    /// # Errors
    /// [`SessionError::SessionNotFound`] if the store has never seen `id`.
    pub async fn handle(&self, id: SessionId) -> Result<SessionHandle, RegistryError> {
        loop {
            let (retiring, evictions) = {
                let live = self.live.read().await;
                if let Some(handle) = live.sessions.get(&id) {
                    return Ok(handle.clone());
                }
                (live.retiring.get(&id).cloned(), live.evictions)
            };

            if let Some(old) = retiring {
                // Its last commits must land before the store copy is read.
                let _ = old.shutdown().await;
                old.stopped().await;
                self.live.write().await.forget_retired(id);
                continue;
            }

            let (record, players) = self
                .ctx
                .store
                .load(id)
                .await?
                .ok_or(SessionError::SessionNotFound(id))?;
            let session = Session::from_parts(record, players)?;
            let seed = self.rng.lock().await.random();

            let mut live = self.live.write().await;
            // Someone else may have loaded it while we read the store.
            if let Some(handle) = live.sessions.get(&id) {
                return Ok(handle.clone());
            }
            if live.evictions != evictions || live.retiring.contains_key(&id) {
                continue;
            }
            if live.reserved.contains(&id) {
                return Err(SessionError::SessionNotFound(id).into());
            }
            let handle = self.spawn(session, seed);
            live.sessions.insert(id, handle.clone());
            drop(live);

            tracing::info!(session_id = %id, "session loaded from store");
            return Ok(handle);
        }
    }

    pub async fn join(
        &self,
        id: SessionId,
        joiner: OwnerId,
    ) -> Result<PlayerSnapshot, RegistryError> {
        self.handle(id).await?.join(joiner).await
    }

    pub async fn move_player(
        &self,
        id: SessionId,
        actor: OwnerId,
        to: Point,
    ) -> Result<MoveOutcome, RegistryError> {
        self.handle(id).await?.move_player(actor, to).await
    }

    pub async fn restart(&self, id: SessionId) -> Result<(), RegistryError> {
        self.handle(id).await?.restart().await
    }

    pub async fn set_active(
        &self,
        id: SessionId,
        owner: OwnerId,
        active: bool,
    ) -> Result<PlayerId, RegistryError> {
        self.handle(id).await?.set_active(owner, active).await
    }

    pub async fn snapshot(&self, id: SessionId) -> Result<SessionSnapshot, RegistryError> {
        self.handle(id).await?.snapshot().await
    }

    /// Receives every update committed to `id` after this call.
    pub async fn subscribe(
        &self,
        id: SessionId,
    ) -> Result<broadcast::Receiver<SessionUpdate>, RegistryError> {
        Ok(self.handle(id).await?.subscribe())
    }

    /// Stops a session's actor. Its records stay in the store and the
    /// next operation on it loads them again.
    ///
    /// Returns once the actor has finished every command queued before
    /// the eviction. Returns `false` if the session was not live.
    pub async fn evict(&self, id: SessionId) -> bool {
        let handle = {
            let mut live = self.live.write().await;
            let Some(handle) = live.sessions.remove(&id) else {
                return false;
            };
            live.retiring.insert(id, handle.clone());
            live.evictions += 1;
            handle
        };

        let _ = handle.shutdown().await;
        handle.stopped().await;
        self.live.write().await.forget_retired(id);
        tracing::info!(session_id = %id, "session evicted");
        true
    }

    /// Up to `limit` sessions, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<SessionSummary>, RegistryError> {
        let records = self.ctx.store.recent(limit).await?;
        Ok(records.iter().map(|r| r.summary()).collect())
    }

    /// Every session `owner` has played in.
    pub async fn sessions_for(&self, owner: &OwnerId) -> Result<Vec<SessionId>, RegistryError> {
        Ok(self.ctx.store.sessions_by_owner(owner).await?)
    }

    /// Number of live sessions.
    pub async fn live_count(&self) -> usize {
        self.live.read().await.sessions.len()
    }

    /// Picks ids for a new session and claims the session id, skipping
    /// any that are live, being created, or already in the store.
    async fn reserve_id(&self) -> Result<(SessionId, PlayerId, u64), RegistryError> {
        loop {
            let (sid, pid, seed) = {
                let mut rng = self.rng.lock().await;
                (SessionId(rng.random()), PlayerId(rng.random()), rng.random())
            };
            if !self.live.write().await.reserve(sid) {
                continue;
            }
            match self.ctx.store.load(sid).await {
                Ok(None) => return Ok((sid, pid, seed)),
                Ok(Some(_)) => {
                    self.live.write().await.reserved.remove(&sid);
                }
                Err(e) => {
                    self.live.write().await.reserved.remove(&sid);
                    return Err(e.into());
                }
            }
        }
    }

    async fn commit_new(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        radius: f64,
        creator: OwnerId,
        now: u64,
    ) -> Result<Session, RegistryError> {
        let session = Session::create(session_id, player_id, radius, creator, now)?;
        self.ctx
            .store
            .commit(session.record(), session.players())
            .await?;
        Ok(session)
    }

    fn spawn(&self, session: Session, seed: u64) -> SessionHandle {
        spawn_session(
            session,
            self.ctx.clone(),
            seed,
            self.config.channel_size,
            self.config.update_buffer,
        )
    }
}
