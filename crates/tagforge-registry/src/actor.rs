//! Session actor: an isolated Tokio task that owns one live session.
//!
//! Each live session runs in its own task and is reached only through an
//! mpsc channel. The task handles one command at a time, so every
//! operation on a session sees the result of the one before it. Two
//! joins racing for the last seat are simply queued, and the second one
//! finds the seat taken.
//!
//! A mutation is applied to a copy of the session, written to the store,
//! and only then swapped in and announced to subscribers. If the store
//! write fails, the copy is dropped and nothing observable changes.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tagforge_protocol::{
    OwnerId, PlayerId, PlayerSnapshot, Point, SessionId, SessionSnapshot, SessionUpdate,
    UpdateCause,
};
use tagforge_session::{Clock, GameRules, MoveOutcome, Session};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{RegistryError, SessionStore};

/// Commands sent to a session actor through its channel.
///
/// Every variant except `Shutdown` carries a reply channel: the caller
/// sends the command and waits for the answer on it.
pub(crate) enum SessionCommand {
    Join {
        joiner: OwnerId,
        reply: oneshot::Sender<Result<PlayerSnapshot, RegistryError>>,
    },
    Move {
        actor: OwnerId,
        to: Point,
        reply: oneshot::Sender<Result<MoveOutcome, RegistryError>>,
    },
    Restart {
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    SetActive {
        owner: OwnerId,
        active: bool,
        reply: oneshot::Sender<Result<PlayerId, RegistryError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown,
}

/// Handle to a running session actor. Used to send commands to it.
///
/// Cheap to clone: an mpsc sender plus a broadcast sender. The registry
/// holds one per live session and hands out clones.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Seats `joiner` as the chaser and starts the game.
    pub async fn join(&self, joiner: OwnerId) -> Result<PlayerSnapshot, RegistryError> {
        self.request(|reply| SessionCommand::Join { joiner, reply })
            .await?
    }

    /// Moves the player owned by `actor` toward `to`.
    pub async fn move_player(
        &self,
        actor: OwnerId,
        to: Point,
    ) -> Result<MoveOutcome, RegistryError> {
        self.request(|reply| SessionCommand::Move { actor, to, reply })
            .await?
    }

    /// Resets a finished game.
    pub async fn restart(&self) -> Result<(), RegistryError> {
        self.request(|reply| SessionCommand::Restart { reply }).await?
    }

    /// Flags the player owned by `owner` as connected or not.
    pub async fn set_active(
        &self,
        owner: OwnerId,
        active: bool,
    ) -> Result<PlayerId, RegistryError> {
        self.request(|reply| SessionCommand::SetActive {
            owner,
            active,
            reply,
        })
        .await?
    }

    /// A consistent view of the session and all of its players.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, RegistryError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Receives every update committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Tells the actor to stop. Commands queued ahead of this one still
    /// run; commands sent after it get [`RegistryError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| RegistryError::Unavailable(self.session_id))
    }

    /// Waits until the actor has exited and dropped its command queue.
    ///
    /// Commands queued ahead of `Shutdown` are finished first, so once
    /// this returns nothing more will be committed for the session.
    pub(crate) async fn stopped(&self) {
        self.sender.closed().await;
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RegistryError::Unavailable(self.session_id))?;
        reply_rx
            .await
            .map_err(|_| RegistryError::Unavailable(self.session_id))
    }
}

/// Shared collaborators every session actor needs.
pub(crate) struct ActorContext<S, C> {
    pub store: Arc<S>,
    pub clock: Arc<C>,
    pub rules: Arc<GameRules>,
}

impl<S, C> Clone for ActorContext<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            rules: Arc::clone(&self.rules),
        }
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<S, C> {
    session: Session,
    /// Number of commits made by this actor.
    version: u64,
    ctx: ActorContext<S, C>,
    rng: StdRng,
    receiver: mpsc::Receiver<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl<S: SessionStore, C: Clock> SessionActor<S, C> {
    /// Runs the actor loop, processing commands until shutdown or until
    /// every handle is dropped.
    async fn run(mut self) {
        let session_id = self.session.id();
        tracing::debug!(%session_id, status = %self.session.status(), "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Join { joiner, reply } => {
                    let result = self.handle_join(joiner).await;
                    log_rejection(session_id, "join", &result);
                    let _ = reply.send(result);
                }
                SessionCommand::Move { actor, to, reply } => {
                    let result = self.handle_move(actor, to).await;
                    log_rejection(session_id, "move", &result);
                    let _ = reply.send(result);
                }
                SessionCommand::Restart { reply } => {
                    let result = self.handle_restart().await;
                    log_rejection(session_id, "restart", &result);
                    let _ = reply.send(result);
                }
                SessionCommand::SetActive {
                    owner,
                    active,
                    reply,
                } => {
                    let result = self.handle_set_active(owner, active).await;
                    log_rejection(session_id, "set_active", &result);
                    let _ = reply.send(result);
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionCommand::Shutdown => break,
            }
        }

        tracing::debug!(%session_id, "session actor stopped");
    }

    async fn handle_join(&mut self, joiner: OwnerId) -> Result<PlayerSnapshot, RegistryError> {
        let mut next = self.session.clone();
        let player_id = self.fresh_player_id();
        let now = self.ctx.clock.now_ms();
        let chaser = next
            .join(player_id, joiner, now, &self.ctx.rules, &mut self.rng)?
            .snapshot();

        self.commit(next, UpdateCause::Joined { player_id }).await?;
        tracing::info!(
            session_id = %self.session.id(),
            %player_id,
            owner = %chaser.owner_id,
            position = %chaser.position,
            "chaser joined, game started"
        );
        Ok(chaser)
    }

    async fn handle_move(
        &mut self,
        actor: OwnerId,
        to: Point,
    ) -> Result<MoveOutcome, RegistryError> {
        let mut next = self.session.clone();
        let now = self.ctx.clock.now_ms();
        let outcome = next.move_player(&actor, to, now, &self.ctx.rules)?;

        let cause = match &outcome.winner_id {
            Some(winner_id) => UpdateCause::Caught {
                player_id: outcome.player_id,
                winner_id: winner_id.clone(),
            },
            None => UpdateCause::Moved {
                player_id: outcome.player_id,
            },
        };
        self.commit(next, cause).await?;

        match &outcome.winner_id {
            Some(winner) => tracing::info!(
                session_id = %self.session.id(),
                %winner,
                "runner caught, game finished"
            ),
            None => tracing::trace!(
                session_id = %self.session.id(),
                player_id = %outcome.player_id,
                position = %outcome.position,
                "player moved"
            ),
        }
        Ok(outcome)
    }

    async fn handle_restart(&mut self) -> Result<(), RegistryError> {
        let mut next = self.session.clone();
        let now = self.ctx.clock.now_ms();
        next.restart(now, &self.ctx.rules, &mut self.rng)?;

        self.commit(next, UpdateCause::Restarted).await?;
        tracing::info!(session_id = %self.session.id(), "game restarted");
        Ok(())
    }

    async fn handle_set_active(
        &mut self,
        owner: OwnerId,
        active: bool,
    ) -> Result<PlayerId, RegistryError> {
        let mut next = self.session.clone();
        let player_id = next.set_active(&owner, active)?;

        self.commit(next, UpdateCause::Presence { player_id, active })
            .await?;
        tracing::debug!(session_id = %self.session.id(), %player_id, active, "presence changed");
        Ok(player_id)
    }

    /// Persists `next`, then makes it the current state and publishes
    /// exactly one update for it.
    async fn commit(&mut self, next: Session, cause: UpdateCause) -> Result<(), RegistryError> {
        if let Err(e) = self.ctx.store.commit(next.record(), next.players()).await {
            tracing::warn!(
                session_id = %self.session.id(),
                error = %e,
                "store commit failed, state unchanged"
            );
            return Err(e.into());
        }

        self.session = next;
        self.version += 1;
        // No subscribers is not an error.
        let _ = self.updates.send(SessionUpdate {
            session_id: self.session.id(),
            version: self.version,
            cause,
            session: self.session.snapshot(),
        });
        Ok(())
    }

    /// A player id not already used in this session.
    fn fresh_player_id(&mut self) -> PlayerId {
        loop {
            let candidate = PlayerId(self.rng.random());
            if self.session.players().iter().all(|p| p.id != candidate) {
                return candidate;
            }
        }
    }
}

/// Store failures are already logged at warn by `commit`.
fn log_rejection<T>(session_id: SessionId, op: &'static str, result: &Result<T, RegistryError>) {
    if let Err(RegistryError::Session(e)) = result {
        tracing::debug!(%session_id, op, kind = %e.kind(), error = %e, "operation rejected");
    }
}

/// Spawns an actor for `session` and returns a handle to it.
///
/// `channel_size` bounds the command queue; `update_buffer` bounds how far
/// a subscriber may lag. Both must be non-zero.
pub(crate) fn spawn_session<S: SessionStore, C: Clock>(
    session: Session,
    ctx: ActorContext<S, C>,
    seed: u64,
    channel_size: usize,
    update_buffer: usize,
) -> SessionHandle {
    let session_id = session.id();
    let (tx, rx) = mpsc::channel(channel_size);
    let (updates, _) = broadcast::channel(update_buffer);

    let actor = SessionActor {
        session,
        version: 0,
        ctx,
        rng: StdRng::seed_from_u64(seed),
        receiver: rx,
        updates: updates.clone(),
    };

    tokio::spawn(actor.run());

    SessionHandle {
        session_id,
        sender: tx,
        updates,
    }
}
