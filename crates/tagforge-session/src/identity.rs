//! Identity hook for resolving who owns a player.
//!
//! Tagforge doesn't authenticate anyone. Whatever sits in front of the
//! engine (a login service, a signed cookie, a bot harness) decides who
//! the caller is and passes an [`OwnerId`]. The engine only compares
//! owner ids and, when building read views, asks an [`IdentityProvider`]
//! for a human-readable name.
//!
//! Two providers ship with the crate:
//!
//! - [`NoIdentities`] never knows a name. Snapshots carry bare owner ids.
//! - [`AnonymousIdentities`] mints guest ids and remembers the names
//!   guests chose, for deployments without accounts.

use std::collections::HashMap;
use std::future::Future;

use rand::Rng;
use tagforge_protocol::OwnerId;
use tokio::sync::RwLock;

/// Looks up display names for owners.
///
/// # Trait bounds
///
/// - `Send + Sync` → one provider is shared by every session task.
/// - `'static` → it lives as long as the engine.
///
/// # Example
///
/// ```rust
/// use tagforge_protocol::OwnerId;
/// use tagforge_session::IdentityProvider;
///
/// /// Uses the owner id itself as the name.
/// struct EchoIdentities;
///
/// impl IdentityProvider for EchoIdentities {
///     async fn display_name(&self, owner: &OwnerId) -> Option<String> {
///         Some(owner.to_string())
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the name to show for `owner`, if one is known.
    ///
    /// A missing name is not an error: the snapshot simply omits it.
    fn display_name(
        &self,
        owner: &OwnerId,
    ) -> impl Future<Output = Option<String>> + Send;
}

// ---------------------------------------------------------------------------
// NoIdentities
// ---------------------------------------------------------------------------

/// A provider that knows nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentities;

impl IdentityProvider for NoIdentities {
    async fn display_name(&self, _owner: &OwnerId) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// AnonymousIdentities
// ---------------------------------------------------------------------------

/// Guest accounts held in memory.
///
/// Guest ids look like `anon_1718000000000_k3j9x0a2b`: the registration
/// time in milliseconds followed by nine random base-36 characters.
#[derive(Debug, Default)]
pub struct AnonymousIdentities {
    names: RwLock<HashMap<OwnerId, String>>,
}

impl AnonymousIdentities {
    /// Suggested name for a guest who creates a session without picking one.
    pub const CREATOR_DEFAULT_NAME: &'static str = "Player 1";
    /// Suggested name for a guest who joins a session without picking one.
    pub const JOINER_DEFAULT_NAME: &'static str = "Player 2";

    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh guest id and remembers `name` for it.
    pub async fn register(&self, name: impl Into<String>, now_ms: u64) -> OwnerId {
        let mut names = self.names.write().await;
        // Collisions need the same millisecond and the same 9 random chars,
        // but a retry is free while the lock is held.
        let owner = loop {
            let candidate = mint_guest_id(now_ms, &mut rand::rng());
            if !names.contains_key(&candidate) {
                break candidate;
            }
        };
        names.insert(owner.clone(), name.into());
        owner
    }

    /// Renames a known guest. Returns `false` if `owner` was never registered.
    pub async fn set_name(&self, owner: &OwnerId, name: impl Into<String>) -> bool {
        match self.names.write().await.get_mut(owner) {
            Some(slot) => {
                *slot = name.into();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }
}

impl IdentityProvider for AnonymousIdentities {
    async fn display_name(&self, owner: &OwnerId) -> Option<String> {
        self.names.read().await.get(owner).cloned()
    }
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const GUEST_SUFFIX_LEN: usize = 9;

fn mint_guest_id<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> OwnerId {
    let suffix: String = (0..GUEST_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    OwnerId::new(format!("anon_{now_ms}_{suffix}"))
}
