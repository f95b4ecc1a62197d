//! Registry of live emulator containers.
//!
//! The registry is the single source of truth for "does this session have a
//! running emulator". It is constructed once at service start and shared by
//! every request handler.
//!
//! Each session id owns one slot guarded by its own async mutex. Holding a
//! [`SessionSlot`] is the per-session critical section: provisioning, edits
//! and termination of one session are serialized, while different sessions
//! proceed independently. A slot only stays in the map while it holds a
//! container or someone is waiting on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use toynet_core::container::{ContainerDriver, ContainerHandle};
use toynet_core::error::{Result, ToynetError};
use toynet_core::session::SessionId;

type Slot = Arc<Mutex<Option<ContainerHandle>>>;
type SlotMap = Arc<SyncMutex<HashMap<SessionId, Slot>>>;

fn lock_map(slots: &SlotMap) -> MutexGuard<'_, HashMap<SessionId, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of releasing a session's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released {
    /// The container was killed and its entry removed.
    Removed(ContainerHandle),
    /// No container was registered for the session.
    Absent,
}

/// Concurrency-safe map from session id to container handle.
pub struct ContainerRegistry {
    /// Driver used to kill containers before their entry is dropped
    driver: Arc<dyn ContainerDriver>,
    /// Slots of live or contended sessions
    slots: SlotMap,
}

impl ContainerRegistry {
    /// Creates an empty registry.
    pub fn new(driver: Arc<dyn ContainerDriver>) -> Self {
        Self {
            driver,
            slots: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    fn slot(&self, session_id: SessionId) -> Slot {
        lock_map(&self.slots).entry(session_id).or_default().clone()
    }

    /// Enters the critical section for `session_id`.
    ///
    /// Waits for any in-flight operation on the same session to finish.
    pub async fn lock(&self, session_id: SessionId) -> SessionSlot {
        let guard = self.slot(session_id).lock_owned().await;
        SessionSlot {
            session_id,
            guard,
            driver: self.driver.clone(),
            slots: self.slots.clone(),
        }
    }

    /// Returns the container registered for `session_id`, if any.
    pub async fn get_container(&self, session_id: SessionId) -> Option<ContainerHandle> {
        self.lock(session_id).await.handle().cloned()
    }

    /// Registers `handle` for `session_id`.
    ///
    /// Returns the handle that was previously registered, if any.
    pub async fn set_container(
        &self,
        session_id: SessionId,
        handle: ContainerHandle,
    ) -> Option<ContainerHandle> {
        self.lock(session_id).await.insert(handle)
    }

    /// Kills the session's container and removes its entry.
    ///
    /// # Errors
    ///
    /// Returns `TerminateFailed` if the kill fails; the entry is kept so
    /// the caller can retry.
    pub async fn delete_container(&self, session_id: SessionId) -> Result<Released> {
        self.lock(session_id).await.release().await
    }

    /// Lists sessions that currently have a registered container.
    ///
    /// Sessions with an operation in flight are reported once it finishes.
    pub async fn live_sessions(&self) -> Vec<SessionId> {
        let slots: Vec<(SessionId, Slot)> = lock_map(&self.slots)
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();

        let mut live = Vec::new();
        for (session_id, slot) in slots {
            if slot.lock().await.is_some() {
                live.push(session_id);
            }
        }
        live.sort();
        live
    }
}

/// Exclusive access to one session's registry entry.
///
/// Dropping the slot ends the critical section. An empty slot nobody else
/// is waiting on is evicted from the registry on drop.
pub struct SessionSlot {
    session_id: SessionId,
    guard: OwnedMutexGuard<Option<ContainerHandle>>,
    driver: Arc<dyn ContainerDriver>,
    slots: SlotMap,
}

impl SessionSlot {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn handle(&self) -> Option<&ContainerHandle> {
        self.guard.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut ContainerHandle> {
        self.guard.as_mut()
    }

    /// Returns true if a container is registered for the session.
    pub fn is_live(&self) -> bool {
        self.guard.is_some()
    }

    /// Registers `handle`, returning the previously registered one.
    pub fn insert(&mut self, handle: ContainerHandle) -> Option<ContainerHandle> {
        self.guard.replace(handle)
    }

    /// Kills the registered container, then removes the entry.
    ///
    /// The entry is only removed once the kill succeeded.
    pub async fn release(&mut self) -> Result<Released> {
        let Some(handle) = self.guard.as_ref() else {
            return Ok(Released::Absent);
        };

        if let Err(e) = self.driver.kill(handle).await {
            tracing::error!(
                session_id = %self.session_id,
                container = %handle.name,
                error = %e,
                "Failed to kill emulator container"
            );
            return Err(ToynetError::TerminateFailed {
                session_id: self.session_id.to_string(),
            });
        }

        tracing::info!(
            session_id = %self.session_id,
            container = %handle.name,
            "Released emulator container"
        );

        match self.guard.take() {
            Some(handle) => Ok(Released::Removed(handle)),
            None => Ok(Released::Absent),
        }
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        if self.guard.is_some() {
            return;
        }

        // New waiters clone the slot under the map lock, so a count of two
        // (map + this guard) means nobody else can reach it.
        let mut slots = lock_map(&self.slots);
        let own = OwnedMutexGuard::mutex(&self.guard);
        let evict = slots
            .get(&self.session_id)
            .is_some_and(|slot| Arc::ptr_eq(slot, own) && Arc::strong_count(own) == 2);
        if evict {
            slots.remove(&self.session_id);
        }
    }
}
