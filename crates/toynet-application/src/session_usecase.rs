//! Session use case implementation.
//!
//! `SessionUseCase` is the session orchestrator. It maps a persisted session
//! to at most one live emulator container, provisions that container lazily
//! under admission control, and keeps the persisted topology and the live
//! topology consistent across edits.
//!
//! # Edit protocol
//!
//! Every structural edit runs inside the session's critical section:
//!
//! 1. load and parse the persisted topology and compute the new document
//! 2. require a live container
//! 3. push the new document to the emulator, aborting on failure
//! 4. persist the new document
//!
//! The store is never ahead of the emulator.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toynet_core::clock::Clock;
use toynet_core::command::CommandParser;
use toynet_core::container::ContainerDriver;
use toynet_core::emulator::EmulatorClient;
use toynet_core::error::{Result, ToynetError};
use toynet_core::session::{
    Session, SessionId, SessionRepository, TemplateRepository, UserRepository,
};
use toynet_core::topology::{Topology, edit};

use crate::request::{
    CommandOutput, CreateHostRequest, CreateSessionRequest, CreateSwitchRequest, CreatedSession,
    DeleteDeviceRequest, ModifyTopologyRequest, RunCommandRequest, SessionView,
};
use crate::session::{ContainerRegistry, ReadinessPolicy, ReadinessWaiter, SessionSlot};

/// External collaborators of the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub users: Arc<dyn UserRepository>,
    pub driver: Arc<dyn ContainerDriver>,
    pub emulator: Arc<dyn EmulatorClient>,
    pub command_parser: Arc<dyn CommandParser>,
}

/// Use case for the lifecycle of emulated network sessions.
///
/// One instance is shared by every request handler of the process; it owns
/// the container registry and therefore the admission view.
pub struct SessionUseCase {
    /// Persisted session records
    sessions: Arc<dyn SessionRepository>,
    /// Topology templates sessions are copied from
    templates: Arc<dyn TemplateRepository>,
    /// Known users
    users: Arc<dyn UserRepository>,
    /// Container runtime, used for admission control and creation
    driver: Arc<dyn ContainerDriver>,
    /// Control API of live emulators
    emulator: Arc<dyn EmulatorClient>,
    /// Parser for raw modification commands
    command_parser: Arc<dyn CommandParser>,
    /// Session id to live container
    registry: ContainerRegistry,
    /// Bring-up polling
    readiness: ReadinessWaiter,
}

impl SessionUseCase {
    pub fn new(collaborators: Collaborators, clock: Arc<dyn Clock>, policy: ReadinessPolicy) -> Self {
        let Collaborators {
            sessions,
            templates,
            users,
            driver,
            emulator,
            command_parser,
        } = collaborators;

        Self {
            registry: ContainerRegistry::new(driver.clone()),
            readiness: ReadinessWaiter::new(driver.clone(), emulator.clone(), clock, policy),
            sessions,
            templates,
            users,
            driver,
            emulator,
            command_parser,
        }
    }

    /// Ties readiness waits to `cancel`, typically the process shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.readiness = self.readiness.with_cancellation(cancel);
        self
    }

    /// Creates a session from a template and tries to bring up its emulator.
    ///
    /// The session row is written before provisioning; `running` is false
    /// when admission control denied a container or bring-up failed.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, `NotFound` for an unknown template or
    /// user, and store failures.
    pub async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession> {
        let (topo_id, user_id) = request.validate()?;

        let topology = self
            .templates
            .find_topology(topo_id)
            .await?
            .ok_or_else(|| ToynetError::not_found("Topology", topo_id.to_string()))?;

        if !self.users.exists(user_id).await? {
            return Err(ToynetError::not_found("User", user_id));
        }

        let session_id = self.sessions.create(topo_id, user_id, &topology).await?;
        tracing::info!(session_id = %session_id, topo_id, user_id, "Created session");

        let mut slot = self.registry.lock(session_id).await;
        let running = self.provision(&mut slot, &topology).await?;

        Ok(CreatedSession {
            session_id,
            running,
        })
    }

    /// Returns the session, provisioning its emulator if none is live.
    ///
    /// A new emulator is seeded with the currently persisted topology.
    pub async fn get_session(&self, session_id: SessionId) -> Result<SessionView> {
        let mut slot = self.registry.lock(session_id).await;
        let session = self.load_session(session_id).await?;

        let running = if slot.is_live() {
            true
        } else {
            self.provision(&mut slot, &session.topology).await?
        };

        Ok(SessionView {
            topo_id: session.topo_id,
            user_id: session.user_id,
            topology: session.topology,
            running,
        })
    }

    /// Applies a raw modification command to the session's topology.
    pub async fn modify_topology(
        &self,
        session_id: SessionId,
        request: &ModifyTopologyRequest,
    ) -> Result<()> {
        let (command, ip) = request.validate()?;
        tracing::debug!(session_id = %session_id, command, "Applying topology command");
        self.commit_edit(session_id, |topology| {
            self.command_parser.apply(command, topology, ip)
        })
        .await
    }

    /// Runs a command inside the session's live network.
    ///
    /// Remote failures keep the container; the caller sees the emulator's
    /// status and message.
    pub async fn run_command(
        &self,
        session_id: SessionId,
        request: &RunCommandRequest,
    ) -> Result<CommandOutput> {
        let command = request.validate()?;
        let slot = self.registry.lock(session_id).await;
        let handle = slot.handle().ok_or_else(|| no_live_container(session_id))?;

        let output = self.emulator.run_command(handle, command).await?;
        Ok(CommandOutput { output })
    }

    /// Stops the session's emulator and releases its container.
    ///
    /// The persisted topology is left untouched, so a later read brings the
    /// session back up where it stopped.
    ///
    /// # Errors
    ///
    /// `NoLiveContainer` when nothing runs for the session and
    /// `TerminateFailed` when the container could not be killed.
    pub async fn terminate_session(&self, session_id: SessionId) -> Result<()> {
        let mut slot = self.registry.lock(session_id).await;
        self.terminate_slot(&mut slot).await
    }

    pub async fn create_host(&self, session_id: SessionId, request: &CreateHostRequest) -> Result<()> {
        let (name, ip, gateway) = request.validate()?;
        self.commit_edit(session_id, |topology| {
            edit::add_host(topology, name, ip, gateway)
        })
        .await
    }

    pub async fn create_switch(
        &self,
        session_id: SessionId,
        request: &CreateSwitchRequest,
    ) -> Result<()> {
        let name = request.validate()?;
        self.commit_edit(session_id, |topology| Ok(edit::add_switch(topology, name)))
            .await
    }

    pub async fn delete_device(
        &self,
        session_id: SessionId,
        request: &DeleteDeviceRequest,
    ) -> Result<()> {
        let (kind, name) = request.validate()?;
        self.commit_edit(session_id, |topology| {
            edit::delete_device(topology, kind, name)
        })
        .await
    }

    /// Lists sessions that currently own a live container.
    pub async fn live_sessions(&self) -> Vec<SessionId> {
        self.registry.live_sessions().await
    }

    /// Terminates every live session.
    ///
    /// Keeps going past failures and returns the first one.
    pub async fn shutdown(&self) -> Result<()> {
        self.readiness.cancellation_token().cancel();

        let mut first_error = None;
        for session_id in self.registry.live_sessions().await {
            let mut slot = self.registry.lock(session_id).await;
            if !slot.is_live() {
                continue;
            }
            if let Err(e) = self.terminate_slot(&mut slot).await {
                tracing::error!(session_id = %session_id, error = %e, "Failed to terminate session on shutdown");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------

    async fn load_session(&self, session_id: SessionId) -> Result<Session> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| ToynetError::not_found("Session", session_id.to_string()))
    }

    /// Brings up an emulator for the slot's session and seeds it.
    ///
    /// Returns `Ok(false)` when admission control denied a container or the
    /// emulator never became ready; in the latter case the container is
    /// already released.
    async fn provision(&self, slot: &mut SessionSlot, topology: &str) -> Result<bool> {
        let session_id = slot.session_id();

        let capacity = self.driver.check_capacity().await?;
        if !capacity.admits() {
            tracing::warn!(
                session_id = %session_id,
                cpu_available = capacity.cpu_available,
                memory_available = capacity.memory_available,
                "Not enough resources for a new emulator"
            );
            return Ok(false);
        }

        let handle = self.driver.create_emulator().await?;
        tracing::info!(
            session_id = %session_id,
            container = %handle.name,
            id = handle.short_id(),
            "Provisioned emulator container"
        );
        slot.insert(handle);

        if !self.readiness.wait_until_ready(slot).await? {
            return Ok(false);
        }

        let Some(handle) = slot.handle() else {
            return Ok(false);
        };
        if let Err(e) = self.emulator.push_topology(handle, topology).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to seed emulator topology");
            slot.release().await?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Runs `apply` against the persisted topology, then pushes and persists.
    async fn commit_edit<F>(&self, session_id: SessionId, apply: F) -> Result<()>
    where
        F: FnOnce(&Topology) -> Result<Topology>,
    {
        let mut slot = self.registry.lock(session_id).await;

        let session = self.load_session(session_id).await?;
        let current = Topology::parse(&session.topology)?;
        let updated = apply(&current)?.serialize()?;

        self.push_then_persist(&mut slot, &updated).await
    }

    async fn push_then_persist(&self, slot: &mut SessionSlot, topology: &str) -> Result<()> {
        let session_id = slot.session_id();
        if !slot.is_live() {
            return Err(no_live_container(session_id));
        }

        if !self.readiness.wait_until_ready(slot).await? {
            return Err(ToynetError::Unreachable(format!(
                "emulator for session {} did not become ready",
                session_id
            )));
        }

        let handle = slot.handle().ok_or_else(|| no_live_container(session_id))?;
        self.emulator.push_topology(handle, topology).await?;
        self.sessions.update_topology(session_id, topology).await?;

        tracing::debug!(session_id = %session_id, "Topology pushed and persisted");
        Ok(())
    }

    async fn terminate_slot(&self, slot: &mut SessionSlot) -> Result<()> {
        let session_id = slot.session_id();
        let handle = slot.handle().ok_or_else(|| no_live_container(session_id))?;

        if let Err(e) = self.emulator.terminate(handle).await {
            tracing::debug!(session_id = %session_id, error = %e, "Emulator terminate request failed");
        }

        slot.release().await?;
        tracing::info!(session_id = %session_id, "Terminated session");
        Ok(())
    }
}

fn no_live_container(session_id: SessionId) -> ToynetError {
    ToynetError::NoLiveContainer {
        session_id: session_id.to_string(),
    }
}

#[cfg(test)]
#[path = "session_usecase_test.rs"]
mod tests;
