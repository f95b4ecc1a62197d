//! End-to-end session scenarios against the TOML store and fake runtime.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use toynet_application::request::{
    CreateHostRequest, CreateSessionRequest, DeleteDeviceRequest, ModifyTopologyRequest,
    RunCommandRequest,
};
use toynet_application::{Collaborators, ReadinessPolicy, SessionUseCase};
use toynet_core::Result;
use toynet_core::clock::SystemClock;
use toynet_core::container::{Capacity, ContainerDriver, ContainerHandle, ContainerStatus};
use toynet_core::emulator::EmulatorClient;
use toynet_core::session::SessionRepository;
use toynet_core::topology::{DefaultRouter, Topology};
use toynet_infrastructure::{SimpleCommandParser, TomlStore};

const TEMPLATE: &str = r#"<topology>
    <routerList>
        <router name="R1"><intf>10.0.0.1/24</intf></router>
    </routerList>
    <switchList>
        <switch name="s1"/>
        <switch name="s2"/>
    </switchList>
    <hostList/>
    <linkList>
        <link><dvc name="R1"><intf>0</intf></dvc><dvc name="s1"/></link>
    </linkList>
</topology>"#;

struct FakeDocker {
    memory_available: AtomicBool,
    created: AtomicUsize,
    killed: AtomicUsize,
}

#[async_trait]
impl ContainerDriver for FakeDocker {
    async fn ensure_image(&self) -> Result<()> {
        Ok(())
    }

    async fn check_capacity(&self) -> Result<Capacity> {
        Ok(Capacity {
            cpu_available: true,
            memory_available: self.memory_available.load(Ordering::SeqCst),
        })
    }

    async fn create_emulator(&self) -> Result<ContainerHandle> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ContainerHandle::new(format!("c{}", n), format!("toynet-{}", n)))
    }

    async fn inspect(&self, _handle: &ContainerHandle) -> Result<ContainerStatus> {
        Ok(ContainerStatus {
            running: true,
            ip_address: Some("172.17.0.9".to_string()),
        })
    }

    async fn kill(&self, _handle: &ContainerHandle) -> Result<()> {
        self.killed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Emulator that keeps the last topology it was given.
#[derive(Default)]
struct FakeEmulator {
    live_topology: Mutex<Option<String>>,
}

#[async_trait]
impl EmulatorClient for FakeEmulator {
    async fn probe(&self, _handle: &ContainerHandle) -> Result<u16> {
        Ok(200)
    }

    async fn push_topology(&self, _handle: &ContainerHandle, topology: &str) -> Result<()> {
        *self.live_topology.lock().unwrap() = Some(topology.to_string());
        Ok(())
    }

    async fn run_command(&self, _handle: &ContainerHandle, command: &str) -> Result<String> {
        Ok(format!("ran {}", command))
    }

    async fn terminate(&self, _handle: &ContainerHandle) -> Result<()> {
        Ok(())
    }
}

struct World {
    _dir: TempDir,
    store: Arc<TomlStore>,
    docker: Arc<FakeDocker>,
    emulator: Arc<FakeEmulator>,
    usecase: SessionUseCase,
}

async fn world() -> World {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(TomlStore::new(dir.path().join("store.toml")));
    store.add_template(1, TEMPLATE).await.unwrap();
    store.add_user("alice").await.unwrap();

    let docker = Arc::new(FakeDocker {
        memory_available: AtomicBool::new(true),
        created: AtomicUsize::new(0),
        killed: AtomicUsize::new(0),
    });
    let emulator = Arc::new(FakeEmulator::default());

    let usecase = SessionUseCase::new(
        Collaborators {
            sessions: store.clone(),
            templates: store.clone(),
            users: store.clone(),
            driver: docker.clone(),
            emulator: emulator.clone(),
            command_parser: Arc::new(SimpleCommandParser::new()),
        },
        Arc::new(SystemClock),
        ReadinessPolicy {
            boot_interval: Duration::from_millis(1),
            boot_attempts: 3,
            probe_interval: Duration::from_millis(1),
            probe_timeout: Some(Duration::from_secs(1)),
        },
    );

    World {
        _dir: dir,
        store,
        docker,
        emulator,
        usecase,
    }
}

#[tokio::test]
async fn add_host_behind_router_keeps_store_and_emulator_in_sync() {
    let w = world().await;
    let created = w
        .usecase
        .create_session(&CreateSessionRequest::new(1, "alice"))
        .await
        .unwrap();
    assert!(created.running);

    w.usecase
        .create_host(
            created.session_id,
            &CreateHostRequest::new("h1", "10.0.0.5/24", "10.0.0.1"),
        )
        .await
        .unwrap();

    let stored = w
        .store
        .find_by_id(created.session_id)
        .await
        .unwrap()
        .unwrap()
        .topology;
    let live = w.emulator.live_topology.lock().unwrap().clone().unwrap();
    assert_eq!(stored, live);

    let topology = Topology::parse(&stored).unwrap();
    assert_eq!(
        topology.host("h1").unwrap().default_router,
        Some(DefaultRouter {
            name: "R1".to_string(),
            intf: 0
        })
    );
}

#[tokio::test]
async fn linked_devices_cannot_be_deleted() {
    let w = world().await;
    let id = w
        .usecase
        .create_session(&CreateSessionRequest::new(1, "alice"))
        .await
        .unwrap()
        .session_id;

    let err = w
        .usecase
        .delete_device(id, &DeleteDeviceRequest::new("switch", "s1"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.is_device_in_use());

    // Unlink through a raw command, then the delete goes through
    w.usecase
        .modify_topology(
            id,
            &ModifyTopologyRequest {
                command: Some("unlink R1 s1".to_string()),
                ip: None,
            },
        )
        .await
        .unwrap();
    w.usecase
        .delete_device(id, &DeleteDeviceRequest::new("switch", "s1"))
        .await
        .unwrap();

    let view = w.usecase.get_session(id).await.unwrap();
    let topology = Topology::parse(&view.topology).unwrap();
    assert_eq!(topology.switches().len(), 1);
    assert!(topology.links().is_empty());
}

#[tokio::test]
async fn no_capacity_then_lazy_bring_up_from_persisted_topology() {
    let w = world().await;
    w.docker.memory_available.store(false, Ordering::SeqCst);

    let created = w
        .usecase
        .create_session(&CreateSessionRequest::new(1, "alice"))
        .await
        .unwrap();
    assert!(!created.running);
    assert_eq!(w.docker.created.load(Ordering::SeqCst), 0);

    let err = w
        .usecase
        .run_command(created.session_id, &RunCommandRequest::new("pingall"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);

    w.docker.memory_available.store(true, Ordering::SeqCst);
    let view = w.usecase.get_session(created.session_id).await.unwrap();
    assert!(view.running);
    assert_eq!(
        w.emulator.live_topology.lock().unwrap().as_deref(),
        Some(view.topology.as_str())
    );

    let output = w
        .usecase
        .run_command(created.session_id, &RunCommandRequest::new("pingall"))
        .await
        .unwrap();
    assert_eq!(output.output, "ran pingall");
}

#[tokio::test]
async fn terminate_then_reattach() {
    let w = world().await;
    let id = w
        .usecase
        .create_session(&CreateSessionRequest::new(1, "alice"))
        .await
        .unwrap()
        .session_id;

    w.usecase.terminate_session(id).await.unwrap();
    assert_eq!(w.docker.killed.load(Ordering::SeqCst), 1);
    assert!(w.usecase.terminate_session(id).await.is_err());

    // The record survives and the next read provisions a fresh emulator
    assert!(w.usecase.get_session(id).await.unwrap().running);
    assert_eq!(w.docker.created.load(Ordering::SeqCst), 2);

    w.usecase.shutdown().await.unwrap();
    assert_eq!(w.docker.killed.load(Ordering::SeqCst), 2);
    assert_eq!(w.store.list_sessions().await.unwrap().len(), 1);
}
