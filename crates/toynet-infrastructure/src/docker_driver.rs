//! Docker-backed container driver.
//!
//! Emulators run as privileged containers (the emulator manipulates network
//! namespaces) labelled `toynet.managed=true`, which is also how capacity
//! accounting finds them.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, HostConfig};
use futures::StreamExt;
use std::collections::HashMap;
use toynet_core::config::EmulatorConfig;
use toynet_core::container::{Capacity, ContainerDriver, ContainerHandle, ContainerStatus};
use toynet_core::error::{Result, ToynetError};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MANAGED_LABEL: &str = "toynet.managed";

fn docker_error(context: &str, e: BollardError) -> ToynetError {
    ToynetError::container(format!("{}: {}", context, e))
}

fn is_not_found(e: &BollardError) -> bool {
    matches!(
        e,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// [`ContainerDriver`] talking to the local Docker daemon.
pub struct DockerDriver {
    docker: Docker,
    config: EmulatorConfig,
}

impl DockerDriver {
    pub fn new(docker: Docker, config: EmulatorConfig) -> Self {
        Self { docker, config }
    }

    /// Connects using the platform's default socket or `DOCKER_HOST`.
    pub fn connect(config: EmulatorConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| docker_error("failed to connect to docker", e))?;
        Ok(Self::new(docker, config))
    }

    fn container_name(&self) -> String {
        format!("{}-{}", self.config.name_prefix, Uuid::new_v4().simple())
    }

    fn container_config(&self) -> Config<String> {
        let mut env = vec![format!("MINI_FLASK_PORT={}", self.config.api_port)];
        if self.config.dev_mode {
            env.push("FLASK_ENV=development".to_string());
        }

        let labels = HashMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]);

        let host_config = HostConfig {
            privileged: Some(true),
            network_mode: Some(self.config.network.clone()),
            nano_cpus: Some((self.config.cpus_per_instance * 1e9) as i64),
            memory: Some(self.config.memory_per_instance_bytes() as i64),
            ..Default::default()
        };

        Config {
            image: Some(self.config.image.clone()),
            env: Some(env),
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        }
    }

    /// Address of the container on the configured network.
    ///
    /// On the default bridge the address sits at the top of the network
    /// settings; on user-defined networks it is keyed by network name.
    fn ip_address(&self, inspect: &ContainerInspectResponse) -> Option<String> {
        let settings = inspect.network_settings.as_ref()?;
        let ip = if self.config.uses_default_network() {
            settings.ip_address.clone()
        } else {
            settings
                .networks
                .as_ref()?
                .get(&self.config.network)?
                .ip_address
                .clone()
        };
        ip.filter(|ip| !ip.is_empty())
    }

    async fn running_emulators(&self) -> Result<usize> {
        let filters = HashMap::from([
            ("label".to_string(), vec![format!("{}=true", MANAGED_LABEL)]),
            ("status".to_string(), vec!["running".to_string()]),
        ]);
        let options = ListContainersOptions {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| docker_error("failed to list containers", e))?;
        Ok(containers.len())
    }

    async fn pull_image(&self) -> Result<()> {
        info!(image = %self.config.image, "Pulling emulator image");

        let options = CreateImageOptions {
            from_image: self.config.image.as_str(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!(status = %status, "Pull progress");
                    }
                }
                Err(e) => return Err(docker_error("failed to pull emulator image", e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerDriver for DockerDriver {
    async fn ensure_image(&self) -> Result<()> {
        match self.docker.inspect_image(&self.config.image).await {
            Ok(_) => {
                debug!(image = %self.config.image, "Emulator image present");
                Ok(())
            }
            // Dev images are built locally and never pulled
            Err(e) if is_not_found(&e) && !self.config.dev_mode => self.pull_image().await,
            Err(e) => Err(docker_error(
                &format!("emulator image {} unavailable", self.config.image),
                e,
            )),
        }
    }

    async fn check_capacity(&self) -> Result<Capacity> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| docker_error("failed to query docker info", e))?;
        let running = self.running_emulators().await? as f64;

        let cpus = info.ncpu.unwrap_or(0) as f64;
        let memory = info.mem_total.unwrap_or(0) as f64;
        let cpu_per = self.config.cpus_per_instance;
        let mem_per = self.config.memory_per_instance_bytes() as f64;

        let capacity = Capacity {
            cpu_available: cpus - running * cpu_per >= cpu_per,
            memory_available: memory - running * mem_per >= mem_per,
        };
        debug!(running, cpus, memory, ?capacity, "Checked host capacity");
        Ok(capacity)
    }

    async fn create_emulator(&self) -> Result<ContainerHandle> {
        let name = self.container_name();
        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), self.container_config())
            .await
            .map_err(|e| docker_error("failed to create emulator container", e))?;

        if let Err(e) = self
            .docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await
        {
            let remove = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(cleanup) = self.docker.remove_container(&response.id, Some(remove)).await {
                warn!(container = %name, error = %cleanup, "Failed to remove unstarted container");
            }
            return Err(docker_error("failed to start emulator container", e));
        }

        info!(container = %name, id = %response.id, "Started emulator container");
        Ok(ContainerHandle::new(response.id, name))
    }

    async fn inspect(&self, handle: &ContainerHandle) -> Result<ContainerStatus> {
        let inspect = self
            .docker
            .inspect_container(&handle.id, None)
            .await
            .map_err(|e| docker_error("failed to inspect emulator container", e))?;

        let running = inspect
            .state
            .as_ref()
            .and_then(|state| state.running)
            .unwrap_or(false);

        Ok(ContainerStatus {
            running,
            ip_address: self.ip_address(&inspect),
        })
    }

    async fn kill(&self, handle: &ContainerHandle) -> Result<()> {
        let kill = KillContainerOptions { signal: "SIGKILL" };
        match self.docker.kill_container(&handle.id, Some(kill)).await {
            Ok(()) => {}
            // Already gone or already stopped
            Err(e) if is_not_found(&e) => {}
            Err(BollardError::DockerResponseServerError {
                status_code: 409, ..
            }) => {}
            Err(e) => return Err(docker_error("failed to kill emulator container", e)),
        }

        let remove = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(&handle.id, Some(remove)).await {
            Ok(()) => {}
            Err(e) if is_not_found(&e) => {}
            Err(e) => return Err(docker_error("failed to remove emulator container", e)),
        }

        info!(container = %handle.name, "Killed emulator container");
        Ok(())
    }
}
