use crate::state::RunningContainer;
use anyhow::{Context, Result};
use bollard::Docker;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;
use tracing::info;

/// Local container runtime, queried once per run.
pub trait ContainerRuntime {
    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>>;

    /// Releases the connection. Consumes the runtime so it cannot be used afterwards.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

pub struct DockerRuntime {
    docker: Docker,
}

pub fn connect() -> Result<DockerRuntime> {
    info!("Connecting to docker");
    // Honours DOCKER_HOST, falls back to the local socket
    let docker = Docker::connect_with_local_defaults().context("Failed to connect to docker")?;
    Ok(DockerRuntime { docker })
}

impl ContainerRuntime for DockerRuntime {
    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .context("Failed to list docker containers")?;

        Ok(containers.into_iter().map(running_container).collect())
    }

    fn close(self) -> Result<()> {
        // bollard has no explicit close, dropping the client shuts down its connection pool
        drop(self.docker);
        Ok(())
    }
}

fn running_container(summary: ContainerSummary) -> RunningContainer {
    RunningContainer {
        id: summary.id.unwrap_or_default(),
        names: summary.names.unwrap_or_default(),
        image: summary.image.unwrap_or_default(),
        image_id: summary.image_id.unwrap_or_default(),
    }
}
