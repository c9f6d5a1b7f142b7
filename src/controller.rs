use crate::config::Config;
use crate::container_runtime::ContainerRuntime;
use crate::image_reference::ImageReference;
use crate::privilege::{self, Identity};
use crate::registry::DigestResolver;
use crate::state::{DigestCache, RunResult, RunningContainer};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

/// Checks every running container selected by the image filter and writes the id of each
/// container with a newer image digest to `out`.
///
/// The runtime connection is closed and privileges are dropped before the registry is contacted.
pub async fn run<R, I, D, W>(
    config: &Config,
    runtime: R,
    identity: &I,
    registry: &D,
    out: &mut W,
) -> Result<RunResult>
where
    R: ContainerRuntime,
    I: Identity,
    D: DigestResolver,
    W: Write,
{
    let containers = runtime.list_running_containers().await?;
    runtime
        .close()
        .context("Failed to close docker connection")?;

    let dropped = privilege::drop_if_privileged(identity, &config.nobody_username)
        .context("Failed to drop privileges")?;
    if dropped {
        debug!(
            "Successfully dropped privileges to UID {} and GID {}",
            identity.effective_uid(),
            identity.effective_gid()
        );
    } else {
        debug!(
            "Not running as root, keeping UID {} and GID {}",
            identity.effective_uid(),
            identity.effective_gid()
        );
    }

    info!("Checking {} running containers", containers.len());

    let mut cache = DigestCache::default();
    let mut result = RunResult::default();

    for container in containers
        .iter()
        .filter(|container| config.images.matches(&container.image))
    {
        let digest = current_digest(&mut cache, registry, &container.image).await?;

        if digest.eq_ignore_ascii_case(&container.image_id) {
            info!(
                "Container {} ({}) with image {} is up to date",
                container.names.join(" "),
                container.id,
                container.image
            );
        } else {
            info!(
                "Container {} ({}) with image {} has newer version {} available",
                container.names.join(" "),
                container.id,
                container.image,
                digest
            );
            report_stale(out, container)?;
            result.updates_pending = true;
        }
    }

    Ok(result)
}

async fn current_digest<D: DigestResolver>(
    cache: &mut DigestCache,
    registry: &D,
    image: &str,
) -> Result<String> {
    if let Some(digest) = cache.get(image) {
        return Ok(digest.to_string());
    }

    let reference = ImageReference::parse(image);
    debug!("Fetching digest for {} from registry", reference);
    let digest = registry
        .resolve_digest(&reference)
        .await
        .with_context(|| format!("Failed to fetch digest for {}", image))?;
    cache.insert(image, digest.clone());
    Ok(digest)
}

fn report_stale<W: Write>(out: &mut W, container: &RunningContainer) -> Result<()> {
    writeln!(out, "{}", container.id).context("Failed to write container id to stdout")?;
    out.flush().context("Failed to flush stdout")
}
