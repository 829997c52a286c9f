//! Docker CLI implementation of [`RuntimeDriver`].

use crate::config::{BuildRecipe, ContainerSpec};
use crate::driver::RuntimeDriver;
use crate::error::{Result, RuntimeError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Drives the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerDriver {
    binary: PathBuf,
}

impl Default for DockerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerDriver {
    /// Use `docker` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a specific client binary (e.g. a podman shim).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    /// Run a query command and report only whether it exited zero.
    async fn succeeds(&self, args: &[&str]) -> bool {
        tracing::trace!(?args, "docker query");
        self.command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Run a query command and return its stdout, or `None` on failure.
    async fn query(&self, args: &[&str]) -> Option<String> {
        tracing::trace!(?args, "docker query");
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a mutating command, turning a non-zero exit into an error.
    async fn run(&self, operation: &str, args: &[String]) -> Result<()> {
        let start = Instant::now();
        tracing::debug!(operation, ?args, "Running docker command");
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            tracing::debug!(
                operation,
                code = output.status.code().unwrap_or(-1),
                "Docker command failed"
            );
            return Err(RuntimeError::command(operation, &output.stderr));
        }

        tracing::debug!(
            operation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Docker command completed"
        );
        Ok(())
    }

    /// Whether `docker ps` (with extra flags) lists exactly `name`.
    async fn listed(&self, extra: Option<&str>, name: &str) -> bool {
        let filter = format!("name=^{name}$");
        let mut args = vec!["ps"];
        args.extend(extra);
        args.extend(["--filter", filter.as_str(), "--format", "{{.Names}}"]);

        self.query(&args)
            .await
            .map(|out| out.lines().any(|line| line.trim() == name))
            .unwrap_or(false)
    }

    /// Translate a create descriptor into `docker run` arguments.
    pub(crate) fn run_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args: Vec<String> = ["run", "-d", "-i", "-t", "--name"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push(spec.name.clone());

        if let Some(hostname) = &spec.hostname {
            args.extend(["--hostname".to_string(), hostname.clone()]);
        }
        if let Some(dir) = &spec.working_dir {
            args.extend(["-w".to_string(), dir.display().to_string()]);
        }
        for mount in &spec.mounts {
            args.extend([
                "-v".to_string(),
                format!("{}:{}", mount.source.display(), mount.target.display()),
            ]);
        }
        for (key, value) in &spec.env {
            args.extend(["-e".to_string(), format!("{key}={value}")]);
        }
        for port in &spec.ports {
            args.extend(["-p".to_string(), port.to_string()]);
        }
        for group in &spec.group_add {
            args.extend(["--group-add".to_string(), group.clone()]);
        }

        args.push(spec.image.clone());
        args
    }
}

/// Forward each line of `reader` into `tx` until EOF.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

#[async_trait]
impl RuntimeDriver for DockerDriver {
    async fn daemon_reachable(&self) -> bool {
        self.succeeds(&["info"]).await
    }

    async fn image_exists(&self, tag: &str) -> bool {
        self.query(&["images", "-q", tag])
            .await
            .map(|out| !out.trim().is_empty())
            .unwrap_or(false)
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.listed(Some("-a"), name).await
    }

    async fn container_running(&self, name: &str) -> bool {
        self.listed(None, name).await
    }

    async fn build_image(
        &self,
        tag: &str,
        recipe: &BuildRecipe,
        on_progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<()> {
        let start = Instant::now();
        tracing::info!(image = %tag, "Building image");

        let mut child = self
            .command()
            .args(["build", "-t", tag, "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dockerfile on stdin with no build context.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(recipe.dockerfile().as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut output = String::new();
        while let Some(line) = rx.recv().await {
            on_progress(&line);
            output.push_str(&line);
            output.push('\n');
        }

        let status = child.wait().await?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            tracing::warn!(image = %tag, code, "Image build failed");
            return Err(RuntimeError::Build { code, output });
        }

        tracing::info!(
            image = %tag,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image built"
        );
        Ok(())
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<()> {
        spec.validate()?;
        tracing::info!(
            container = %spec.name,
            image = %spec.image,
            ports = spec.ports.len(),
            "Creating container"
        );
        self.run("docker run", &Self::run_args(spec)).await
    }

    async fn start_existing(&self, name: &str) -> Result<()> {
        self.run("docker start", &["start".into(), name.into()])
            .await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.run("docker stop", &["stop".into(), name.into()]).await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.run("docker rm", &["rm".into(), name.into()]).await
    }

    async fn remove_image(&self, tag: &str) -> Result<()> {
        self.run("docker rmi", &["rmi".into(), tag.into()]).await
    }

    async fn commit(&self, container: &str, dest_tag: &str) -> Result<()> {
        self.run(
            "docker commit",
            &["commit".into(), container.into(), dest_tag.into()],
        )
        .await
    }

    async fn attach_interactive(&self, name: &str) -> Result<i32> {
        tracing::debug!(container = %name, "Attaching interactive shell");
        // stderr is dropped to hide the client's post-exit hints
        let status = self
            .command()
            .args(["exec", "-it", name, "zsh"])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortMapping;

    #[test]
    fn test_run_args_full_descriptor() {
        let spec = ContainerSpec::builder("vibecage-base:latest", "vibecage-work")
            .hostname("vibecage")
            .working_dir("/home/claude/projects")
            .mount("/srv/work", "/home/claude/projects")
            .env("VIBECAGE_YOLO", "true")
            .port(PortMapping::new(3001, 3000))
            .group_add("999")
            .build()
            .expect("valid spec");

        let args = DockerDriver::run_args(&spec);
        let joined = args.join(" ");

        assert!(joined.starts_with("run -d -i -t --name vibecage-work"));
        assert!(joined.contains("--hostname vibecage"));
        assert!(joined.contains("-w /home/claude/projects"));
        assert!(joined.contains("-v /srv/work:/home/claude/projects"));
        assert!(joined.contains("-e VIBECAGE_YOLO=true"));
        assert!(joined.contains("-p 3001:3000"));
        assert!(joined.contains("--group-add 999"));
        assert_eq!(args.last().map(String::as_str), Some("vibecage-base:latest"));
    }

    #[test]
    fn test_run_args_minimal_descriptor() {
        let spec = ContainerSpec::builder("img", "c").build().expect("valid spec");
        let args = DockerDriver::run_args(&spec);
        assert_eq!(args, vec!["run", "-d", "-i", "-t", "--name", "c", "img"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unreachable() {
        let driver = DockerDriver::with_binary("/nonexistent/vibecage-docker");
        assert!(!driver.daemon_reachable().await);
        assert!(!driver.image_exists("vibecage-base:latest").await);
        assert!(!driver.container_exists("vibecage-x").await);
    }

    #[tokio::test]
    async fn test_missing_binary_surfaces_io_error() {
        let driver = DockerDriver::with_binary("/nonexistent/vibecage-docker");
        let err = driver.stop("vibecage-x").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Io(_)));
    }
}
