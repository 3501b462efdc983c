//! Repository acquisition.
//!
//! A [`RepositorySource`] turns a locator into a [`LocalCopy`]: a temporary
//! directory that is deleted when the value is dropped. The pipeline holds
//! the copy for the length of one run, so it disappears on every exit path.
//!
//! [`GitCloneSource`] is the built-in source and shells out to `git clone`.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::CloneConfig;
use crate::error::{Error, Result};

/// A scoped on-disk copy of a repository.
#[derive(Debug)]
pub struct LocalCopy {
    dir: TempDir,
}

impl LocalCopy {
    /// Create an empty copy location, under `work_dir` if given.
    pub fn new(work_dir: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("drifter-");
        let dir = match work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the copy now, reporting any failure.
    ///
    /// Dropping the value also removes it, silently.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Produces local copies of repositories.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Fetch `locator` into a fresh [`LocalCopy`].
    ///
    /// # Errors
    ///
    /// [`Error::Clone`] naming the locator.
    async fn acquire(&self, locator: &str) -> Result<LocalCopy>;
}

/// Clones with the `git` executable.
pub struct GitCloneSource {
    config: CloneConfig,
}

impl GitCloneSource {
    pub fn new(config: CloneConfig) -> Self {
        Self { config }
    }

    fn command(&self, locator: &str, dest: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if self.config.shallow {
            cmd.args(["--depth", "1"]);
        }
        if let Some(branch) = &self.config.branch {
            cmd.args(["--branch", branch.as_str(), "--single-branch"]);
        }
        cmd.arg("--").arg(locator).arg(dest);
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RepositorySource for GitCloneSource {
    async fn acquire(&self, locator: &str) -> Result<LocalCopy> {
        let copy = LocalCopy::new(self.config.work_dir.as_deref())
            .map_err(|e| Error::clone_failed(locator, format!("temp dir: {}", e)))?;

        info!("cloning {}", locator);
        debug!("clone destination: {}", copy.path().display());

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, self.command(locator, copy.path()).output())
            .await
            .map_err(|_| {
                Error::clone_failed(
                    locator,
                    format!("git clone timed out after {}s", self.config.timeout_secs),
                )
            })?
            .map_err(|e| {
                Error::clone_failed(
                    locator,
                    format!("failed to execute 'git clone'. Is git installed? ({})", e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::clone_failed(locator, stderr.trim()));
        }

        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_copy_removed_on_drop() {
        let copy = LocalCopy::new(None).unwrap();
        let path = copy.path().to_path_buf();
        std::fs::write(path.join("file.txt"), "x").unwrap();
        assert!(path.exists());

        drop(copy);
        assert!(!path.exists());
    }

    #[test]
    fn test_local_copy_in_work_dir() {
        let parent = TempDir::new().unwrap();
        let copy = LocalCopy::new(Some(&parent.path().join("work"))).unwrap();
        assert!(copy.path().starts_with(parent.path()));

        let path = copy.path().to_path_buf();
        copy.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_clone_command_arguments() {
        let source = GitCloneSource::new(CloneConfig {
            branch: Some("develop".to_string()),
            ..CloneConfig::default()
        });
        let cmd = source.command("https://example.com/a.git", Path::new("/tmp/dest"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "clone",
                "--depth",
                "1",
                "--branch",
                "develop",
                "--single-branch",
                "--",
                "https://example.com/a.git",
                "/tmp/dest",
            ]
        );
    }

    #[tokio::test]
    async fn test_clone_failure_names_locator() {
        let work = TempDir::new().unwrap();
        let source = GitCloneSource::new(CloneConfig {
            work_dir: Some(work.path().to_path_buf()),
            timeout_secs: 30,
            ..CloneConfig::default()
        });
        let missing = work.path().join("no-such-repo");
        let locator = missing.to_string_lossy().to_string();

        let err = source.acquire(&locator).await.unwrap_err();
        match err {
            Error::Clone { locator: l, .. } => assert_eq!(l, locator),
            other => panic!("expected clone error, got {:?}", other),
        }
        // The failed copy location is cleaned up.
        let leftovers: Vec<_> = std::fs::read_dir(work.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
