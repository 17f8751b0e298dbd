//! Restart after a successful update
//!
//! Before the binary is swapped the CLI saves how it was invoked. Once the
//! update is in place the saved invocation is consumed and turned into a
//! [`Relaunch`], which the caller spawns before exiting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::error::{Result, UpdateError};
use crate::fsutil::atomic_write;

/// A saved process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartInfo {
    /// Full argument vector including argv[0]
    pub args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub timestamp: DateTime<Utc>,
}

impl RestartInfo {
    /// Capture the current process's arguments, environment and directory
    pub fn capture() -> Result<Self> {
        let args = std::env::args_os()
            .map(|arg| {
                arg.into_string().map_err(|arg| {
                    UpdateError::config(format!("argument is not valid UTF-8: {:?}", arg))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut environment = BTreeMap::new();
        for (key, value) in std::env::vars_os() {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => {
                    environment.insert(key, value);
                }
                (key, _) => debug!("Skipping non UTF-8 environment variable {:?}", key),
            }
        }

        Ok(Self {
            args,
            environment,
            working_dir: std::env::current_dir()?,
            timestamp: Utc::now(),
        })
    }
}

/// Saves and consumes the restart file
#[derive(Debug, Clone)]
pub struct RestartOrchestrator {
    path: PathBuf,
    program: Option<PathBuf>,
}

impl RestartOrchestrator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            program: None,
        }
    }

    /// Relaunch `program` instead of the current executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save the current process invocation
    pub fn save_invocation(&self) -> Result<()> {
        self.save(&RestartInfo::capture()?)
    }

    /// Save an explicit invocation
    pub fn save(&self, info: &RestartInfo) -> Result<()> {
        let content = serde_json::to_vec_pretty(info)?;
        atomic_write(&self.path, &content)?;
        debug!("Restart info saved to {}", self.path.display());
        Ok(())
    }

    /// Consume the saved invocation.
    ///
    /// The file is claimed by renaming it first, so at most one caller gets it.
    pub fn resume(&self) -> Result<Relaunch> {
        let claimed = self.claimed_path();
        fs::rename(&self.path, &claimed)
            .map_err(|e| UpdateError::no_restart_info(&self.path, e.to_string()))?;

        let content = fs::read(&claimed);
        if let Err(e) = fs::remove_file(&claimed) {
            debug!("Failed to remove claimed restart info {:?}: {}", claimed, e);
        }
        let content = content.map_err(|e| UpdateError::no_restart_info(&self.path, e.to_string()))?;

        let info: RestartInfo = serde_json::from_slice(&content)
            .map_err(|e| UpdateError::no_restart_info(&self.path, e.to_string()))?;

        let program = match &self.program {
            Some(program) => program.clone(),
            None => std::env::current_exe()?,
        };

        info!("Restart info from {} consumed", info.timestamp);
        Ok(Relaunch {
            program,
            args: info.args.into_iter().skip(1).collect(),
            env: info.environment,
            cwd: info.working_dir,
        })
    }

    fn claimed_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".claimed-{}", std::process::id()));
        self.path.with_file_name(name)
    }
}

/// A process to start in place of the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaunch {
    pub program: PathBuf,
    /// Arguments without argv[0]
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
}

impl Relaunch {
    /// Spawn the process detached and return its id.
    ///
    /// The caller is expected to exit afterwards.
    pub fn launch(&self) -> Result<u32> {
        let mut command = self.command();
        let child = command.spawn().map_err(|source| UpdateError::RestartSpawn {
            program: self.program.clone(),
            source,
        })?;

        info!("Restarted {} (pid {})", self.program.display(), child.id());
        Ok(child.id())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .envs(&self.env)
            .current_dir(&self.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command
    }
}
