//! Update command

use anyhow::{Context, Result};
use bifrost_update::config::default_config_path;
use bifrost_update::{
    ReleaseInfo, ReplacementManager, RestartOrchestrator, StatePaths, Updater, UpdaterConfig,
    VERSION,
};
use dialoguer::Confirm;
use std::path::Path;
use tracing::warn;

use crate::cli::UpdateArgs;
use crate::output;

/// Changelog lines shown before asking for confirmation
const CHANGELOG_PREVIEW_LINES: usize = 15;

pub async fn run(args: UpdateArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(channel) = args.channel {
        config.channel = channel;
    }

    let updater = Updater::from_config(&config, VERSION)
        .context("Failed to initialize updater")?
        .with_progress(true);

    let spinner = output::spinner("Checking for updates...");
    let checked = updater.check().await;
    spinner.finish_and_clear();

    let Some(release) = checked.context("Failed to check for updates")? else {
        output::success(&format!(
            "Already on the latest {} release ({})",
            config.channel, VERSION
        ));
        return Ok(());
    };

    output::header("Update available");
    output::kv("Current version", VERSION);
    output::kv("Latest version", &release.version.to_string());
    output::kv("Channel", config.channel.as_str());

    if args.check {
        println!();
        output::info("Run 'bifrost-backups update' to install it");
        return Ok(());
    }

    print_changelog(updater.changelog(&release));

    if !args.yes {
        let proceed = Confirm::new()
            .with_prompt(format!("Update to {}?", release.version))
            .default(false)
            .interact()?;

        if !proceed {
            output::info("Update cancelled");
            return Ok(());
        }
    }

    let restart = if args.no_restart {
        None
    } else {
        let paths = StatePaths::resolve(&config)?;
        let orchestrator = RestartOrchestrator::new(&paths.restart);
        orchestrator
            .save_invocation()
            .context("Failed to save restart information")?;
        Some(orchestrator)
    };

    if let Err(e) = install(&updater, &release).await {
        if let Some(orchestrator) = &restart {
            discard_restart(orchestrator);
        }
        return Err(e);
    }

    let Some(orchestrator) = restart else {
        output::info("Restart bifrost-backups to use the new version");
        return Ok(());
    };

    let relaunch = orchestrator
        .resume()
        .context("Failed to load restart information")?;
    relaunch.launch().context("Failed to restart bifrost-backups")?;
    std::process::exit(0);
}

/// Drop a saved invocation that will not be resumed
fn discard_restart(orchestrator: &RestartOrchestrator) -> bool {
    match orchestrator.resume() {
        Ok(_) => true,
        Err(e) => {
            warn!(
                "Failed to clear restart information at {}: {}",
                orchestrator.path().display(),
                e
            );
            false
        }
    }
}

async fn install(updater: &Updater, release: &ReleaseInfo) -> Result<()> {
    output::info(&format!("Installing {}", release.asset_name));

    match updater.update(release).await {
        Ok(outcome) => {
            output::success(&format!(
                "Updated bifrost-backups {} -> {}",
                outcome.from_version, outcome.to_version
            ));
            output::kv("Backup", &outcome.backup.display().to_string());
            Ok(())
        }
        Err(e) => {
            if let Some(rollback) = e.rollback_error() {
                output::error(&format!("Rollback failed: {}", rollback));
                if let Ok(executable) = updater.executable() {
                    let manager = ReplacementManager::new(executable);
                    output::warning(&format!(
                        "Restore the previous binary manually from {}",
                        manager.backup_path().display()
                    ));
                }
            } else {
                output::info(&format!("bifrost-backups remains at {}", VERSION));
            }
            Err(e).context("Update failed")
        }
    }
}

fn print_changelog(notes: &str) {
    if notes.trim().is_empty() {
        return;
    }

    output::header("Changelog");
    for line in notes.lines().take(CHANGELOG_PREVIEW_LINES) {
        println!("{}", line);
    }
    if notes.lines().count() > CHANGELOG_PREVIEW_LINES {
        println!("...");
    }
    println!();
}

fn load_config(path: Option<&Path>) -> Result<UpdaterConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    UpdaterConfig::load(&path)
        .with_context(|| format!("Failed to load updater config from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discard_restart_removes_saved_invocation() {
        let temp = TempDir::new().unwrap();
        let orchestrator = RestartOrchestrator::new(temp.path().join("restart-info.json"));
        orchestrator.save_invocation().unwrap();

        assert!(discard_restart(&orchestrator));
        assert!(!orchestrator.path().exists());
    }

    #[test]
    fn test_discard_restart_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        let orchestrator = RestartOrchestrator::new(temp.path().join("restart-info.json"));

        assert!(!discard_restart(&orchestrator));
    }
}
