use chrono::Timelike;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveStore;
use crate::config::Profile;
use crate::error::{Result, VaultError};
use crate::remote::{Connector, FileTransfer, RemoteSession};
use crate::schedule::{is_within_window, next_vm_to_backup, Clock};
use crate::types::RunMode;

pub mod pipeline;
pub mod report;
pub mod script;

pub use pipeline::{ArchivePipeline, BackupOutcome};
pub use report::{parse_report, BackupResult};

#[derive(Debug)]
pub enum RunSummary {
    OutsideWindow,
    NothingToDo,
    DryRun {
        vm: String,
    },
    Attempted {
        vm: String,
        outcome: Result<BackupOutcome>,
    },
}

/// One scheduled invocation for `profile`: gate, select, back up at most one
/// VM, then rotate archives of every configured VM.
///
/// Errors from the backup attempt itself are carried in
/// [`RunSummary::Attempted`]; only failures before any remote work are
/// returned as `Err`.
pub fn run_profile<K, C, F>(
    profile: &Profile,
    clock: &K,
    connector: C,
    transfer: &mut F,
    run_mode: RunMode,
) -> Result<RunSummary>
where
    K: Clock,
    C: Connector,
    F: FileTransfer,
{
    info!("running backup profile \"{}\"", profile.name);
    let now = clock.now();
    let time_of_day = now.time().with_nanosecond(0).unwrap_or(now.time());
    if !is_within_window(time_of_day, &profile.windows) {
        debug!("out of time range; skipping backup run for profile");
        return Ok(RunSummary::OutsideWindow);
    }

    let store = ArchiveStore::new(&profile.archive_dir);
    let Some(vm) = next_vm_to_backup(&profile.vms, &store, now)? else {
        info!("no next VM to backup - nothing to do");
        return Ok(RunSummary::NothingToDo);
    };

    if run_mode.dry_run {
        info!("dry-run: would back up VM \"{}\"", vm);
        trim_archives(profile, &store, run_mode);
        return Ok(RunSummary::DryRun { vm });
    }

    info!("running backup for VM \"{}\"", vm);
    let mut session = RemoteSession::new(connector);
    let outcome = ArchivePipeline::new(profile, &mut session, transfer, &store).backup_vm(&vm);
    session.close();

    match &outcome {
        Ok(BackupOutcome::Completed { archive, .. }) => {
            info!("backup of VM \"{}\" stored as {}", vm, archive.display());
        }
        Ok(BackupOutcome::ScriptFailed { .. }) => {
            error!("backup script failed for VM \"{}\"", vm);
        }
        Err(err) => log_failure(&vm, err),
    }

    trim_archives(profile, &store, run_mode);
    Ok(RunSummary::Attempted { vm, outcome })
}

/// Applies rotation to every configured VM; failures are logged, not fatal.
pub fn trim_archives(profile: &Profile, store: &ArchiveStore, run_mode: RunMode) {
    for (vm, config) in &profile.vms {
        if let Err(err) = store.trim(vm, config.rotation_count, run_mode) {
            warn!("trimming archives of VM \"{}\" failed: {}", vm, err);
        }
    }
}

fn log_failure(vm: &str, err: &VaultError) {
    error!("backup of VM \"{}\" failed: {}", vm, err);
    if let VaultError::Remote(remote) = err {
        if let Some(output) = remote.output().filter(|o| !o.is_empty()) {
            error!("captured output:\n{}", output);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    use chrono::Duration;

    use crate::config::{Credentials, Profile, VmConfig};
    use crate::types::TimeWindow;

    /// Profile rooted in `dir`, with a rendered-script template and one weekly VM.
    pub fn test_profile(dir: &Path) -> Profile {
        let template = dir.join("ghettovcb.sh.tmpl");
        fs::write(&template, "VM_BACKUP_VOLUME=$RemoteBackupDir\n").expect("template");
        let creds = Credentials {
            port: 22,
            user: "root".to_string(),
            password: "secret".to_string(),
        };
        Profile {
            name: "lab".to_string(),
            host: "10.0.0.20".to_string(),
            ssh: creds.clone(),
            ftp: creds,
            archive_dir: dir.join("archives"),
            remote_workdir: "/tmp".to_string(),
            remote_backup_dir: "/vmfs/volumes/Backup-LUN/BackupsDir".to_string(),
            script_template: template,
            vms: BTreeMap::from([(
                "DummyVM-1".to_string(),
                VmConfig {
                    period: Duration::days(7),
                    rotation_count: 2,
                },
            )]),
            windows: vec![TimeWindow::all_day()],
            email: None,
        }
    }
}
