use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::archive::name::{parse_timestamp, ARCHIVE_SUFFIX};
use crate::archive::ArchiveStore;
use crate::backup::report::{parse_report, BackupResult, BACKUP_DIR_NAMING_KEY};
use crate::backup::script::{render_script, REMOTE_SCRIPT_NAME};
use crate::config::Profile;
use crate::error::{RemoteError, Result, VaultError};
use crate::remote::{Connector, FileTransfer, RemoteSession};
use crate::util::paths::remote_join;

const NO_SUCH_FILE_MARKER: &str = "No such file or directory";
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug)]
pub enum BackupOutcome {
    Completed {
        archive: PathBuf,
        result: BackupResult,
        download_time: Duration,
    },
    ScriptFailed {
        result: BackupResult,
    },
}

impl BackupOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, BackupOutcome::Completed { .. })
    }
}

/// One VM's end-to-end backup: script upload and run, remote tar, download,
/// remote cleanup.
pub struct ArchivePipeline<'a, C: Connector, F: FileTransfer> {
    profile: &'a Profile,
    session: &'a mut RemoteSession<C>,
    transfer: &'a mut F,
    store: &'a ArchiveStore,
}

impl<'a, C: Connector, F: FileTransfer> ArchivePipeline<'a, C, F> {
    pub fn new(
        profile: &'a Profile,
        session: &'a mut RemoteSession<C>,
        transfer: &'a mut F,
        store: &'a ArchiveStore,
    ) -> Self {
        Self {
            profile,
            session,
            transfer,
            store,
        }
    }

    pub fn backup_vm(&mut self, vm: &str) -> Result<BackupOutcome> {
        let result = self.run_remote_backup(vm)?;
        info!("ghettoVCB output:\n{}", result);
        for warning in &result.warnings {
            warn!("ghettoVCB: {}", warning);
        }
        if !result.final_status {
            warn!("backup script reported failure for VM \"{}\"", vm);
            return Ok(BackupOutcome::ScriptFailed { result });
        }

        let naming = result.backup_dir_naming().ok_or_else(|| {
            VaultError::Report(format!("ghettoVCB output has no {}", BACKUP_DIR_NAMING_KEY))
        })?;
        if parse_timestamp(naming).is_none() {
            return Err(VaultError::Report(format!(
                "{} {:?} is not a YYYY-MM-DD_HH-MM-SS timestamp",
                BACKUP_DIR_NAMING_KEY, naming
            )));
        }
        let backup_dir = format!("{}-{}", vm, naming);
        let remote_archive = self.archive_remote_backup(vm, &backup_dir)?;

        let downloaded = self.download_archive(&remote_archive);
        self.remove_remote_file(&remote_archive);
        let (archive, download_time) = downloaded?;
        info!("cleaned up archive from remote host");
        Ok(BackupOutcome::Completed {
            archive,
            result,
            download_time,
        })
    }

    /// Uploads, runs and removes the backup script, returning its parsed log.
    pub fn run_remote_backup(&mut self, vm: &str) -> Result<BackupResult> {
        let local_script =
            render_script(&self.profile.script_template, &self.profile.remote_backup_dir)?;
        let remote_script = remote_join(&self.profile.remote_workdir, REMOTE_SCRIPT_NAME);

        self.session.upload(local_script.path(), &remote_script)?;
        let output = self
            .session
            .execute(&format!("chmod +x {}", remote_script))
            .and_then(|_| {
                local_script
                    .close()
                    .map_err(|e| RemoteError::Transport(format!("remove local script: {}", e)))?;
                info!("running backup script for VM \"{}\"", vm);
                self.session
                    .execute(&format!("{} -m {}", remote_script, vm))
            });
        self.remove_remote_file(&remote_script);
        Ok(parse_report(&output?))
    }

    /// Tars `<remote_backup_dir>/<vm>/<backup_dir>` in place and returns the
    /// remote archive path.
    pub fn archive_remote_backup(&mut self, vm: &str, backup_dir: &str) -> Result<String> {
        let remote_workdir = remote_join(&self.profile.remote_backup_dir, vm);
        let remote_archive = format!("{}{}", backup_dir, ARCHIVE_SUFFIX);
        let tar_cmd = format!(
            "cd \"{}\"; tar -cz -f \"{}\" \"{}\"",
            remote_workdir, remote_archive, backup_dir
        );
        let remote_path = remote_join(&remote_workdir, &remote_archive);
        let output = match self.session.execute(&tar_cmd) {
            Ok(output) => output,
            Err(RemoteError::CommandFailed { output, .. }) if output.contains(NO_SUCH_FILE_MARKER) => {
                self.remove_remote_file(&remote_path);
                return Err(RemoteError::ArchiveCreation(output).into());
            }
            Err(err) => {
                self.remove_remote_file(&remote_path);
                return Err(err.into());
            }
        };
        if output.contains(NO_SUCH_FILE_MARKER) {
            self.remove_remote_file(&remote_path);
            return Err(RemoteError::ArchiveCreation(output).into());
        }
        info!("created remote archive {}", remote_path);
        Ok(remote_path)
    }

    /// Downloads into the archive store under the remote file name.
    pub fn download_archive(&mut self, remote_path: &str) -> Result<(PathBuf, Duration)> {
        let file_name = remote_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| VaultError::message(format!("no file name in {}", remote_path)))?;
        fs::create_dir_all(self.store.dir())?;
        let dest = self.store.archive_path(file_name);
        let partial = self
            .store
            .archive_path(&format!("{}{}", file_name, PARTIAL_SUFFIX));

        let started = Instant::now();
        let bytes = match self.transfer.download(remote_path, &partial) {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&partial);
                return Err(err.into());
            }
        };
        fs::rename(&partial, &dest)?;
        let elapsed = started.elapsed();
        info!(
            "backup archive \"{}\" downloaded to \"{}\" in {:.3} seconds ({} bytes)",
            remote_path,
            self.store.dir().display(),
            elapsed.as_secs_f64(),
            bytes
        );
        Ok((dest, elapsed))
    }

    /// Best-effort removal; a failure is logged and left for the operator.
    fn remove_remote_file(&mut self, remote_path: &str) {
        if let Err(err) = self.session.execute(&format!("rm -f \"{}\"", remote_path)) {
            warn!("failed to remove remote file {}: {}", remote_path, err);
        }
    }
}
