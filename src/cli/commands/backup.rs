use std::path::Path;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::backup::{run_profile, RunSummary};
use crate::config::load_config;
use crate::error::{Result, VaultError};
use crate::logging::LogCapture;
use crate::notify::{report_subject, send_report};
use crate::remote::{FtpTransfer, SshConnector};
use crate::schedule::SystemClock;
use crate::types::RunMode;
use crate::util::lock::InstanceLock;

pub fn run_backup_command(
    config_path: &Path,
    profile_name: &str,
    run_mode: RunMode,
    capture: &LogCapture,
) -> Result<()> {
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));

    let cfg = load_config(config_path, profile_name)?;
    let lock = InstanceLock::acquire(&cfg.lock_file)?;
    debug!("holding lock {}", lock.path().display());
    let profile = &cfg.profile;

    let connector = SshConnector::new(profile.host.clone(), profile.ssh.clone());
    let mut transfer = FtpTransfer::new(profile.host.clone(), profile.ftp.clone());
    let summary = run_profile(profile, &SystemClock, connector, &mut transfer, run_mode)?;

    let RunSummary::Attempted { vm, outcome } = summary else {
        return Ok(());
    };
    let succeeded = matches!(&outcome, Ok(o) if o.succeeded());
    if let Some(email) = &profile.email {
        let subject = report_subject(&vm, succeeded);
        if let Err(err) = send_report(email, &subject, &capture.contents()) {
            warn!("sending report failed: {}", err);
        }
    }

    match outcome {
        Ok(o) if o.succeeded() => {
            info!("backup run complete");
            Ok(())
        }
        Ok(_) => Err(VaultError::ScriptFailed(vm)),
        Err(err) => Err(err),
    }
}
