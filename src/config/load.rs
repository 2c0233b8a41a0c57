use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::model::{
    Config, Credentials, CredentialsConfig, EmailConfig, EmailSettings, Profile, ProfileConfig,
    RuntimeConfig, VmConfig, VmConfigEntry,
};
use crate::error::{ConfigError, Result, VaultError};
use crate::types::{parse_period, TimeWindow};
use crate::util::lock::LOCK_FILE;
use crate::util::paths::is_safe_name;

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_FTP_PORT: u16 = 21;

pub fn load_config(path: &Path, profile_name: &str) -> Result<RuntimeConfig> {
    let mut contents = String::new();
    File::open(path)
        .map_err(|e| VaultError::message(format!("open {}: {}", path.display(), e)))?
        .read_to_string(&mut contents)
        .map_err(|e| VaultError::message(format!("read {}: {}", path.display(), e)))?;
    let cfg: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    parse_runtime(cfg, profile_name)
}

fn parse_runtime(mut cfg: Config, profile_name: &str) -> Result<RuntimeConfig> {
    let raw = cfg
        .profiles
        .remove(profile_name)
        .ok_or_else(|| ConfigError::UnknownProfile(profile_name.to_string()))?;
    let profile = parse_profile(profile_name, raw)
        .map_err(|e| ConfigError::Invalid(format!("profile {}: {}", profile_name, e)))?;
    Ok(RuntimeConfig {
        lock_file: PathBuf::from(cfg.lock_file.unwrap_or_else(|| LOCK_FILE.to_string())),
        profile,
    })
}

fn parse_profile(name: &str, raw: ProfileConfig) -> std::result::Result<Profile, String> {
    require("host", &raw.host)?;
    require("archiveDir", &raw.archive_dir)?;
    require("remoteWorkdir", &raw.remote_workdir)?;
    require("remoteBackupDir", &raw.remote_backup_dir)?;
    require("scriptTemplate", &raw.script_template)?;

    if raw.vms.is_empty() {
        return Err("no vms configured".to_string());
    }
    let mut vms = BTreeMap::new();
    for (vm_name, entry) in &raw.vms {
        if !is_safe_name(vm_name) {
            return Err(format!(
                "vm {} name must use only letters, digits, '.', '-', '_'",
                vm_name
            ));
        }
        let vm = resolve_vm(entry, &raw.default_vm).map_err(|e| format!("vm {}: {}", vm_name, e))?;
        vms.insert(vm_name.clone(), vm);
    }

    let windows = match &raw.windows {
        None => vec![TimeWindow::all_day()],
        Some(list) => list
            .iter()
            .map(|w| w.parse::<TimeWindow>())
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    let email = match raw.email {
        Some(email) if email.enabled => Some(parse_email(email)?),
        _ => None,
    };

    Ok(Profile {
        name: name.to_string(),
        host: raw.host,
        ssh: parse_credentials("ssh", raw.ssh, DEFAULT_SSH_PORT)?,
        ftp: parse_credentials("ftp", raw.ftp, DEFAULT_FTP_PORT)?,
        archive_dir: PathBuf::from(raw.archive_dir),
        remote_workdir: raw.remote_workdir,
        remote_backup_dir: raw.remote_backup_dir,
        script_template: PathBuf::from(raw.script_template),
        vms,
        windows,
        email,
    })
}

fn resolve_vm(entry: &VmConfigEntry, default: &VmConfigEntry) -> std::result::Result<VmConfig, String> {
    let period = entry
        .period
        .as_deref()
        .or(default.period.as_deref())
        .ok_or_else(|| "period is required (set it on the vm or in defaultVm)".to_string())?;
    let rotation_count = entry
        .rotation_count
        .or(default.rotation_count)
        .ok_or_else(|| "rotationCount is required (set it on the vm or in defaultVm)".to_string())?;
    if rotation_count == 0 {
        return Err("rotationCount must be at least 1".to_string());
    }
    Ok(VmConfig {
        period: parse_period(period)?,
        rotation_count,
    })
}

fn parse_credentials(
    section: &str,
    raw: CredentialsConfig,
    default_port: u16,
) -> std::result::Result<Credentials, String> {
    require(&format!("{}.user", section), &raw.user)?;
    Ok(Credentials {
        port: raw.port.unwrap_or(default_port),
        user: raw.user,
        password: raw.password,
    })
}

fn parse_email(raw: EmailConfig) -> std::result::Result<EmailSettings, String> {
    require("email.smtpHost", &raw.smtp_host)?;
    require("email.user", &raw.user)?;
    require("email.from", &raw.from)?;
    if raw.recipients.is_empty() {
        return Err("email.recipients must list at least one address".to_string());
    }
    Ok(EmailSettings {
        smtp_host: raw.smtp_host,
        smtp_port: raw.smtp_port,
        user: raw.user,
        password: raw.password,
        from: raw.from,
        recipients: raw.recipients,
    })
}

fn require(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
lockFile: "/tmp/esxivault-test.pid"
profiles:
  lab:
    host: "10.0.0.20"
    ssh: { user: "root", password: "secret" }
    ftp: { port: 2121, user: "dummy", password: "dummypass" }
    archiveDir: "/mnt/backups/ESXi-archives"
    remoteWorkdir: "/tmp"
    remoteBackupDir: "/vmfs/volumes/Backup-LUN/BackupsDir"
    scriptTemplate: "/etc/esxivault/ghettovcb.sh.tmpl"
    defaultVm: { period: "7d", rotationCount: 2 }
    vms:
      DummyVM-1: {}
      DummyVM-2: { period: "1d12h", rotationCount: 5 }
    windows: ["23:00-23:59:59", "00:00-04:00"]
    email:
      smtpHost: "smtp.gmail.com"
      user: "me@example.com"
      password: "app"
      from: "ESXi backup <me@example.com>"
      recipients: ["ops@example.com"]
"#;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(yaml.as_bytes()).expect("write");
        file
    }

    #[test]
    fn load_profile_with_defaults_merged() {
        let file = write_config(YAML);
        let cfg = load_config(file.path(), "lab").expect("load");
        let profile = cfg.profile;
        assert_eq!(cfg.lock_file, PathBuf::from("/tmp/esxivault-test.pid"));
        assert_eq!(profile.ssh.port, 22);
        assert_eq!(profile.ftp.port, 2121);
        assert_eq!(
            profile.vms["DummyVM-1"],
            VmConfig {
                period: Duration::days(7),
                rotation_count: 2
            }
        );
        assert_eq!(profile.vms["DummyVM-2"].period, Duration::hours(36));
        assert_eq!(profile.vms["DummyVM-2"].rotation_count, 5);
        assert_eq!(profile.windows.len(), 2);
        assert_eq!(
            profile.windows[1].end,
            NaiveTime::from_hms_opt(4, 0, 0).unwrap()
        );
        let email = profile.email.expect("email");
        assert_eq!(email.smtp_port, 587);
        assert_eq!(email.recipients, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn unknown_profile_is_config_error() {
        let file = write_config(YAML);
        let err = load_config(file.path(), "no-such-profile").unwrap_err();
        assert!(matches!(err, VaultError::Config(ConfigError::UnknownProfile(_))));
        assert_eq!(err.to_string(), "no such profile \"no-such-profile\"");
    }

    #[test]
    fn missing_period_is_rejected_at_load() {
        let yaml = YAML.replace("defaultVm: { period: \"7d\", rotationCount: 2 }", "defaultVm: { rotationCount: 2 }");
        let file = write_config(&yaml);
        let err = load_config(file.path(), "lab").unwrap_err();
        assert!(err.to_string().contains("vm DummyVM-1: period is required"));
    }

    #[test]
    fn zero_rotation_count_is_rejected() {
        let yaml = YAML.replace("rotationCount: 5", "rotationCount: 0");
        let file = write_config(&yaml);
        let err = load_config(file.path(), "lab").unwrap_err();
        assert!(err.to_string().contains("rotationCount must be at least 1"));
    }

    #[test]
    fn unsafe_vm_name_is_rejected() {
        let yaml = YAML.replace("DummyVM-1: {}", "\"Dummy VM\": {}");
        let file = write_config(&yaml);
        assert!(load_config(file.path(), "lab").is_err());
    }

    #[test]
    fn windows_default_to_all_day_and_disabled_email_is_dropped() {
        let yaml = YAML
            .replace("    windows: [\"23:00-23:59:59\", \"00:00-04:00\"]\n", "")
            .replace("    email:\n", "    email:\n      enabled: false\n");
        let file = write_config(&yaml);
        let profile = load_config(file.path(), "lab").expect("load").profile;
        assert_eq!(profile.windows, vec![TimeWindow::all_day()]);
        assert!(profile.email.is_none());
    }
}
