use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Duration;
use serde::Deserialize;

use crate::types::TimeWindow;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default, rename = "lockFile")]
    pub lock_file: Option<String>,
    pub profiles: BTreeMap<String, ProfileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub host: String,
    pub ssh: CredentialsConfig,
    pub ftp: CredentialsConfig,
    #[serde(rename = "archiveDir")]
    pub archive_dir: String,
    #[serde(rename = "remoteWorkdir")]
    pub remote_workdir: String,
    #[serde(rename = "remoteBackupDir")]
    pub remote_backup_dir: String,
    #[serde(rename = "scriptTemplate")]
    pub script_template: String,
    #[serde(default, rename = "defaultVm")]
    pub default_vm: VmConfigEntry,
    pub vms: BTreeMap<String, VmConfigEntry>,
    #[serde(default)]
    pub windows: Option<Vec<String>>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct VmConfigEntry {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default, rename = "rotationCount")]
    pub rotation_count: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "smtpHost")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port", rename = "smtpPort")]
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Validated profile; every field needed by a run is present.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub host: String,
    pub ssh: Credentials,
    pub ftp: Credentials,
    pub archive_dir: PathBuf,
    pub remote_workdir: String,
    pub remote_backup_dir: String,
    pub script_template: PathBuf,
    pub vms: BTreeMap<String, VmConfig>,
    pub windows: Vec<TimeWindow>,
    pub email: Option<EmailSettings>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    pub period: Duration,
    pub rotation_count: usize,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub lock_file: PathBuf,
    pub profile: Profile,
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}
