use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Remote(RemoteError),
    #[error("{0}")]
    AlreadyRunning(String),
    #[error("backup report: {0}")]
    Report(String),
    #[error("backup script reported failure for VM \"{0}\"")]
    ScriptFailed(String),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("no such profile \"{0}\"")]
    UnknownProfile(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("ssh transport: {0}")]
    Transport(String),
    #[error("remote command `{command}` failed with code {code}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },
    #[error("remote command `{command}` returned no exit status")]
    MalformedResponse { command: String, output: String },
    #[error("tar command failed:\n{0}")]
    ArchiveCreation(String),
    #[error("file transfer: {0}")]
    Transfer(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    pub fn message(msg: impl Into<String>) -> Self {
        VaultError::Message(msg.into())
    }
}

impl From<ConfigError> for VaultError {
    fn from(err: ConfigError) -> Self {
        VaultError::Config(err)
    }
}

impl From<RemoteError> for VaultError {
    fn from(err: RemoteError) -> Self {
        VaultError::Remote(err)
    }
}

impl RemoteError {
    /// Output captured from the remote side, when the error carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RemoteError::CommandFailed { output, .. }
            | RemoteError::MalformedResponse { output, .. }
            | RemoteError::ArchiveCreation(output) => Some(output),
            RemoteError::Transport(_) | RemoteError::Transfer(_) => None,
        }
    }
}
