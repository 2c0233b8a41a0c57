pub mod backup;
pub mod status;

use crate::error::{RemoteError, VaultError};

pub fn exit_code_for(err: &VaultError) -> i32 {
    match err {
        VaultError::ScriptFailed(_) => 1,
        VaultError::AlreadyRunning(_) => 3,
        VaultError::Report(_) => 12,
        VaultError::Remote(remote) => match remote {
            RemoteError::Transport(_) => 10,
            RemoteError::CommandFailed { .. } => 11,
            RemoteError::MalformedResponse { .. } => 12,
            RemoteError::ArchiveCreation(_) => 13,
            RemoteError::Transfer(_) => 14,
        },
        VaultError::Message(_) | VaultError::Config(_) | VaultError::Io(_) => 2,
    }
}

pub fn exit_for_error(err: &VaultError) -> ! {
    println!("{}", err);
    std::process::exit(exit_code_for(err));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn remote_failures_get_distinct_codes() {
        let transport = VaultError::from(RemoteError::Transport("refused".into()));
        let tar = VaultError::from(RemoteError::ArchiveCreation("no space".into()));
        let ftp = VaultError::from(RemoteError::Transfer("550".into()));
        assert_eq!(exit_code_for(&transport), 10);
        assert_eq!(exit_code_for(&tar), 13);
        assert_eq!(exit_code_for(&ftp), 14);
    }

    #[test]
    fn config_and_lock_errors() {
        let cfg = VaultError::from(ConfigError::UnknownProfile("lab".into()));
        assert_eq!(exit_code_for(&cfg), 2);
        assert_eq!(exit_code_for(&VaultError::AlreadyRunning("pid 7".into())), 3);
        assert_eq!(exit_code_for(&VaultError::ScriptFailed("DummyVM-1".into())), 1);
    }
}
