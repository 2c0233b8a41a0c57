use std::fs::File;
use std::io;
use std::path::Path;

use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::debug;

use crate::config::Credentials;
use crate::error::RemoteError;

/// Secondary channel used to pull finished archives off the hypervisor.
pub trait FileTransfer {
    /// Copies `remote` into `dest`, returning the number of bytes written.
    fn download(&mut self, remote: &str, dest: &Path) -> Result<u64, RemoteError>;
}

#[derive(Debug, Clone)]
pub struct FtpTransfer {
    host: String,
    credentials: Credentials,
}

impl FtpTransfer {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
        }
    }
}

impl FileTransfer for FtpTransfer {
    fn download(&mut self, remote: &str, dest: &Path) -> Result<u64, RemoteError> {
        debug!("ftp: RETR {} -> {}", remote, dest.display());
        let mut ftp = FtpStream::connect((self.host.as_str(), self.credentials.port))
            .map_err(|e| transfer_err(&format!("connect {}", self.host), e))?;
        ftp.login(&self.credentials.user, &self.credentials.password)
            .map_err(|e| transfer_err("login", e))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| transfer_err("binary mode", e))?;
        let mut file = File::create(dest)
            .map_err(|e| transfer_err(&format!("create {}", dest.display()), e))?;
        let mut stream = ftp
            .retr_as_stream(remote)
            .map_err(|e| transfer_err(&format!("RETR {}", remote), e))?;
        let copied = io::copy(&mut stream, &mut file);
        let finalized = ftp.finalize_retr_stream(stream);
        let bytes = copied.map_err(|e| transfer_err(&format!("RETR {}", remote), e))?;
        finalized.map_err(|e| transfer_err(&format!("RETR {}", remote), e))?;
        let _ = ftp.quit();
        Ok(bytes)
    }
}

fn transfer_err(what: &str, err: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transfer(format!("{}: {}", what, err))
}
