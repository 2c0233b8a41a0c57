use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;

use ssh2::{ExtendedData, Session};
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::RemoteError;
use crate::remote::{Connector, Transport};

/// Password-authenticated SSH connector for the hypervisor.
#[derive(Debug, Clone)]
pub struct SshConnector {
    host: String,
    credentials: Credentials,
}

impl SshConnector {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
        }
    }
}

pub struct SshTransport {
    session: Session,
}

impl Connector for SshConnector {
    type Transport = SshTransport;

    fn connect(&self) -> Result<SshTransport, RemoteError> {
        info!(
            "connecting to {}@{}:{}",
            self.credentials.user, self.host, self.credentials.port
        );
        let tcp = TcpStream::connect((self.host.as_str(), self.credentials.port))
            .map_err(|e| transport_err(&format!("connect {}", self.host), e))?;
        let mut session = Session::new().map_err(|e| transport_err("session", e))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| transport_err("handshake", e))?;
        session
            .userauth_password(&self.credentials.user, &self.credentials.password)
            .map_err(|e| transport_err("authenticate", e))?;
        if !session.authenticated() {
            return Err(RemoteError::Transport(format!(
                "authentication as {} rejected",
                self.credentials.user
            )));
        }
        Ok(SshTransport { session })
    }
}

impl Transport for SshTransport {
    fn exec(&mut self, command: &str) -> Result<String, RemoteError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| transport_err("open channel", e))?;
        channel
            .handle_extended_data(ExtendedData::Merge)
            .map_err(|e| transport_err("merge stderr", e))?;
        channel
            .exec(command)
            .map_err(|e| transport_err("exec", e))?;
        let mut buf = Vec::new();
        channel
            .read_to_end(&mut buf)
            .map_err(|e| transport_err("read", e))?;
        channel
            .wait_close()
            .map_err(|e| transport_err("close channel", e))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut file = File::open(local)
            .map_err(|e| transport_err(&format!("open {}", local.display()), e))?;
        let size = file
            .metadata()
            .map_err(|e| transport_err(&format!("stat {}", local.display()), e))?
            .len();
        let mut channel = self
            .session
            .scp_send(Path::new(remote), 0o644, size, None)
            .map_err(|e| transport_err(&format!("scp {}", remote), e))?;
        io::copy(&mut file, &mut channel)
            .map_err(|e| transport_err(&format!("scp {}", remote), e))?;
        channel.send_eof().map_err(|e| transport_err("scp eof", e))?;
        channel.wait_eof().map_err(|e| transport_err("scp eof", e))?;
        channel.close().map_err(|e| transport_err("scp close", e))?;
        channel
            .wait_close()
            .map_err(|e| transport_err("scp close", e))?;
        Ok(())
    }

    fn close(&mut self) {
        debug!("closing ssh transport");
        let _ = self.session.disconnect(None, "esxivault done", None);
    }
}

fn transport_err(what: &str, err: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport(format!("{}: {}", what, err))
}
