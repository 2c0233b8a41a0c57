use std::path::Path;

use tracing::debug;

use crate::error::RemoteError;

pub mod ssh;
pub mod transfer;

pub use ssh::SshConnector;
pub use transfer::{FileTransfer, FtpTransfer};

const EXIT_CODE_SENTINEL: &str = "exit_code=";

/// An established, authenticated connection to the hypervisor.
pub trait Transport {
    /// Runs `command` on a fresh channel and returns stdout and stderr combined.
    fn exec(&mut self, command: &str) -> Result<String, RemoteError>;
    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError>;
    fn close(&mut self);
}

pub trait Connector {
    type Transport: Transport;

    fn connect(&self) -> Result<Self::Transport, RemoteError>;
}

/// Lazily connected command session; the transport is opened on first use,
/// reused for every later command and released on `close` or drop.
pub struct RemoteSession<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
}

impl<C: Connector> RemoteSession<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            transport: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&mut self) -> Result<&mut C::Transport, RemoteError> {
        if self.transport.is_none() {
            self.transport = Some(self.connector.connect()?);
        }
        self.transport
            .as_mut()
            .ok_or_else(|| RemoteError::Transport("not connected".to_string()))
    }

    /// Runs `command` and returns its output once the echoed exit status is zero.
    pub fn execute(&mut self, command: &str) -> Result<String, RemoteError> {
        debug!("ssh: {}", command);
        let raw = self
            .transport()?
            .exec(&format!("{} ; echo {}$?", command, EXIT_CODE_SENTINEL))?;
        let (code, output) = split_exit_code(&raw).ok_or_else(|| RemoteError::MalformedResponse {
            command: command.to_string(),
            output: raw.clone(),
        })?;
        if code != 0 {
            debug!("ssh command \"{}\" failed with output:\n{}", command, output);
            return Err(RemoteError::CommandFailed {
                command: command.to_string(),
                code,
                output,
            });
        }
        Ok(output)
    }

    pub fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        debug!("scp: {} -> {}", local.display(), remote);
        self.transport()?.upload(local, remote)
    }

    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }
}

impl<C: Connector> Drop for RemoteSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Splits `<output>\nexit_code=<n>` into `(n, output)`.
fn split_exit_code(raw: &str) -> Option<(i32, String)> {
    let lines: Vec<&str> = raw.trim().lines().collect();
    let (last, rest) = lines.split_last()?;
    let code = last.trim().strip_prefix(EXIT_CODE_SENTINEL)?.parse().ok()?;
    Some((code, rest.join("\n")))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    /// Everything a fake transport saw, shared with the test body.
    #[derive(Debug, Default)]
    pub struct Journal {
        pub connects: usize,
        pub closes: usize,
        pub commands: Vec<String>,
        pub uploads: Vec<(String, String)>,
        pub responses: VecDeque<Result<String, RemoteError>>,
    }

    #[derive(Clone, Default)]
    pub struct FakeConnector {
        pub journal: Rc<RefCell<Journal>>,
        pub refuse: bool,
    }

    impl FakeConnector {
        pub fn respond(&self, raw: &str) -> &Self {
            self.journal
                .borrow_mut()
                .responses
                .push_back(Ok(raw.to_string()));
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.journal.borrow().commands.clone()
        }
    }

    pub struct FakeTransport {
        journal: Rc<RefCell<Journal>>,
    }

    impl Connector for FakeConnector {
        type Transport = FakeTransport;

        fn connect(&self) -> Result<FakeTransport, RemoteError> {
            if self.refuse {
                return Err(RemoteError::Transport("connection refused".to_string()));
            }
            self.journal.borrow_mut().connects += 1;
            Ok(FakeTransport {
                journal: Rc::clone(&self.journal),
            })
        }
    }

    impl Transport for FakeTransport {
        fn exec(&mut self, command: &str) -> Result<String, RemoteError> {
            let mut journal = self.journal.borrow_mut();
            journal.commands.push(command.to_string());
            journal
                .responses
                .pop_front()
                .unwrap_or_else(|| Ok("exit_code=0".to_string()))
        }

        fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
            let contents = std::fs::read_to_string(local)
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            self.journal
                .borrow_mut()
                .uploads
                .push((remote.to_string(), contents));
            Ok(())
        }

        fn close(&mut self) {
            self.journal.borrow_mut().closes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeConnector;
    use super::*;

    #[test]
    fn zero_exit_strips_sentinel() {
        let fake = FakeConnector::default();
        fake.respond("line one\nline two\nexit_code=0\n");
        let mut session = RemoteSession::new(fake.clone());
        let out = session.execute("ls /tmp").expect("execute");
        assert_eq!(out, "line one\nline two");
        assert_eq!(fake.commands(), vec!["ls /tmp ; echo exit_code=$?".to_string()]);
    }

    #[test]
    fn non_zero_exit_is_command_failure() {
        let fake = FakeConnector::default();
        fake.respond("rm: cannot remove 'x': No such file or directory\nexit_code=1");
        let mut session = RemoteSession::new(fake.clone());
        match session.execute("rm x") {
            Err(RemoteError::CommandFailed { code, output, command }) => {
                assert_eq!(code, 1);
                assert_eq!(command, "rm x");
                assert_eq!(output, "rm: cannot remove 'x': No such file or directory");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn negative_exit_code_is_parsed() {
        let fake = FakeConnector::default();
        fake.respond("exit_code=-1");
        let mut session = RemoteSession::new(fake);
        assert!(matches!(
            session.execute("true"),
            Err(RemoteError::CommandFailed { code: -1, .. })
        ));
    }

    #[test]
    fn missing_sentinel_is_malformed() {
        let fake = FakeConnector::default();
        fake.respond("hello\n");
        fake.respond("");
        fake.respond("exit_code=abc");
        let mut session = RemoteSession::new(fake);
        for _ in 0..3 {
            assert!(matches!(
                session.execute("echo hello"),
                Err(RemoteError::MalformedResponse { .. })
            ));
        }
    }

    #[test]
    fn transport_is_reused_and_closed_once() {
        let fake = FakeConnector::default();
        {
            let mut session = RemoteSession::new(fake.clone());
            assert!(!session.is_connected());
            session.execute("true").unwrap();
            session.execute("true").unwrap();
            assert!(session.is_connected());
            session.close();
            session.close();
            assert!(!session.is_connected());
        }
        let journal = fake.journal.borrow();
        assert_eq!(journal.connects, 1);
        assert_eq!(journal.closes, 1);
        assert_eq!(journal.commands.len(), 2);
    }

    #[test]
    fn drop_closes_transport() {
        let fake = FakeConnector::default();
        {
            let mut session = RemoteSession::new(fake.clone());
            session.execute("true").unwrap();
        }
        assert_eq!(fake.journal.borrow().closes, 1);
    }

    #[test]
    fn connect_failure_is_transport_error() {
        let fake = FakeConnector {
            refuse: true,
            ..FakeConnector::default()
        };
        let mut session = RemoteSession::new(fake);
        assert!(matches!(
            session.execute("true"),
            Err(RemoteError::Transport(_))
        ));
        assert!(!session.is_connected());
    }
}
