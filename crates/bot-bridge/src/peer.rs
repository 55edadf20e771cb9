//! External decision process and its three streams
//!
//! A `Peer` owns the child process (if any), a line sink to its stdin, a line
//! source over its stdout, and an optional line source over its stderr. The
//! asynchronous discipline moves each stream into its own task with the
//! `take_*` methods; the process handle stays here until `terminate`.

use crate::transport::{LineSink, LineSource, PipeReader, PipeWriter};
use bot_bridge_core::{BridgeError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// How to launch the peer: `<interpreter> [unbuffered_flag] <script> [args...]`
#[derive(Debug, Clone)]
pub struct PeerCommand {
    /// Interpreter executable (default: python)
    pub interpreter: String,
    /// Flag that disables the peer's output buffering (default: -u)
    pub unbuffered_flag: Option<String>,
    /// Script path, resolved against the working directory then the
    /// directory of the running executable
    pub script: PathBuf,
    /// Extra arguments after the script
    pub args: Vec<String>,
}

impl Default for PeerCommand {
    fn default() -> Self {
        Self {
            interpreter: "python".into(),
            unbuffered_flag: Some("-u".into()),
            script: PathBuf::from("bot_logic.py"),
            args: Vec::new(),
        }
    }
}

impl PeerCommand {
    /// Locate the script on disk
    pub fn resolve_script(&self) -> Result<PathBuf> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        resolve_script_in(&self.script, exe_dir.as_deref())
    }
}

fn resolve_script_in(script: &Path, exe_dir: Option<&Path>) -> Result<PathBuf> {
    if script.is_file() {
        return std::path::absolute(script).map_err(|e| {
            BridgeError::Spawn(format!("Cannot resolve {}: {}", script.display(), e))
        });
    }
    if script.is_relative() {
        if let Some(candidate) = exe_dir.map(|dir| dir.join(script)) {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(BridgeError::Spawn(format!(
        "Cannot locate {}",
        script.display()
    )))
}

/// The external peer for one bridge
pub struct Peer {
    writer: Option<Box<dyn LineSink>>,
    reader: Option<Box<dyn LineSource>>,
    diagnostics: Option<Box<dyn LineSource>>,
    child: Option<Child>,
    terminated: bool,
}

impl Peer {
    /// Spawn the peer process with piped stdio
    pub fn spawn(command: &PeerCommand) -> Result<Self> {
        let script = command.resolve_script()?;

        let mut cmd = Command::new(&command.interpreter);
        if let Some(flag) = command.unbuffered_flag.as_deref().filter(|f| !f.is_empty()) {
            cmd.arg(flag);
        }
        cmd.arg(&script)
            .args(&command.args)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::Spawn(format!(
                "Failed to start {} {}: {}",
                command.interpreter,
                script.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Spawn("Peer stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Spawn("Peer stdout not captured".into()))?;
        let stderr = child.stderr.take();

        info!(
            "Started peer {} {} (pid {:?})",
            command.interpreter,
            script.display(),
            child.id()
        );

        Ok(Self {
            writer: Some(Box::new(PipeWriter(stdin))),
            reader: Some(Box::new(PipeReader::new(stdout))),
            diagnostics: stderr.map(|s| Box::new(PipeReader::new(s)) as Box<dyn LineSource>),
            child: Some(child),
            terminated: false,
        })
    }

    /// Peer over existing streams, with no process to manage
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            writer: Some(Box::new(PipeWriter(writer))),
            reader: Some(Box::new(PipeReader::new(reader))),
            diagnostics: None,
            child: None,
            terminated: false,
        }
    }

    /// Attach a diagnostic stream
    pub fn with_diagnostics<D>(mut self, diagnostics: D) -> Self
    where
        D: AsyncRead + Unpin + Send + 'static,
    {
        self.diagnostics = Some(Box::new(PipeReader::new(diagnostics)));
        self
    }

    /// Send one line to the peer
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BridgeError::Write("Peer input closed".into()))?;
        writer.write_line(line).await
    }

    /// Wait for the next line from the peer; `None` once its output closes
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        match self.reader.as_mut() {
            Some(reader) => reader.read_line().await,
            None => Ok(None),
        }
    }

    /// Next line from the peer only if already available
    pub async fn poll_available(&mut self) -> Result<Option<String>> {
        match self.reader.as_mut() {
            Some(reader) => reader.poll_line().await,
            None => Ok(None),
        }
    }

    /// Next diagnostic line only if already available
    ///
    /// The stream is dropped on end of stream or failure.
    pub async fn diagnostic_line(&mut self) -> Option<String> {
        let source = self.diagnostics.as_mut()?;
        match source.poll_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => None,
            Err(e) => {
                debug!("Peer diagnostic stream closed: {}", e);
                self.diagnostics = None;
                None
            }
        }
    }

    pub fn take_writer(&mut self) -> Option<Box<dyn LineSink>> {
        self.writer.take()
    }

    pub fn take_reader(&mut self) -> Option<Box<dyn LineSource>> {
        self.reader.take()
    }

    pub fn take_diagnostics(&mut self) -> Option<Box<dyn LineSource>> {
        self.diagnostics.take()
    }

    /// Close all streams and kill the process. Safe to call more than once.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        // Closing stdin first lets a well-behaved peer see EOF
        self.writer = None;
        self.reader = None;
        self.diagnostics = None;

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!("Peer kill skipped: {}", e);
            }
            match child.wait().await {
                Ok(status) => info!("Peer exited: {}", status),
                Err(e) => warn!("Failed to reap peer: {}", e),
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_missing_script_is_spawn_error() {
        let err = resolve_script_in(Path::new("no_such_bot_logic.py"), None).unwrap_err();
        assert!(matches!(err, BridgeError::Spawn(ref msg) if msg.contains("no_such_bot_logic.py")));
    }

    #[test]
    fn test_script_found_next_to_executable() {
        let dir = std::env::temp_dir().join(format!("bot-bridge-resolve-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("resolve_me.py");
        std::fs::write(&script, "print('hi')\n").unwrap();

        let resolved = resolve_script_in(Path::new("resolve_me.py"), Some(&dir)).unwrap();
        assert_eq!(resolved, script);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_spawn_fails_for_missing_interpreter() {
        let dir = std::env::temp_dir().join(format!("bot-bridge-interp-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("peer.py");
        std::fs::write(&script, "").unwrap();

        let command = PeerCommand {
            interpreter: "definitely-not-an-interpreter-4242".into(),
            script,
            ..Default::default()
        };
        let err = Peer::spawn(&command).err().expect("spawn should fail");
        assert!(matches!(err, BridgeError::Spawn(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_stream_peer_round_trip() {
        let (host_out, peer_in) = tokio::io::duplex(256);
        let (peer_out, host_in) = tokio::io::duplex(256);
        let mut peer = Peer::from_streams(host_in, host_out);

        let echo = tokio::spawn(async move {
            let mut lines = BufReader::new(peer_in).lines();
            let mut out = peer_out;
            while let Some(line) = lines.next_line().await.unwrap() {
                out.write_all(format!("echo {}\n", line).as_bytes()).await.unwrap();
            }
        });

        peer.write_line("ping").await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("echo ping"));
        assert_eq!(peer.poll_available().await.unwrap(), None);

        peer.terminate().await;
        peer.terminate().await;
        assert!(peer.is_terminated());
        assert!(matches!(
            peer.write_line("late").await,
            Err(BridgeError::Write(_))
        ));
        echo.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_peer_lifecycle() {
        let dir = std::env::temp_dir().join(format!("bot-bridge-proc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("peer.sh");
        std::fs::write(
            &script,
            "echo starting >&2\nwhile read line; do echo \"forward 10\"; done\n",
        )
        .unwrap();

        let command = PeerCommand {
            interpreter: "sh".into(),
            unbuffered_flag: None,
            script,
            args: Vec::new(),
        };
        let mut peer = Peer::spawn(&command).unwrap();

        peer.write_line(r#"{"event":"connected","round":1}"#).await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("forward 10"));

        let mut diagnostic = None;
        for _ in 0..50 {
            diagnostic = peer.diagnostic_line().await;
            if diagnostic.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(diagnostic.as_deref(), Some("starting"));

        peer.terminate().await;
        assert!(peer.is_terminated());
        assert_eq!(peer.read_line().await.unwrap(), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
