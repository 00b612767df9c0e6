//! gdb child process lifecycle.

use crate::error::Error;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use os_pipe::{PipeReader, PipeWriter};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// How long a terminated child gets to exit before the kill is escalated.
const TERM_GRACE: Duration = Duration::from_millis(100);

pub(crate) struct SpawnedGdb {
    pub process: GdbProcess,
    pub to_gdb: PipeWriter,
    pub from_gdb: PipeReader,
}

/// Running gdb child attached to a pair of pipes.
pub(crate) struct GdbProcess {
    child: Child,
}

impl GdbProcess {
    /// Spawn the debugger with its stdin/stdout redirected to fresh pipes.
    pub fn spawn(program: &str, args: &[String]) -> Result<SpawnedGdb, Error> {
        let (their_stdin, to_gdb) = os_pipe::pipe().map_err(Error::PipeCreate)?;
        let (from_gdb, their_stdout) = os_pipe::pipe().map_err(Error::PipeCreate)?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::from(their_stdin))
            .stdout(Stdio::from(their_stdout))
            .stderr(Stdio::null())
            .spawn()
            .map_err(Error::Spawn)?;

        Ok(SpawnedGdb {
            process: GdbProcess { child },
            to_gdb,
            from_gdb,
        })
    }

    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Non-blocking reap check.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the child to terminate, escalate to SIGKILL after a short grace
    /// period, and reap it. Safe to call on an already exited child.
    pub fn shutdown(&mut self) {
        if !self.is_alive() {
            return;
        }

        if let Err(e) = kill(self.pid(), Signal::SIGTERM) {
            log::warn!(target: "gdbmi", "SIGTERM delivery error: {e}");
        }
        let deadline = Instant::now() + TERM_GRACE;
        while Instant::now() < deadline {
            if !self.is_alive() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        log::warn!(target: "gdbmi", "debugger ignored SIGTERM, escalating to SIGKILL");
        if let Err(e) = self.child.kill() {
            log::warn!(target: "gdbmi", "SIGKILL delivery error: {e}");
        }
        if let Err(e) = self.child.wait() {
            log::warn!(target: "gdbmi", "fail to reap the debugger process: {e}");
        }
    }
}
