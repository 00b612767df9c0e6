//! Session: owns the gdb child process and speaks the MI dialog with it.
//!
//! All interaction happens on the caller's thread: [`Session::poll`] drains
//! whatever the pipe holds right now, [`Session::recv`] blocks until gdb
//! finishes the current response, and registered callbacks run synchronously
//! inside those calls, in the order gdb emitted the records.

mod broker;
mod framer;
mod process;

pub use broker::{AsyncCallback, StreamCallback};

use crate::command::MiCommand;
use crate::error::Error;
use crate::output::{find_result_record, take_result_var, Output, ResultClass, ResultNode, Value};
use broker::Broker;
use framer::LineFramer;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd::Pid;
use os_pipe::{PipeReader, PipeWriter};
use process::GdbProcess;
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};

/// Ceiling for one readability wait. Expiry is not a failure: the protocol
/// has no keep-alive and long silence is normal while the debuggee runs, so
/// the retrieve loop just polls the pipe again.
const WAIT_CEILING_MS: i32 = 10_000;

/// Configuration for a new debugger session.
///
/// Replaces gdb resolution through `PATH` with an explicit executable when
/// needed, and appends extra command line arguments after the fixed MI ones.
pub struct GdbBuilder {
    path: String,
    extra_args: Vec<String>,
}

impl Default for GdbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GdbBuilder {
    pub fn new() -> Self {
        Self {
            path: "gdb".to_string(),
            extra_args: Vec::new(),
        }
    }

    /// Path of the gdb executable to spawn.
    pub fn gdb_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Extra command line argument, appended after the MI interpreter ones.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Spawn gdb and block until its initial prompt so the returned session
    /// is immediately usable.
    pub fn start(self) -> Result<Session, Error> {
        let mut args = vec![
            "--interpreter=mi".to_string(),
            "--quiet".to_string(),
            // symbols are loaded eagerly; `file -readnow` from inside the
            // session is ignored by gdb when the binary changes
            "--readnow".to_string(),
        ];
        args.extend(self.extra_args);

        let spawned = GdbProcess::spawn(&self.path, &args)?;
        set_nonblocking(spawned.from_gdb.as_raw_fd())?;

        let mut session = Session {
            process: spawned.process,
            to_gdb: Some(spawned.to_gdb),
            from_gdb: Some(spawned.from_gdb),
            framer: LineFramer::new(),
            broker: Broker::new(),
        };
        if !session.process.is_alive() {
            return Err(Error::NotRunning);
        }
        session.recv()?;
        Ok(session)
    }
}

fn set_nonblocking(fd: RawFd) -> Result<(), Error> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| Error::Syscall("fcntl", e))?;
    let flags = OFlag::from_bits_retain(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| Error::Syscall("fcntl", e))?;
    Ok(())
}

/// One debugger instance: the child process, its pipes and the response
/// state machine.
///
/// A session is single-threaded by construction; run one session per child
/// and poll each from its own thread if several debuggers are needed.
pub struct Session {
    process: GdbProcess,
    to_gdb: Option<PipeWriter>,
    from_gdb: Option<PipeReader>,
    framer: LineFramer,
    broker: Broker,
}

impl Session {
    /// Start a session with the default configuration (`gdb` from `PATH`).
    pub fn start() -> Result<Session, Error> {
        GdbBuilder::new().start()
    }

    pub fn builder() -> GdbBuilder {
        GdbBuilder::new()
    }

    pub fn pid(&self) -> Pid {
        self.process.pid()
    }

    /// Non-blocking liveness check of the gdb child.
    pub fn is_alive(&mut self) -> bool {
        self.process.is_alive()
    }

    /// Send one command: a single write of the whole line, a flush, then the
    /// outgoing-echo callback.
    pub fn send(&mut self, command: &MiCommand) -> Result<(), Error> {
        self.send_raw(&command.render())
    }

    /// Send a fully formatted command line, terminating newline included.
    pub fn send_raw(&mut self, line: &str) -> Result<(), Error> {
        let Some(to_gdb) = self.to_gdb.as_mut() else {
            return Err(Error::NotRunning);
        };
        to_gdb.write_all(line.as_bytes())?;
        to_gdb.flush()?;
        log::trace!(target: "gdbmi", "-> {}", line.trim_end());
        if let Some(cb) = self.broker.callbacks.to_gdb_echo.as_mut() {
            cb(line);
        }
        Ok(())
    }

    /// Read and parse as many lines as are available right now. Returns true
    /// exactly when the end of a response (prompt or exit record) was just
    /// observed; false also covers "no data available".
    pub fn poll(&mut self) -> Result<bool, Error> {
        loop {
            let line = {
                let Some(from_gdb) = self.from_gdb.as_mut() else {
                    return Err(Error::NotRunning);
                };
                self.framer.poll_line(from_gdb)?
            };
            match line {
                Some(line) => {
                    log::trace!(target: "gdbmi", "<- {line}");
                    if self.broker.absorb_line(&line) {
                        return Ok(true);
                    }
                }
                None => return Ok(false),
            }
        }
    }

    /// Block until gdb completes the current response and return the retired
    /// batch.
    ///
    /// There is no per-command timeout: a command that never produces a
    /// terminating record blocks its caller indefinitely, re-polling after
    /// each bounded readability wait. If gdb closes its output pipe mid
    /// response, whatever accumulated so far is returned.
    pub fn recv(&mut self) -> Result<Vec<Output>, Error> {
        loop {
            if self.poll()? {
                return Ok(self.broker.retire());
            }
            if self.framer.saw_eof() {
                log::warn!(target: "gdbmi", "debugger closed its output pipe mid response");
                self.broker.mark_terminated();
                return Ok(self.broker.retire());
            }
            self.wait_readable()?;
        }
    }

    /// Detach and return the records accumulated so far, resetting the
    /// response state.
    pub fn retire(&mut self) -> Vec<Output> {
        self.broker.retire()
    }

    /// Block for a response and check its result-record class.
    pub fn recv_result(&mut self, class: ResultClass) -> Result<bool, Error> {
        let batch = self.recv()?;
        Ok(find_result_record(&batch)
            .map(|r| r.is_class(class))
            .unwrap_or(false))
    }

    /// Block for a response and extract one named field of its result
    /// record, provided the record has the expected class. Everything else
    /// in the batch is released.
    pub fn recv_var(
        &mut self,
        class: ResultClass,
        name: &str,
    ) -> Result<Option<ResultNode>, Error> {
        let batch = self.recv()?;
        Ok(take_result_var(batch, class, name))
    }

    /// Block for a `^done` response and extract one string field.
    pub fn recv_value(&mut self, name: &str) -> Result<Option<String>, Error> {
        Ok(self
            .recv_var(ResultClass::Done, name)?
            .and_then(|node| match node.value {
                Value::Const(s) => Some(s),
                _ => None,
            }))
    }

    /// Arm the console catcher: the n-th console-stream line from now is
    /// snapshotted as the caught line. Used for commands whose answer is
    /// only available as plain console text.
    pub fn catch_console_lines(&mut self, count: u32) {
        self.broker.catch_console_lines(count);
    }

    pub fn caught_console(&self) -> Option<&str> {
        self.broker.caught_console()
    }

    pub fn take_caught_console(&mut self) -> Option<String> {
        self.broker.take_caught_console()
    }

    /// Most recent protocol-level error (malformed line or `^error` record).
    pub fn last_error(&self) -> Option<&Error> {
        self.broker.last_error()
    }

    /// Message text of the most recent `^error` record from gdb.
    pub fn last_gdb_error(&self) -> Option<&str> {
        self.broker.last_gdb_error()
    }

    /// An `^exit` record was seen or the session was stopped; no further
    /// responses will arrive.
    pub fn is_terminated(&self) -> bool {
        self.broker.terminated()
    }

    /// Orderly shutdown: close our pipe ends (a blocked gdb sees EOF on its
    /// stdin), terminate the child if it is still alive, and release the
    /// pending records. Also performed on drop.
    pub fn stop(&mut self) {
        self.to_gdb = None;
        self.from_gdb = None;
        self.process.shutdown();
        self.broker.release_pending();
        self.broker.mark_terminated();
    }

    // ---------------------------- callback registration ------------------------------------------
    // Setters install a handler, takers remove and return it so a caller can
    // chain or restore a previous one.

    /// Console-stream records (`~`): gdb output meant for the user.
    pub fn set_console_callback(&mut self, cb: impl FnMut(&str) + 'static) {
        self.broker.callbacks.console = Some(Box::new(cb));
    }

    pub fn take_console_callback(&mut self) -> Option<StreamCallback> {
        self.broker.callbacks.console.take()
    }

    /// Target-stream records (`@`): output produced by the debuggee.
    pub fn set_target_callback(&mut self, cb: impl FnMut(&str) + 'static) {
        self.broker.callbacks.target = Some(Box::new(cb));
    }

    pub fn take_target_callback(&mut self) -> Option<StreamCallback> {
        self.broker.callbacks.target.take()
    }

    /// Log-stream records (`&`): gdb internal messages.
    pub fn set_log_callback(&mut self, cb: impl FnMut(&str) + 'static) {
        self.broker.callbacks.log = Some(Box::new(cb));
    }

    pub fn take_log_callback(&mut self) -> Option<StreamCallback> {
        self.broker.callbacks.log.take()
    }

    /// Async notification records (`*`/`+`/`=`). A record delivered here is
    /// dropped afterwards and never reaches the pending batch.
    pub fn set_async_callback(&mut self, cb: impl FnMut(&Output) + 'static) {
        self.broker.callbacks.async_notify = Some(Box::new(cb));
    }

    pub fn take_async_callback(&mut self) -> Option<AsyncCallback> {
        self.broker.callbacks.async_notify.take()
    }

    /// Raw command lines, observed after they were written to gdb.
    pub fn set_outgoing_echo_callback(&mut self, cb: impl FnMut(&str) + 'static) {
        self.broker.callbacks.to_gdb_echo = Some(Box::new(cb));
    }

    pub fn take_outgoing_echo_callback(&mut self) -> Option<StreamCallback> {
        self.broker.callbacks.to_gdb_echo.take()
    }

    /// Raw inbound lines, observed before parsing.
    pub fn set_incoming_echo_callback(&mut self, cb: impl FnMut(&str) + 'static) {
        self.broker.callbacks.from_gdb_echo = Some(Box::new(cb));
    }

    pub fn take_incoming_echo_callback(&mut self) -> Option<StreamCallback> {
        self.broker.callbacks.from_gdb_echo.take()
    }

    fn wait_readable(&self) -> Result<(), Error> {
        let Some(from_gdb) = self.from_gdb.as_ref() else {
            return Err(Error::NotRunning);
        };
        let mut fds = [PollFd::new(from_gdb, PollFlags::POLLIN)];
        match poll(&mut fds, WAIT_CEILING_MS) {
            Ok(_) => Ok(()),
            Err(Errno::EINTR) => Ok(()),
            Err(e) => Err(Error::Syscall("poll", e)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
