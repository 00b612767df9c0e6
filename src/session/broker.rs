//! Response accumulation and out-of-band dispatch.
//!
//! Every parsed line either completes the current response (the `(gdb)`
//! prompt or an `^exit` record), is dispatched to a callback right away
//! (stream records, async records with a registered handler), or is appended
//! to the pending batch for the blocked caller to retire.

use crate::error::Error;
use crate::output::{Output, OutputKind, ResultClass, StreamKind};
use crate::parser;

/// Stream/echo callback: receives the decoded text (streams) or the raw
/// line (echo taps).
pub type StreamCallback = Box<dyn FnMut(&str)>;

/// Async notification callback: receives the whole parsed record.
pub type AsyncCallback = Box<dyn FnMut(&Output)>;

/// End-of-response sentinel printed by gdb.
pub(crate) const PROMPT: &str = "(gdb)";

#[derive(Default)]
pub(crate) struct Callbacks {
    pub console: Option<StreamCallback>,
    pub target: Option<StreamCallback>,
    pub log: Option<StreamCallback>,
    pub async_notify: Option<AsyncCallback>,
    pub to_gdb_echo: Option<StreamCallback>,
    pub from_gdb_echo: Option<StreamCallback>,
}

/// Per-session response state machine.
pub(crate) struct Broker {
    pending: Vec<Output>,
    pub callbacks: Callbacks,
    catch_console: u32,
    caught_console: Option<String>,
    last_error: Option<Error>,
    last_gdb_error: Option<String>,
    terminated: bool,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            callbacks: Callbacks::default(),
            catch_console: 0,
            caught_console: None,
            last_error: None,
            last_gdb_error: None,
            terminated: false,
        }
    }

    /// Consume one inbound line. Returns true when the line completed the
    /// current response.
    pub fn absorb_line(&mut self, line: &str) -> bool {
        if let Some(cb) = self.callbacks.from_gdb_echo.as_mut() {
            cb(line);
        }
        if line.starts_with(PROMPT) {
            return true;
        }

        let output = match parser::parse_line(line) {
            Ok(output) => output,
            Err(e) => {
                // the line is lost but the response survives, gdb will
                // still print the closing prompt
                log::warn!(target: "gdbmi", "dropping malformed line: {e}");
                self.last_error = Some(e);
                return false;
            }
        };

        match output.kind {
            OutputKind::Stream(kind) => {
                let text = output.stream_text().unwrap_or_default();
                match kind {
                    StreamKind::Console => {
                        if let Some(cb) = self.callbacks.console.as_mut() {
                            cb(text);
                        }
                        if self.catch_console > 0 {
                            self.catch_console -= 1;
                            if self.catch_console == 0 {
                                self.caught_console = Some(text.to_string());
                            }
                        }
                    }
                    StreamKind::Target => {
                        if let Some(cb) = self.callbacks.target.as_mut() {
                            cb(text);
                        }
                    }
                    StreamKind::Log => {
                        if let Some(cb) = self.callbacks.log.as_mut() {
                            cb(text);
                        }
                    }
                }
                false
            }
            OutputKind::Async { .. } => {
                // dispatched records never reach the batch; with no handler
                // registered the record is kept for the synchronous caller
                match self.callbacks.async_notify.as_mut() {
                    Some(cb) => cb(&output),
                    None => self.pending.push(output),
                }
                false
            }
            OutputKind::Result(class) => {
                if class == ResultClass::Error {
                    let msg = output
                        .results
                        .first()
                        .filter(|r| r.name.as_deref() == Some("msg"))
                        .and_then(|r| r.value.as_const())
                        .map(str::to_string);
                    self.last_error = Some(Error::Gdb(msg.clone().unwrap_or_default()));
                    self.last_gdb_error = msg;
                }
                let is_exit = class == ResultClass::Exit;
                self.pending.push(output);
                if is_exit {
                    // gdb will not print another prompt
                    self.terminated = true;
                }
                is_exit
            }
        }
    }

    /// Detach and return the pending batch, resetting accumulation state.
    pub fn retire(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.pending)
    }

    pub fn release_pending(&mut self) {
        self.pending.clear();
    }

    /// An `^exit` record was seen; gdb is going away on its own.
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub fn mark_terminated(&mut self) {
        self.terminated = true;
    }

    pub fn catch_console_lines(&mut self, count: u32) {
        self.catch_console = count;
    }

    pub fn caught_console(&self) -> Option<&str> {
        self.caught_console.as_deref()
    }

    pub fn take_caught_console(&mut self) -> Option<String> {
        self.caught_console.take()
    }

    /// Most recent protocol-level error (malformed line or `^error` record).
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Message text of the most recent `^error` record.
    pub fn last_gdb_error(&self) -> Option<&str> {
        self.last_gdb_error.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::output::{find_result_record, AsyncClass, AsyncKind, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_response_batching_with_console_stream() {
        let mut broker = Broker::new();
        let consoled: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = consoled.clone();
        broker.callbacks.console = Some(Box::new(move |text| {
            sink.borrow_mut().push(text.to_string());
        }));

        assert!(!broker.absorb_line("~\"hello\\n\""));
        assert!(!broker.absorb_line("^done,x=\"1\""));
        assert!(broker.absorb_line("(gdb)"));

        // the stream line was dispatched exactly once and kept out of the batch
        assert_eq!(*consoled.borrow(), vec!["hello\n".to_string()]);
        let batch = broker.retire();
        assert_eq!(batch.len(), 1);
        assert!(batch[0].is_class(ResultClass::Done));
        assert_eq!(batch[0].find("x").unwrap().as_const(), Some("1"));
        // retire resets the accumulation
        assert!(broker.retire().is_empty());
    }

    #[test]
    fn test_async_record_dispatched_to_callback() {
        let mut broker = Broker::new();
        let seen: Rc<RefCell<Vec<Output>>> = Rc::default();
        let sink = seen.clone();
        broker.callbacks.async_notify = Some(Box::new(move |output| {
            sink.borrow_mut().push(output.clone());
        }));

        broker.absorb_line(
            "*stopped,reason=\"breakpoint-hit\",bkptno=\"1\",frame={level=\"0\"}",
        );
        assert!(broker.absorb_line("(gdb)"));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].kind,
            OutputKind::Async {
                kind: AsyncKind::Exec,
                class: AsyncClass::Stopped
            }
        );
        assert!(matches!(
            seen[0].find("frame").unwrap().value,
            Value::Tuple(_)
        ));
        // dispatched records never reach the batch
        assert!(broker.retire().is_empty());
    }

    #[test]
    fn test_async_record_kept_without_callback() {
        let mut broker = Broker::new();
        broker.absorb_line("*stopped,reason=\"end-stepping-range\"");
        assert!(broker.absorb_line("(gdb)"));

        let batch = broker.retire();
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0].kind, OutputKind::Async { .. }));
    }

    #[test]
    fn test_error_record_is_captured_and_kept() {
        let mut broker = Broker::new();
        broker.absorb_line("^error,msg=\"no symbol table\"");
        assert!(broker.absorb_line("(gdb)"));

        assert_eq!(broker.last_gdb_error(), Some("no symbol table"));
        assert!(matches!(broker.last_error(), Some(Error::Gdb(_))));
        // the record still reaches the caller, who decides whether it is fatal
        let batch = broker.retire();
        assert!(find_result_record(&batch)
            .unwrap()
            .is_class(ResultClass::Error));
    }

    #[test]
    fn test_newer_error_replaces_older() {
        let mut broker = Broker::new();
        broker.absorb_line("^error,msg=\"first\"");
        broker.absorb_line("(gdb)");
        broker.retire();
        broker.absorb_line("^error,msg=\"second\"");
        assert_eq!(broker.last_gdb_error(), Some("second"));
    }

    #[test]
    fn test_exit_record_completes_without_prompt() {
        let mut broker = Broker::new();
        assert!(broker.absorb_line("^exit"));
        assert!(broker.terminated());
        let batch = broker.retire();
        assert!(batch[0].is_class(ResultClass::Exit));
    }

    #[test]
    fn test_malformed_line_is_dropped_not_fatal() {
        let mut broker = Broker::new();
        assert!(!broker.absorb_line("what is this"));
        assert!(matches!(broker.last_error(), Some(Error::Parser { .. })));

        // accumulation continues past the lost line
        broker.absorb_line("^done,x=\"1\"");
        assert!(broker.absorb_line("(gdb)"));
        assert_eq!(broker.retire().len(), 1);
    }

    #[test]
    fn test_console_catch_counter() {
        let mut broker = Broker::new();
        broker.catch_console_lines(2);
        broker.absorb_line("~\"first\\n\"");
        assert!(broker.caught_console().is_none());
        broker.absorb_line("~\"second\\n\"");
        assert_eq!(broker.caught_console(), Some("second\n"));
        // later lines do not overwrite the snapshot
        broker.absorb_line("~\"third\\n\"");
        assert_eq!(broker.take_caught_console().as_deref(), Some("second\n"));
        assert!(broker.caught_console().is_none());
    }

    #[test]
    fn test_incoming_echo_sees_every_line() {
        let mut broker = Broker::new();
        let lines: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = lines.clone();
        broker.callbacks.from_gdb_echo = Some(Box::new(move |line| {
            sink.borrow_mut().push(line.to_string());
        }));

        broker.absorb_line("~\"x\"");
        broker.absorb_line("^done");
        broker.absorb_line("(gdb)");
        assert_eq!(
            *lines.borrow(),
            vec!["~\"x\"".to_string(), "^done".to_string(), "(gdb)".to_string()]
        );
    }

    #[test]
    fn test_prompt_with_trailing_text_still_ends_response() {
        let mut broker = Broker::new();
        assert!(broker.absorb_line("(gdb) "));
    }
}
