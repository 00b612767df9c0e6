//! Line framing for the non-blocking pipe from gdb.

use std::io::{ErrorKind, Read};

/// Accumulates partial reads and yields complete lines.
///
/// Reads are expected to come from a descriptor in non-blocking mode:
/// "nothing available right now" is a normal condition reported as
/// `Ok(None)`, distinct from a read error.
pub(crate) struct LineFramer {
    buf: Vec<u8>,
    eof: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Drain the currently available bytes and yield the next complete line,
    /// without its newline. `Ok(None)` means no complete line is buffered
    /// yet.
    pub fn poll_line(&mut self, src: &mut impl Read) -> std::io::Result<Option<String>> {
        loop {
            if let Some(at) = self.buf.iter().position(|&b| b == b'\n') {
                let rest = self.buf.split_off(at + 1);
                let mut line = std::mem::replace(&mut self.buf, rest);
                line.pop();
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.eof {
                return Ok(None);
            }

            let mut chunk = [0u8; 512];
            match src.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(None);
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// The source reported end of file (gdb closed its side of the pipe).
    pub fn saw_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted reader: yields data chunks, "would block" gaps and a final
    /// end of file in a fixed order.
    enum Step {
        Data(&'static [u8]),
        WouldBlock,
        Eof,
    }

    struct ScriptedReader(VecDeque<Step>);

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Step::Data(data)) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                Some(Step::Eof) | None => Ok(0),
                Some(Step::WouldBlock) => Err(ErrorKind::WouldBlock.into()),
            }
        }
    }

    #[test]
    fn test_lines_across_partial_reads() {
        let mut src = ScriptedReader(VecDeque::from([
            Step::Data(b"^do"),
            Step::WouldBlock,
            Step::Data(b"ne\n(gd"),
            Step::WouldBlock,
            Step::Data(b"b)\n"),
        ]));
        let mut framer = LineFramer::new();

        assert_eq!(framer.poll_line(&mut src).unwrap(), None);
        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("^done"));
        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("(gdb)"));
        assert_eq!(framer.poll_line(&mut src).unwrap(), None);
    }

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut src = ScriptedReader(VecDeque::from([
            Step::Data(b"~\"a\"\n~\"b\"\n(gdb)\n"),
            Step::WouldBlock,
        ]));
        let mut framer = LineFramer::new();

        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("~\"a\""));
        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("~\"b\""));
        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("(gdb)"));
        assert_eq!(framer.poll_line(&mut src).unwrap(), None);
    }

    #[test]
    fn test_eof_drops_trailing_partial_line() {
        let mut src = ScriptedReader(VecDeque::from([Step::Data(b"^done\n^runn"), Step::Eof]));
        let mut framer = LineFramer::new();

        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some("^done"));
        assert!(!framer.saw_eof());
        assert_eq!(framer.poll_line(&mut src).unwrap(), None);
        assert!(framer.saw_eof());
        // stays drained once the source is gone
        assert_eq!(framer.poll_line(&mut src).unwrap(), None);
    }

    #[test]
    fn test_empty_line() {
        let mut src = ScriptedReader(VecDeque::from([Step::Data(b"\n"), Step::WouldBlock]));
        let mut framer = LineFramer::new();
        assert_eq!(framer.poll_line(&mut src).unwrap().as_deref(), Some(""));
    }
}
