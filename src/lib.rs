//! Client library for the gdb machine interface (GDB/MI).
//!
//! A [`Session`] spawns gdb as a child process wired to a pair of pipes,
//! frames its stdout into lines, parses every line into a typed record tree
//! and sorts the records: stream and async records go to registered
//! callbacks as they arrive, result records accumulate until the `(gdb)`
//! prompt closes the response and the blocked caller receives the batch.
//!
//! ```no_run
//! use gdbmi::{MiCommand, ResultClass, Session};
//!
//! # fn main() -> Result<(), gdbmi::Error> {
//! let mut gdb = Session::builder().gdb_path("/usr/bin/gdb").start()?;
//! gdb.set_console_callback(|text| print!("{text}"));
//!
//! gdb.send(&MiCommand::new("file-exec-and-symbols").arg("./a.out"))?;
//! if !gdb.recv_result(ResultClass::Done)? {
//!     eprintln!("gdb: {}", gdb.last_gdb_error().unwrap_or("unknown error"));
//! }
//!
//! gdb.send(&MiCommand::new("data-evaluate-expression").arg("\"1+2\""))?;
//! let value = gdb.recv_value("value")?;
//! assert_eq!(value.as_deref(), Some("3"));
//!
//! gdb.stop();
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod output;
pub mod parser;
pub mod session;

pub use command::MiCommand;
pub use error::Error;
pub use output::{
    find_result_record, take_result_var, AsyncClass, AsyncKind, Output, OutputKind, ResultClass,
    ResultNode, StreamKind, Value,
};
pub use session::{GdbBuilder, Session};
