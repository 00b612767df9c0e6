#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- session establishment -------------------------------------
    #[error("pipe creation error: {0}")]
    PipeCreate(std::io::Error),
    #[error("fail to spawn debugger process: {0}")]
    Spawn(std::io::Error),
    #[error("debugger process is not running")]
    NotRunning,

    // --------------------------------- syscall errors --------------------------------------------
    #[error("{0} syscall error: {1}")]
    Syscall(&'static str, nix::Error),

    // --------------------------------- protocol errors -------------------------------------------
    #[error("malformed output at byte {at}: `{line}`")]
    Parser { line: String, at: usize },
    #[error("unknown result class in `{0}`")]
    UnknownResultClass(String),
    #[error("unknown async class in `{0}`")]
    UnknownAsyncClass(String),

    // --------------------------------- reported by the debugger ----------------------------------
    #[error("debugger reported an error: {0}")]
    Gdb(String),
}

impl Error {
    /// Return a hint to an interface - continue the dialog after error or stop whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Parser { .. } => false,
            Error::UnknownResultClass(_) => false,
            Error::UnknownAsyncClass(_) => false,
            Error::Gdb(_) => false,

            // currently fatal errors
            Error::IO(_) => true,
            Error::PipeCreate(_) => true,
            Error::Spawn(_) => true,
            Error::NotRunning => true,
            Error::Syscall(_, _) => true,
        }
    }
}
