use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Startup and shutdown failures. Requests never fail with these.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("logging could not be initialized")]
    Logging,
    #[display("configuration could not be loaded")]
    Config,
    #[display("storage backend could not be initialized")]
    Storage,
    #[display("HTTP server failed")]
    Server,
}
