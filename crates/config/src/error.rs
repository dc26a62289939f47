use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration sources could not be read or deserialized.
    #[display("failed to load configuration")]
    Load,
    /// Configuration was read but can't be used.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}
