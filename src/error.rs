use std::fmt;

use failure::Backtrace;
use failure::Context;
use failure::Fail;


/// Error information returned by this crate's API in case of errors.
#[derive(Debug)]
pub struct Error(Context<ErrorKind>);

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.0.get_context().clone()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error(inner)
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&Fail> {
        self.0.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.0.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}


/// Exhaustive list of possible errors emitted by this crate.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "connection to coordinator backend failed")]
    BackendConnect,

    #[fail(display = "{} failed due to coordinator backend error", _0)]
    Backend(&'static str),

    #[fail(display = "failed to decode {}", _0)]
    Decode(&'static str),

    #[fail(display = "failed to encode {}", _0)]
    Encode(&'static str),

    #[fail(display = "unable to spawn new thread for '{}'", _0)]
    SpawnThread(&'static str),

    #[fail(display = "bag item {} at '{}' was not found", _0, _1)]
    BagItemNotFound(i64, String),

    #[fail(display = "candidate is already enrolled in leader queue '{}'", _0)]
    CandidateAlreadyEnrolled(String),

    #[fail(display = "discovery record rejected: {}", _0)]
    DiscoveryValidation(String),

    #[fail(display = "no discovery provider found for {}/{}", _0, _1)]
    DiscoveryNotFound(String, String),

    #[fail(display = "interface '{}' has no usable address", _0)]
    NoInterfaceAddress(String),

    #[fail(display = "local fallback store search path '{}' is not usable", _0)]
    LocalStore(String),
}


/// Short form alias for functions returning `Error`s.
pub type Result<T> = ::std::result::Result<T, Error>;
