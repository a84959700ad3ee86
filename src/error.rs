use std::fmt;

/// Login or token scrape failed.
#[derive(Debug)]
pub enum AuthError {
    Transport(reqwest::Error),
    /// The control page did not carry a token field. Covers wrong
    /// credentials (the portal serves the login page instead) and markup
    /// changes.
    TokenNotFound,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Transport(e) => write!(f, "login request failed: {e}"),
            AuthError::TokenNotFound => write!(f, "session token not found on control page"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Transport(e) => Some(e),
            AuthError::TokenNotFound => None,
        }
    }
}

/// Telemetry fetch failed, after the single token-refresh retry.
#[derive(Debug)]
pub enum ReadError {
    Auth(AuthError),
    Transport(reqwest::Error),
    Status(u16),
    Decode(serde_json::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Auth(e) => write!(f, "no session token: {e}"),
            ReadError::Transport(e) => write!(f, "telemetry request failed: {e}"),
            ReadError::Status(s) => write!(f, "telemetry request returned HTTP {s}"),
            ReadError::Decode(e) => write!(f, "telemetry response is not a JSON object: {e}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Auth(e) => Some(e),
            ReadError::Transport(e) => Some(e),
            ReadError::Decode(e) => Some(e),
            ReadError::Status(_) => None,
        }
    }
}

impl From<AuthError> for ReadError {
    fn from(e: AuthError) -> Self {
        ReadError::Auth(e)
    }
}

/// Command POST failed. Never retried.
#[derive(Debug)]
pub enum WriteError {
    Auth(AuthError),
    Transport(reqwest::Error),
    Status(u16),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Auth(e) => write!(f, "no session token: {e}"),
            WriteError::Transport(e) => write!(f, "command request failed: {e}"),
            WriteError::Status(s) => write!(f, "command request returned HTTP {s}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Auth(e) => Some(e),
            WriteError::Transport(e) => Some(e),
            WriteError::Status(_) => None,
        }
    }
}

impl From<AuthError> for WriteError {
    fn from(e: AuthError) -> Self {
        WriteError::Auth(e)
    }
}

#[derive(Debug)]
pub enum Error {
    Auth(AuthError),
    Read(ReadError),
    Write(WriteError),
    InvalidZone(u8),
    InvalidTemperature(f64),
    Http(reqwest::Error),
    Io(std::io::Error),
}

impl Error {
    /// True when the failure comes down to token acquisition, whichever
    /// operation surfaced it.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Read(ReadError::Auth(_)) | Error::Write(WriteError::Auth(_))
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Auth(e) => write!(f, "auth error: {e}"),
            Error::Read(e) => write!(f, "read error: {e}"),
            Error::Write(e) => write!(f, "write error: {e}"),
            Error::InvalidZone(id) => write!(f, "invalid zone: {id} (expected 1 or 2)"),
            Error::InvalidTemperature(t) => write!(f, "temperature out of range: {t}"),
            Error::Http(e) => write!(f, "HTTP client error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Auth(e) => Some(e),
            Error::Read(e) => Some(e),
            Error::Write(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Error::Auth(e)
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Error::Read(e)
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        Error::Write(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
