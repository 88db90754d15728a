use super::ErrorKind;
pub use failure::Error;
use std::result::Result as StdResult;

/// Crate-wide result alias — matches the teacher's `common::Result`.
pub type Result<T> = StdResult<T, Error>;

impl From<std::io::Error> for ErrorKind {
	fn from(e: std::io::Error) -> Self {
		ErrorKind::Generic(format!("io error: {}", e))
	}
}

impl From<serde_json::Error> for ErrorKind {
	fn from(e: serde_json::Error) -> Self {
		ErrorKind::Generic(format!("corrupted snapshot json: {}", e))
	}
}

impl From<toml::de::Error> for ErrorKind {
	fn from(e: toml::de::Error) -> Self {
		ErrorKind::Generic(format!("config parse error: {}", e))
	}
}

impl From<reqwest::Error> for ErrorKind {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() || e.is_connect() {
			ErrorKind::DaemonOffline
		} else if e.status().map(|s| s.as_u16()) == Some(504) {
			ErrorKind::DaemonStillProcessing
		} else {
			ErrorKind::DaemonError(e.to_string())
		}
	}
}
