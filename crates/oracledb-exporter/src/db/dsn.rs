use std::fmt;

use oracledb_common::error::{ExporterError, Result};

/// `user/password@connect_string`, the format of `DATA_SOURCE_NAME`.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
    pub username: String,
    pub password: String,
    pub connect_string: String,
}

impl Dsn {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (credentials, connect_string) = raw
            .rsplit_once('@')
            .ok_or_else(|| ExporterError::InvalidDsn("missing '@connect_string'".to_string()))?;
        let (username, password) = credentials
            .split_once('/')
            .ok_or_else(|| ExporterError::InvalidDsn("missing 'user/password'".to_string()))?;

        if username.is_empty() {
            return Err(ExporterError::InvalidDsn("empty username".to_string()));
        }
        if connect_string.is_empty() {
            return Err(ExporterError::InvalidDsn("empty connect string".to_string()));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            connect_string: connect_string.to_string(),
        })
    }
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsn")
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_string", &self.connect_string)
            .finish()
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.connect_string)
    }
}
