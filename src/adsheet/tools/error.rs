use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the failures that can occur while reading a workbook,
/// talking to the directory, or writing an export.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the requested worksheet is not part of the workbook.
    #[error("worksheet '{0}' not found in workbook")]
    MissingSheet(String),

    /// Raised when the header row has no columns at all.
    #[error("workbook has no columns; the first column must be the login")]
    NoColumns,

    /// Raised when the first column does not resolve to the login attribute.
    #[error(
        "the first column must be the login (e.g. 'login', 'sam' or 'sAMAccountName'), found '{0}'"
    )]
    InvalidLoginHeader(String),

    /// Raised when the server address and security mode contradict each other.
    #[error("server '{server}' cannot be used with security mode '{mode}'")]
    ConflictingSecurity { server: String, mode: String },

    /// Raised when the directory server cannot be reached.
    #[error("LDAP connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: ldap3::LdapError,
    },

    /// Raised when the server rejects the bind credentials.
    #[error("LDAP bind as '{user}' failed: {message}")]
    Bind { user: String, message: String },

    /// Raised when the server answers a modify request with a non-zero code.
    #[error("modification of {dn} rejected (code {code}): {message}")]
    ModifyRejected {
        dn: String,
        code: u32,
        message: String,
    },

    /// Raised when the server answers a search with a non-zero code.
    #[error("LDAP search failed (code {code}): {message}")]
    SearchFailed { code: u32, message: String },

    /// Raised when a session is used after it has been closed.
    #[error("LDAP session already closed")]
    SessionClosed,

    /// Transport or protocol failures during an established session.
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Process exit code for this error: 2 for connection and authentication
    /// failures, 1 for everything detected before or outside the session.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Connection { .. } | ToolError::Bind { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_map_to_exit_code_two() {
        let error = ToolError::Bind {
            user: "EMPRESA\\svc".into(),
            message: "invalidCredentials".into(),
        };
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn input_failures_map_to_exit_code_one() {
        assert_eq!(ToolError::InvalidLoginHeader("nome".into()).exit_code(), 1);
        assert_eq!(ToolError::MissingInput(PathBuf::from("x.xlsx")).exit_code(), 1);
        assert_eq!(ToolError::NoColumns.exit_code(), 1);
    }
}
