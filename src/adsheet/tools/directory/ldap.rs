use std::collections::{BTreeMap, HashSet};
use std::fmt;

use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{LdapConn, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::adsheet::tools::directory::{Directory, user_filter};
use crate::adsheet::tools::error::{Result, ToolError};
use crate::adsheet::tools::model::{AttributeChange, DirectoryEntry, Dn, ModificationSet};

/// Entries requested per page from the server.
const SEARCH_PAGE_SIZE: i32 = 500;

/// `sizeLimitExceeded`: the server stopped early but the entries it sent are valid.
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

/// Transport security used for the directory connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// Unencrypted `ldap://`.
    Plain,
    /// `ldap://` upgraded with the StartTLS extended operation.
    StartTls,
    /// TLS from the first byte, `ldaps://`.
    Secure,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityMode::Plain => write!(f, "plain"),
            SecurityMode::StartTls => write!(f, "starttls"),
            SecurityMode::Secure => write!(f, "secure"),
        }
    }
}

/// Everything needed to open and bind a session.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Host name, `host:port`, or a full `ldap://` / `ldaps://` URL.
    pub server: String,
    /// Bind identity, e.g. `EMPRESA\svc` or a full DN.
    pub user: String,
    pub password: String,
    /// Explicit security mode; derived from the server URL when `None`.
    pub security: Option<SecurityMode>,
    /// Skip certificate validation for TLS modes.
    pub insecure: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// URL and effective security mode for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub mode: SecurityMode,
}

impl ConnectionSettings {
    /// Works out the URL to dial and the effective security mode.
    ///
    /// A bare host defaults to [`SecurityMode::Secure`]. An `ldap://` URL
    /// defaults to plain and may be upgraded with StartTLS; an `ldaps://` URL
    /// is always secure. Contradicting combinations are rejected.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let server = self.server.trim();
        let conflict = |mode: SecurityMode| ToolError::ConflictingSecurity {
            server: server.to_string(),
            mode: mode.to_string(),
        };

        if let Some(host) = strip_scheme(server, "ldaps://") {
            return match self.security {
                None | Some(SecurityMode::Secure) => Ok(Endpoint {
                    url: format!("ldaps://{host}"),
                    mode: SecurityMode::Secure,
                }),
                Some(mode) => Err(conflict(mode)),
            };
        }

        if let Some(host) = strip_scheme(server, "ldap://") {
            return match self.security {
                Some(SecurityMode::Secure) => Err(conflict(SecurityMode::Secure)),
                mode => Ok(Endpoint {
                    url: format!("ldap://{host}"),
                    mode: mode.unwrap_or(SecurityMode::Plain),
                }),
            };
        }

        let mode = self.security.unwrap_or(SecurityMode::Secure);
        let scheme = match mode {
            SecurityMode::Secure => "ldaps",
            SecurityMode::Plain | SecurityMode::StartTls => "ldap",
        };
        Ok(Endpoint {
            url: format!("{scheme}://{server}"),
            mode,
        })
    }
}

fn strip_scheme<'a>(server: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = server.get(..scheme.len())?;
    if prefix.eq_ignore_ascii_case(scheme) {
        Some(server[scheme.len()..].trim_end_matches('/'))
    } else {
        None
    }
}

/// A bound connection to the directory.
///
/// The session is unbound by [`Directory::close`] or, on any other exit
/// path, when it is dropped.
pub struct LdapSession {
    conn: Option<LdapConn>,
    url: String,
}

impl LdapSession {
    /// Connects to the server described by `settings` and binds with its
    /// credentials.
    #[instrument(
        level = "info",
        skip_all,
        fields(server = %settings.server, user = %settings.user)
    )]
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        let endpoint = settings.endpoint()?;
        let conn_settings = LdapConnSettings::new()
            .set_starttls(endpoint.mode == SecurityMode::StartTls)
            .set_no_tls_verify(settings.insecure && endpoint.mode != SecurityMode::Plain);

        if settings.insecure && endpoint.mode != SecurityMode::Plain {
            warn!("TLS certificate validation is disabled");
        }

        let conn = LdapConn::with_settings(conn_settings, &endpoint.url).map_err(|source| {
            ToolError::Connection {
                url: endpoint.url.clone(),
                source,
            }
        })?;
        debug!(url = %endpoint.url, mode = %endpoint.mode, "connected");

        let mut session = Self {
            conn: Some(conn),
            url: endpoint.url,
        };
        session.bind(&settings.user, &settings.password)?;
        info!(url = %session.url, "bound to directory");
        Ok(session)
    }

    fn bind(&mut self, user: &str, password: &str) -> Result<()> {
        let bind_error = |message: String| ToolError::Bind {
            user: user.to_string(),
            message,
        };
        let result = self
            .conn()?
            .simple_bind(user, password)
            .map_err(|err| bind_error(err.to_string()))?;
        if result.rc != 0 {
            return Err(bind_error(format!("{} (code {})", result.text, result.rc)));
        }
        Ok(())
    }

    fn conn(&mut self) -> Result<&mut LdapConn> {
        self.conn.as_mut().ok_or(ToolError::SessionClosed)
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            conn.unbind()?;
            debug!(url = %self.url, "unbound from directory");
        }
        Ok(())
    }
}

fn check_search_result(result: LdapResult, entries: usize) -> Result<()> {
    match result.rc {
        0 => Ok(()),
        RC_SIZE_LIMIT_EXCEEDED => {
            warn!(entries, message = %result.text, "server size limit reached, results truncated");
            Ok(())
        }
        code => Err(ToolError::SearchFailed {
            code,
            message: result.text,
        }),
    }
}

impl Drop for LdapSession {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            warn!(url = %self.url, %error, "failed to unbind cleanly");
        }
    }
}

impl Directory for LdapSession {
    fn find_user_dn(&mut self, base_dn: &str, login: &str) -> Result<Option<Dn>> {
        let filter = user_filter(login);
        let entries = self.search(base_dn, &filter, &["distinguishedName"])?;
        Ok(entries.into_iter().next().map(|entry| entry.dn))
    }

    fn apply_changes(&mut self, dn: &str, changes: &ModificationSet) -> Result<()> {
        let mods: Vec<Mod<&str>> = changes
            .iter()
            .map(|(attribute, change)| match change {
                AttributeChange::Replace(value) => {
                    Mod::Replace(attribute, HashSet::from([value.as_str()]))
                }
                AttributeChange::Delete => Mod::Delete(attribute, HashSet::new()),
            })
            .collect();

        let result = self.conn()?.modify(dn, mods)?;
        if result.rc != 0 {
            return Err(ToolError::ModifyRejected {
                dn: dn.to_string(),
                code: result.rc,
                message: result.text,
            });
        }
        Ok(())
    }

    fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        debug!(base_dn, filter, "searching directory");
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(SEARCH_PAGE_SIZE)),
        ];
        let mut stream = self.conn()?.streaming_search_with(
            adapters,
            base_dn,
            Scope::Subtree,
            filter,
            attributes.to_vec(),
        )?;

        let mut entries = Vec::new();
        while let Some(entry) = stream.next()? {
            let entry = SearchEntry::construct(entry);
            entries.push(DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs.into_iter().collect::<BTreeMap<_, _>>(),
            });
        }
        check_search_result(stream.result(), entries.len())?;
        Ok(entries)
    }

    fn close(mut self) -> Result<()> {
        self.release()
    }
}
