//! Directory access used by the import and export flows.
//!
//! [`Directory`] is the seam between the flows and the network: the
//! production implementation is [`ldap::LdapSession`], while tests drive the
//! flows with an in-memory implementation.

pub mod ldap;

use ldap3::ldap_escape;

use crate::adsheet::tools::alias::LOGIN_ATTRIBUTE;
use crate::adsheet::tools::error::Result;
use crate::adsheet::tools::model::{DirectoryEntry, Dn, ModificationSet};

pub use ldap::{ConnectionSettings, LdapSession, SecurityMode};

/// Operations the tools need from a directory service.
pub trait Directory {
    /// Resolves the DN of the user whose login attribute equals `login`,
    /// searching the subtree under `base_dn`.
    fn find_user_dn(&mut self, base_dn: &str, login: &str) -> Result<Option<Dn>>;

    /// Submits `changes` for `dn` as one modify request.
    fn apply_changes(&mut self, dn: &str, changes: &ModificationSet) -> Result<()>;

    /// Runs a subtree search under `base_dn` returning the requested attributes.
    fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>>;

    /// Ends the session. Implementations holding a connection release it here.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Filter matching the user entry with the given login.
pub fn user_filter(login: &str) -> String {
    format!(
        "(&(objectClass=user)({LOGIN_ATTRIBUTE}={}))",
        ldap_escape(login)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_filter_targets_the_login_attribute() {
        assert_eq!(
            user_filter("jdoe"),
            "(&(objectClass=user)(sAMAccountName=jdoe))"
        );
    }

    #[test]
    fn user_filter_escapes_special_characters() {
        assert_eq!(
            user_filter("a*b(c)"),
            "(&(objectClass=user)(sAMAccountName=a\\2ab\\28c\\29))"
        );
    }
}
