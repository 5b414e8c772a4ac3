use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical attribute identifying a user entry.
pub const LOGIN_ATTRIBUTE: &str = "sAMAccountName";

/// Column headers commonly found in spreadsheets and the attribute each one
/// stands for. Portuguese and English spellings are both accepted.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("login", LOGIN_ATTRIBUTE),
    ("sam", LOGIN_ATTRIBUTE),
    ("sAMAccountName", LOGIN_ATTRIBUTE),
    ("telefone", "mobile"),
    ("celular", "mobile"),
    ("mobile", "mobile"),
    ("phone", "mobile"),
    ("cargo", "title"),
    ("título", "title"),
    ("titulo", "title"),
    ("title", "title"),
    ("departamento", "department"),
    ("department", "department"),
    ("empresa", "company"),
    ("company", "company"),
    // The directory expects the manager's DN in this column.
    ("gerencia", "manager"),
    ("descricao", "description"),
    ("description", "description"),
    ("cidade", "l"),
    ("estado", "st"),
    ("pais", "co"),
    ("rua", "streetAddress"),
    ("cep", "postalCode"),
];

static ALIASES: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    HEADER_ALIASES
        .iter()
        .map(|(header, attribute)| (header.to_lowercase(), *attribute))
        .collect()
});

/// Looks up the attribute registered for `header`, ignoring case and
/// surrounding whitespace.
pub fn lookup(header: &str) -> Option<&'static str> {
    ALIASES.get(&header.trim().to_lowercase()).copied()
}

/// Resolves `header` to an attribute name, falling back to the trimmed header
/// itself when no alias is registered.
pub fn resolve(header: &str) -> String {
    match lookup(header) {
        Some(attribute) => attribute.to_string(),
        None => header.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_headers_resolve_to_attributes() {
        assert_eq!(resolve("telefone"), "mobile");
        assert_eq!(resolve("Cargo"), "title");
        assert_eq!(resolve("TÍTULO"), "title");
        assert_eq!(resolve(" cep "), "postalCode");
    }

    #[test]
    fn login_aliases_share_the_canonical_attribute() {
        for header in ["login", "SAM", "samaccountname", "sAMAccountName"] {
            assert_eq!(lookup(header), Some(LOGIN_ATTRIBUTE), "header {header}");
        }
    }

    #[test]
    fn unknown_headers_pass_through_trimmed() {
        assert_eq!(lookup("employeeID"), None);
        assert_eq!(resolve("  employeeID "), "employeeID");
    }
}
