use crate::adsheet::tools::alias::{self, LOGIN_ATTRIBUTE};
use crate::adsheet::tools::error::{Result, ToolError};

/// Attribute layout derived from a worksheet's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    /// Canonical login attribute carried by the first column.
    pub login_attribute: &'static str,
    /// Attribute for each column after the first, `None` for blank headers.
    pub attributes: Vec<Option<String>>,
}

/// Normalizes raw headers into a [`HeaderMapping`].
///
/// The first header must resolve to the login attribute; the whole run is
/// rejected otherwise. The remaining headers go through the alias table, and
/// blank ones become `None` so their column is ignored.
pub fn normalize_headers(raw: &[String]) -> Result<HeaderMapping> {
    let (first, rest) = raw.split_first().ok_or(ToolError::NoColumns)?;

    let first = first.trim();
    if !alias::resolve(first).eq_ignore_ascii_case(LOGIN_ATTRIBUTE) {
        return Err(ToolError::InvalidLoginHeader(first.to_string()));
    }

    let attributes = rest
        .iter()
        .map(|header| {
            let header = header.trim();
            if header.is_empty() {
                None
            } else {
                Some(alias::resolve(header))
            }
        })
        .collect();

    Ok(HeaderMapping {
        login_attribute: LOGIN_ATTRIBUTE,
        attributes,
    })
}

/// Placeholder headers used when a worksheet has no header row.
pub fn synthesized_headers(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("col{index}")).collect()
}
