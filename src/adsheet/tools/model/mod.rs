use std::collections::BTreeMap;
use std::fmt;

/// Distinguished name of a directory entry.
pub type Dn = String;

/// One data row of the input worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based line number as shown by spreadsheet applications.
    pub line: usize,
    /// Cell texts in column order; empty cells are `None`.
    pub cells: Vec<Option<String>>,
}

impl SheetRow {
    pub fn new(line: usize, cells: Vec<Option<String>>) -> Self {
        Self { line, cells }
    }

    /// Trimmed text of the cell at `index`, `None` when missing or blank.
    pub fn text(&self, index: usize) -> Option<&str> {
        self.cells
            .get(index)
            .and_then(|cell| cell.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        (0..self.cells.len()).all(|index| self.text(index).is_none())
    }
}

/// Operation requested for a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    /// Replace every existing value with this single string.
    Replace(String),
    /// Remove the attribute from the entry.
    Delete,
}

impl AttributeChange {
    /// Builds the change for a raw cell value: blank or absent cells delete
    /// the attribute, anything else replaces it with the trimmed text.
    pub fn from_cell(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(text) if !text.is_empty() => AttributeChange::Replace(text.to_string()),
            _ => AttributeChange::Delete,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, AttributeChange::Delete)
    }
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeChange::Replace(value) => write!(f, "'{value}'"),
            AttributeChange::Delete => write!(f, "<delete>"),
        }
    }
}

/// Attribute → change mapping built for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationSet {
    changes: BTreeMap<String, AttributeChange>,
}

impl ModificationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the change for `attribute`. Attribute names are
    /// matched ignoring ASCII case; the latest spelling is kept.
    pub fn insert(&mut self, attribute: impl Into<String>, change: AttributeChange) {
        let attribute = attribute.into();
        self.changes.retain(|existing, _| !existing.eq_ignore_ascii_case(&attribute));
        self.changes.insert(attribute, change);
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeChange> {
        self.changes
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(attribute))
            .map(|(_, change)| change)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True when the set would only delete attributes.
    pub fn only_deletes(&self) -> bool {
        self.changes.values().all(AttributeChange::is_delete)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeChange)> {
        self.changes
            .iter()
            .map(|(attribute, change)| (attribute.as_str(), change))
    }
}

impl fmt::Display for ModificationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return write!(f, "(no changes)");
        }
        for (index, (attribute, change)) in self.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{attribute}={change}")?;
        }
        Ok(())
    }
}

/// Entry returned by a directory search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: Dn,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<Dn>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a single-valued attribute, mostly useful when building fixtures.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of `name`, matched case-insensitively as directory servers
    /// may return attribute names in schema casing.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Counters reported at the end of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows that reached the directory lookup with at least one change.
    pub processed: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Rows skipped before the lookup (blank login or nothing to change).
    pub skipped: usize,
    pub dry_run: bool,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary{}:", if self.dry_run { " (dry run)" } else { "" })?;
        writeln!(f, "  Rows processed (with attributes): {}", self.processed)?;
        writeln!(f, "  Succeeded: {}", self.succeeded)?;
        writeln!(f, "  Users not found: {}", self.not_found)?;
        writeln!(f, "  Errors: {}", self.failed)?;
        write!(f, "  Rows skipped: {}", self.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_become_replace_or_delete() {
        assert_eq!(
            AttributeChange::from_cell(Some("  Engineer ")),
            AttributeChange::Replace("Engineer".into())
        );
        assert_eq!(AttributeChange::from_cell(Some("   ")), AttributeChange::Delete);
        assert_eq!(AttributeChange::from_cell(None), AttributeChange::Delete);
    }

    #[test]
    fn modification_set_preview_lists_each_attribute() {
        let mut set = ModificationSet::new();
        set.insert("title", AttributeChange::Replace("Engineer".into()));
        set.insert("mobile", AttributeChange::Delete);
        assert_eq!(set.to_string(), "mobile=<delete>, title='Engineer'");
        assert!(!set.only_deletes());
    }

    #[test]
    fn later_attribute_spelling_overrides_earlier_one() {
        let mut set = ModificationSet::new();
        set.insert("employeeID", AttributeChange::Replace("100".into()));
        set.insert("EmployeeID", AttributeChange::Replace("200".into()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("employeeid"), Some(&AttributeChange::Replace("200".into())));
        assert_eq!(set.to_string(), "EmployeeID='200'");
    }

    #[test]
    fn entry_attribute_lookup_ignores_case() {
        let entry = DirectoryEntry::new("CN=A,DC=x").with_attribute("sAMAccountName", "asmith");
        assert_eq!(entry.first("samaccountname"), Some("asmith"));
        assert_eq!(entry.first("title"), None);
    }
}
