use crate::adsheet::tools::headers::HeaderMapping;
use crate::adsheet::tools::model::{AttributeChange, ModificationSet, SheetRow};

/// A row that is ready to be looked up and applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRow {
    pub line: usize,
    pub login: String,
    pub changes: ModificationSet,
}

/// Result of inspecting one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Every cell is empty.
    Blank,
    /// The login column is empty but other cells carry data.
    MissingLogin,
    /// The row names a login but would change nothing.
    NothingToChange { login: String },
    Ready(PreparedRow),
}

/// Builds the modification set for `row` according to `mapping`.
///
/// Columns without an attribute name are ignored. Rows whose resolved values
/// are all blank are reported as [`RowOutcome::NothingToChange`] rather than
/// turned into a batch of deletes.
pub fn prepare_row(row: &SheetRow, mapping: &HeaderMapping) -> RowOutcome {
    if row.is_blank() {
        return RowOutcome::Blank;
    }

    let Some(login) = row.text(0) else {
        return RowOutcome::MissingLogin;
    };
    let login = login.to_string();

    let mut changes = ModificationSet::new();
    for (offset, attribute) in mapping.attributes.iter().enumerate() {
        let Some(attribute) = attribute else {
            continue;
        };
        changes.insert(attribute.clone(), AttributeChange::from_cell(row.text(offset + 1)));
    }

    if changes.is_empty() || changes.only_deletes() {
        return RowOutcome::NothingToChange { login };
    }

    RowOutcome::Ready(PreparedRow {
        line: row.line,
        login,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adsheet::tools::headers::normalize_headers;

    fn mapping(headers: &[&str]) -> HeaderMapping {
        let raw: Vec<String> = headers.iter().map(|header| header.to_string()).collect();
        normalize_headers(&raw).expect("valid headers")
    }

    fn row(line: usize, cells: &[Option<&str>]) -> SheetRow {
        SheetRow::new(line, cells.iter().map(|cell| cell.map(String::from)).collect())
    }

    fn ready(outcome: RowOutcome) -> PreparedRow {
        match outcome {
            RowOutcome::Ready(prepared) => prepared,
            other => panic!("expected a ready row, got {other:?}"),
        }
    }

    #[test]
    fn columns_differing_only_in_case_collapse_to_the_last() {
        let mapping = mapping(&["login", "employeeID", "EmployeeID"]);
        let prepared = ready(prepare_row(
            &row(3, &[Some("jdoe"), Some("100"), Some("200")]),
            &mapping,
        ));

        assert_eq!(prepared.changes.len(), 1);
        assert_eq!(
            prepared.changes.get("employeeID"),
            Some(&AttributeChange::Replace("200".into()))
        );
    }

    #[test]
    fn filled_cells_become_replacements() {
        let mapping = mapping(&["login", "telefone", "cargo"]);
        let prepared = ready(prepare_row(
            &row(2, &[Some("jdoe"), Some("5551234"), Some("Engineer")]),
            &mapping,
        ));

        assert_eq!(prepared.login, "jdoe");
        assert_eq!(prepared.line, 2);
        assert_eq!(prepared.changes.len(), 2);
        assert_eq!(
            prepared.changes.get("mobile"),
            Some(&AttributeChange::Replace("5551234".into()))
        );
        assert_eq!(
            prepared.changes.get("title"),
            Some(&AttributeChange::Replace("Engineer".into()))
        );
    }

    #[test]
    fn blank_cells_become_deletes() {
        let mapping = mapping(&["login", "telefone", "cargo"]);
        let prepared = ready(prepare_row(
            &row(3, &[Some(" jdoe "), Some("  "), Some(" Engineer ")]),
            &mapping,
        ));

        assert_eq!(prepared.login, "jdoe");
        assert_eq!(prepared.changes.get("mobile"), Some(&AttributeChange::Delete));
        assert_eq!(
            prepared.changes.get("title"),
            Some(&AttributeChange::Replace("Engineer".into()))
        );
    }

    #[test]
    fn short_rows_delete_trailing_attributes() {
        let mapping = mapping(&["login", "cargo", "telefone"]);
        let prepared = ready(prepare_row(&row(4, &[Some("jdoe"), Some("Chief")]), &mapping));
        assert_eq!(prepared.changes.get("mobile"), Some(&AttributeChange::Delete));
    }

    #[test]
    fn rows_without_login_are_skipped() {
        let mapping = mapping(&["login", "cargo"]);
        assert_eq!(
            prepare_row(&row(5, &[Some("   "), Some("Engineer")]), &mapping),
            RowOutcome::MissingLogin
        );
        assert_eq!(prepare_row(&row(6, &[None, None]), &mapping), RowOutcome::Blank);
    }

    #[test]
    fn rows_with_only_blank_values_change_nothing() {
        let mapping = mapping(&["login", "cargo", "telefone"]);
        assert_eq!(
            prepare_row(&row(7, &[Some("jdoe"), None, Some(" ")]), &mapping),
            RowOutcome::NothingToChange {
                login: "jdoe".into()
            }
        );
    }

    #[test]
    fn unnamed_columns_are_ignored() {
        let mapping = mapping(&["login", ""]);
        assert_eq!(
            prepare_row(&row(8, &[Some("jdoe"), Some("ignored")]), &mapping),
            RowOutcome::NothingToChange {
                login: "jdoe".into()
            }
        );
    }
}
