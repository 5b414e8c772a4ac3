use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::adsheet::tools::error::{Result, ToolError};
use crate::adsheet::tools::headers::synthesized_headers;
use crate::adsheet::tools::model::SheetRow;

/// Header texts and data rows read from one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

/// Reads the worksheet `sheet` (or the first sheet when `None`) from the
/// workbook at `path`.
///
/// With `has_header` the first line provides the column names; otherwise
/// placeholder names `col1..colN` are generated and every line is data.
pub fn read_table(path: &Path, sheet: Option<&str>, has_header: bool) -> Result<SheetData> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ToolError::MissingSheet("<first>".into()))?,
    };
    let range = read_required_sheet(&mut workbook, &sheet_name)?;
    debug!(sheet = %sheet_name, "worksheet loaded");

    Ok(range_to_table(&range, has_header))
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::MissingSheet(name.to_string()))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn range_to_table(range: &Range<DataType>, has_header: bool) -> SheetData {
    // calamine trims leading empty rows and columns; put them back so line
    // numbers and column positions match the spreadsheet.
    let (first_row, first_col) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut lines = range.rows().enumerate().map(|(offset, cells)| {
        let mut values = vec![None; first_col];
        values.extend(cells.iter().map(cell_to_text));
        (first_row + offset + 1, values)
    });

    let headers = if has_header {
        match lines.next() {
            Some((_, cells)) => cells.into_iter().map(Option::unwrap_or_default).collect(),
            None => return SheetData::default(),
        }
    } else {
        let width = range.width();
        if width == 0 {
            return SheetData::default();
        }
        synthesized_headers(first_col + width)
    };

    let rows = lines
        .map(|(line, cells)| SheetRow::new(line, cells))
        .collect();

    SheetData { headers, rows }
}

fn cell_to_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::Empty => None,
        DataType::String(value) => Some(value.clone()),
        DataType::Float(value) => Some(value.to_string()),
        DataType::Int(value) => Some(value.to_string()),
        DataType::Bool(value) => Some(value.to_string()),
        // Whole serials carry no time of day.
        DataType::DateTime(serial) => Some(match cell.as_datetime() {
            Some(moment) if serial.fract() == 0.0 => moment.format("%Y-%m-%d").to_string(),
            Some(moment) => moment.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => serial.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_render_without_fraction() {
        assert_eq!(cell_to_text(&DataType::Float(5551234.0)), Some("5551234".into()));
        assert_eq!(cell_to_text(&DataType::Int(42)), Some("42".into()));
        assert_eq!(cell_to_text(&DataType::Empty), None);
    }

    #[test]
    fn date_cells_render_as_calendar_dates() {
        assert_eq!(cell_to_text(&DataType::DateTime(45292.0)), Some("2024-01-01".into()));
        assert_eq!(
            cell_to_text(&DataType::DateTime(45292.5)),
            Some("2024-01-01 12:00:00".into())
        );
    }

    #[test]
    fn header_row_is_split_from_data() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), DataType::String("login".into()));
        range.set_value((0, 1), DataType::String("cargo".into()));
        range.set_value((1, 0), DataType::String("jdoe".into()));
        range.set_value((1, 1), DataType::String("Engineer".into()));
        range.set_value((2, 0), DataType::String("asmith".into()));

        let table = range_to_table(&range, true);
        assert_eq!(table.headers, vec!["login".to_string(), "cargo".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].text(0), Some("asmith"));
        assert_eq!(table.rows[1].text(1), None);
    }

    #[test]
    fn leading_gaps_are_preserved() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), DataType::String("login".into()));
        range.set_value((2, 2), DataType::String("cargo".into()));
        range.set_value((3, 1), DataType::String("jdoe".into()));
        range.set_value((3, 2), DataType::String("Engineer".into()));

        let table = range_to_table(&range, true);
        assert_eq!(table.headers, vec![String::new(), "login".into(), "cargo".into()]);
        assert_eq!(table.rows[0].line, 4);
        assert_eq!(table.rows[0].text(1), Some("jdoe"));
    }

    #[test]
    fn missing_header_synthesizes_column_names() {
        let mut range = Range::new((0, 0), (0, 1));
        range.set_value((0, 0), DataType::String("jdoe".into()));
        range.set_value((0, 1), DataType::String("Engineer".into()));

        let table = range_to_table(&range, false);
        assert_eq!(table.headers, vec!["col1".to_string(), "col2".to_string()]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].line, 1);
    }
}
