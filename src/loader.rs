use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveTime};

use crate::cell::{CellValue, datatype_to_string};
use crate::error::PivotError;

pub const SEGMENT3: &str = "segment3";
pub const SEGMENT4: &str = "segment4";
pub const SNAP_DATE: &str = "SnapDate";
pub const VOLUME: &str = "Volume";

const REQUIRED_COLUMNS: [&str; 4] = [SEGMENT3, SEGMENT4, SNAP_DATE, VOLUME];

/// Typed view of one source record, the only fields the aggregation reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub segment3: String,
    pub segment4: String,
    pub snap_date: Option<NaiveDate>,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    segment3: usize,
    segment4: usize,
    snap_date: usize,
    volume: usize,
}

/// The whole source sheet after header trimming and `SnapDate` normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    headers: Vec<String>,
    cells: Vec<Vec<CellValue>>,
    columns: ColumnIndex,
    unparsed_dates: usize,
}

impl SourceTable {
    /// Builds the table from a header row and data rows already read from a sheet.
    ///
    /// Headers are trimmed, blank ones are named `Unnamed: <index>`. Short rows are
    /// padded with empty cells. Every `SnapDate` cell is replaced by midnight of its
    /// calendar day, or by an empty cell when it cannot be read as a date.
    pub fn from_grid(
        sheet: &str,
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, PivotError> {
        let headers: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() {
                    format!("Unnamed: {i}")
                } else {
                    h.to_string()
                }
            })
            .collect();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(**name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(PivotError::MissingColumns {
                sheet: sheet.to_string(),
                columns: missing,
            });
        }

        // All four are present at this point.
        let columns = ColumnIndex {
            segment3: position(SEGMENT3).unwrap_or_default(),
            segment4: position(SEGMENT4).unwrap_or_default(),
            snap_date: position(SNAP_DATE).unwrap_or_default(),
            volume: position(VOLUME).unwrap_or_default(),
        };

        let width = headers.len();
        let mut unparsed_dates = 0;
        let cells = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                let raw = &row[columns.snap_date];
                let normalized = match raw.as_date() {
                    Some(day) => CellValue::DateTime(day.and_time(NaiveTime::MIN)),
                    None => {
                        if *raw != CellValue::Empty {
                            unparsed_dates += 1;
                        }
                        CellValue::Empty
                    }
                };
                row[columns.snap_date] = normalized;
                row
            })
            .collect();

        Ok(Self {
            headers,
            cells,
            columns,
            unparsed_dates,
        })
    }

    /// Header row first, remaining rows of the range as data.
    pub fn from_range(sheet: &str, range: &Range<Data>) -> Result<Self, PivotError> {
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(|c| datatype_to_string(Some(c))).collect())
            .unwrap_or_default();
        let data: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(CellValue::from_data).collect())
            .collect();
        Self::from_grid(sheet, headers, data)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn cells(&self) -> &[Vec<CellValue>] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Count of non-empty `SnapDate` cells that could not be read as a date.
    pub fn unparsed_dates(&self) -> usize {
        self.unparsed_dates
    }

    pub fn records(&self) -> Vec<Row> {
        let c = self.columns;
        self.cells
            .iter()
            .map(|row| Row {
                segment3: row[c.segment3].as_text(),
                segment4: row[c.segment4].as_text(),
                snap_date: row[c.snap_date].as_date(),
                volume: row[c.volume].as_number().unwrap_or(0.0),
            })
            .collect()
    }
}

pub fn load_table(file_path: &Path, sheet_name: &str) -> Result<SourceTable> {
    let mut workbook = open_workbook_auto(file_path)
        .with_context(|| format!("cannot open workbook: {}", file_path.display()))?;

    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(anyhow!(
            "sheet {sheet_name} not found in {}",
            file_path.display()
        ));
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("cannot read sheet: {sheet_name}"))?;

    let table = SourceTable::from_range(sheet_name, &range)?;
    tracing::info!(
        sheet = sheet_name,
        rows = table.len(),
        columns = table.headers().len(),
        "loaded source sheet"
    );
    if table.unparsed_dates() > 0 {
        tracing::warn!(
            count = table.unparsed_dates(),
            "{SNAP_DATE} values could not be read as dates and were left blank"
        );
    }
    Ok(table)
}
