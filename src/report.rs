use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use umya_spreadsheet::Worksheet;
use umya_spreadsheet::structs::{Border, HorizontalAlignmentValues, PatternValues, Style};

use crate::aggregate::WeeklyAggregate;
use crate::cell::{CellValue, column_number_to_name, date_to_serial, datetime_to_serial, to_a1};
use crate::config::PivotConfig;
use crate::loader::SourceTable;

/// First data row of the pivot table (1-based, below the two header rows).
pub const DATA_START_ROW: u32 = 7;

const DATE_FORMAT: &str = "mm/dd/yyyy";
const PERCENT_FORMAT: &str = "0.0%";
// Lower-case hex keeps umya from mapping these onto its indexed palette.
const TITLE_FILL: &str = "ff9ccb19";
const HEADER_FILL: &str = "ffdaeef3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Title,
    Label,
    Plain,
    Header,
    Number,
    Percent,
    Date,
}

/// A live spreadsheet formula and the cells it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    /// Formula text without the leading `=`.
    pub expression: String,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Blank,
    Text(String),
    Date(Option<NaiveDate>),
    Number(f64),
    Formula(Formula),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCell {
    pub col: u32,
    pub row: u32,
    pub content: Content,
    pub style: CellStyle,
}

/// Everything drawn on the pivot sheet, independent of the workbook library.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PivotLayout {
    pub cells: Vec<PlacedCell>,
    pub merges: Vec<String>,
    pub widths: Vec<(u32, f64)>,
}

impl PivotLayout {
    pub fn build(title: &str, category: &str, weeks: &[WeeklyAggregate]) -> Self {
        let mut layout = Self::default();

        layout.merge(1, 1, 8, 1);
        layout.put(1, 1, Content::Text(title.to_string()), CellStyle::Title);
        for col in 2..=8 {
            layout.put(col, 1, Content::Blank, CellStyle::Title);
        }

        layout.put(
            1,
            3,
            Content::Text("Product Appropriateness Result".to_string()),
            CellStyle::Label,
        );
        layout.put(2, 3, Content::Text(category.to_string()), CellStyle::Plain);

        layout.header(1, 5, "Event Ending Week");
        layout.merge(2, 5, 3, 5);
        layout.header(2, 5, "Valid");
        layout.put(3, 5, Content::Blank, CellStyle::Header);
        layout.merge(4, 5, 5, 5);
        layout.header(4, 5, "Total");
        layout.put(5, 5, Content::Blank, CellStyle::Header);

        layout.header(2, 6, "Sum of Volume");
        layout.header(3, 6, "% of Volume");
        layout.header(4, 6, "Total Sum of Volume");
        layout.header(5, 6, "Total %");

        for (i, week) in weeks.iter().enumerate() {
            let row = DATA_START_ROW + i as u32;
            layout.put(1, row, Content::Date(week.week_ending_date), CellStyle::Date);
            layout.put(2, row, Content::Number(week.valid_sum), CellStyle::Number);
            layout.put(3, row, Content::Number(week.valid_ratio), CellStyle::Percent);
            layout.put(4, row, Content::Number(week.total_sum), CellStyle::Number);
            layout.put(5, row, Content::Number(week.total_ratio), CellStyle::Percent);
        }

        let total_row = DATA_START_ROW + weeks.len() as u32;
        layout.header(1, total_row, "Grand Total");
        if !weeks.is_empty() {
            for (col, formula, style) in grand_total_formulas(weeks.len() as u32) {
                layout.put(col, total_row, Content::Formula(formula), style);
            }
        }

        layout.widths.push((1, 18.0));
        for col in 2..=5 {
            layout.widths.push((col, 20.0));
        }

        layout
    }

    pub fn cell(&self, a1: &str) -> Option<&PlacedCell> {
        self.cells.iter().find(|c| to_a1(c.col, c.row) == a1)
    }

    fn put(&mut self, col: u32, row: u32, content: Content, style: CellStyle) {
        self.cells.push(PlacedCell {
            col,
            row,
            content,
            style,
        });
    }

    fn header(&mut self, col: u32, row: u32, text: &str) {
        self.put(col, row, Content::Text(text.to_string()), CellStyle::Header);
    }

    fn merge(&mut self, first_col: u32, first_row: u32, last_col: u32, last_row: u32) {
        self.merges.push(format!(
            "{}:{}",
            to_a1(first_col, first_row),
            to_a1(last_col, last_row)
        ));
    }
}

/// Grand-total cells for `count` data rows starting at `DATA_START_ROW`.
///
/// The last column divides the total cell by itself, so it reads 1 unless the total is 0.
fn grand_total_formulas(count: u32) -> Vec<(u32, Formula, CellStyle)> {
    let first = DATA_START_ROW;
    let last = DATA_START_ROW + count - 1;
    let total = last + 1;
    let valid = format!("B{first}:B{last}");
    let all = format!("D{first}:D{last}");

    vec![
        (
            2,
            Formula {
                expression: format!("SUM({valid})"),
                range: valid.clone(),
            },
            CellStyle::Number,
        ),
        (
            3,
            Formula {
                expression: format!("IF(SUM({all})=0,0,SUM({valid})/SUM({all}))"),
                range: format!("B{first}:D{last}"),
            },
            CellStyle::Percent,
        ),
        (
            4,
            Formula {
                expression: format!("SUM({all})"),
                range: all.clone(),
            },
            CellStyle::Number,
        ),
        (
            5,
            Formula {
                expression: format!("IF(D{total}=0,0,D{total}/D{total})"),
                range: format!("D{total}"),
            },
            CellStyle::Percent,
        ),
    ]
}

fn fill_style(style: &mut Style, argb: &str) {
    let pattern = style.get_fill_mut().get_pattern_fill_mut();
    pattern.set_pattern_type(PatternValues::Solid);
    pattern.get_foreground_color_mut().set_argb(argb);
    pattern.get_background_color_mut().set_argb(argb);
}

fn thin_border(style: &mut Style) {
    let borders = style.get_borders_mut();
    borders.get_left_mut().set_border_style(Border::BORDER_THIN);
    borders.get_right_mut().set_border_style(Border::BORDER_THIN);
    borders.get_top_mut().set_border_style(Border::BORDER_THIN);
    borders.get_bottom_mut().set_border_style(Border::BORDER_THIN);
}

fn boxed_center() -> Style {
    let mut style = Style::default();
    thin_border(&mut style);
    style
        .get_alignment_mut()
        .set_horizontal(HorizontalAlignmentValues::Center);
    style
}

fn date_style() -> Style {
    let mut style = Style::default();
    style.get_number_format_mut().set_format_code(DATE_FORMAT);
    style
}

fn column_header_style() -> Style {
    let mut style = boxed_center();
    style.get_font_mut().set_bold(true);
    style
}

fn build_style(kind: CellStyle) -> Style {
    match kind {
        CellStyle::Title => {
            let mut style = Style::default();
            style.get_font_mut().set_bold(true);
            style.get_font_mut().set_size(12.0);
            fill_style(&mut style, TITLE_FILL);
            style
                .get_alignment_mut()
                .set_horizontal(HorizontalAlignmentValues::Left);
            style
        }
        CellStyle::Label => {
            let mut style = Style::default();
            style.get_font_mut().set_bold(true);
            style
        }
        CellStyle::Plain => Style::default(),
        CellStyle::Header => {
            let mut style = column_header_style();
            fill_style(&mut style, HEADER_FILL);
            style
        }
        CellStyle::Number => boxed_center(),
        CellStyle::Percent => {
            let mut style = boxed_center();
            style.get_number_format_mut().set_format_code(PERCENT_FORMAT);
            style
        }
        CellStyle::Date => {
            let mut style = boxed_center();
            style.get_number_format_mut().set_format_code(DATE_FORMAT);
            style
        }
    }
}

/// Draws `layout` onto `sheet`.
pub fn apply_layout(sheet: &mut Worksheet, layout: &PivotLayout) {
    for placed in &layout.cells {
        let addr = to_a1(placed.col, placed.row);
        let cell = sheet.get_cell_mut(addr.as_str());
        match &placed.content {
            Content::Blank | Content::Date(None) => {}
            Content::Text(text) => {
                cell.set_value(text.as_str());
            }
            Content::Date(Some(day)) => {
                cell.set_value_number(date_to_serial(*day));
            }
            Content::Number(n) => {
                cell.set_value_number(*n);
            }
            Content::Formula(formula) => {
                cell.set_formula(formula.expression.as_str());
            }
        }
        cell.set_style(build_style(placed.style));
    }

    for range in &layout.merges {
        sheet.add_merge_cells(range.as_str());
    }

    for &(col, width) in &layout.widths {
        sheet
            .get_column_dimension_mut(&column_number_to_name(col))
            .set_width(width);
    }
}

/// Writes the normalized source table verbatim, header row first.
pub fn write_source_sheet(sheet: &mut Worksheet, table: &SourceTable) {
    let header_style = column_header_style();
    for (i, header) in table.headers().iter().enumerate() {
        let addr = to_a1(i as u32 + 1, 1);
        let cell = sheet.get_cell_mut(addr.as_str());
        cell.set_value(header.as_str());
        cell.set_style(header_style.clone());
    }

    let dates = date_style();
    for (r, row) in table.cells().iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let addr = to_a1(c as u32 + 1, r as u32 + 2);
            match value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    sheet.get_cell_mut(addr.as_str()).set_value(s.as_str());
                }
                CellValue::Number(n) => {
                    sheet.get_cell_mut(addr.as_str()).set_value_number(*n);
                }
                CellValue::Bool(b) => {
                    sheet.get_cell_mut(addr.as_str()).set_value_bool(*b);
                }
                CellValue::DateTime(dt) => {
                    let cell = sheet.get_cell_mut(addr.as_str());
                    cell.set_value_number(datetime_to_serial(*dt));
                    cell.set_style(dates.clone());
                }
            }
        }
    }
}

/// Writes the two-sheet output workbook: passthrough data, then the pivot report.
pub fn write_workbook(
    output_path: &Path,
    table: &SourceTable,
    weeks: &[WeeklyAggregate],
    config: &PivotConfig,
) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();

    let sheet = book.get_active_sheet_mut();
    sheet.set_name(config.sheet_name.as_str());
    write_source_sheet(sheet, table);

    let layout = PivotLayout::build(&config.report_title(), &config.category_filter, weeks);
    let pivot = book
        .new_sheet(config.pivot_sheet_name.as_str())
        .map_err(|e| anyhow!("cannot add sheet {}: {e}", config.pivot_sheet_name))?;
    apply_layout(pivot, &layout);

    umya_spreadsheet::writer::xlsx::write(&book, output_path)
        .with_context(|| format!("cannot save workbook: {}", output_path.display()))?;

    tracing::info!(path = %output_path.display(), weeks = weeks.len(), "wrote pivot workbook");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(d: u32, valid: f64, total: f64) -> WeeklyAggregate {
        WeeklyAggregate {
            week_ending_date: NaiveDate::from_ymd_opt(2025, 8, d),
            valid_sum: valid,
            valid_ratio: if total > 0.0 { valid / total } else { 0.0 },
            total_sum: total,
            total_ratio: 1.0,
        }
    }

    fn formula_at(layout: &PivotLayout, a1: &str) -> Formula {
        match &layout.cell(a1).expect(a1).content {
            Content::Formula(f) => f.clone(),
            other => panic!("{a1} is not a formula: {other:?}"),
        }
    }

    #[test]
    fn headers_and_title_are_placed() {
        let layout = PivotLayout::build("Text Rationale Validity of X", "X", &[]);
        assert_eq!(
            layout.cell("A1").unwrap().content,
            Content::Text("Text Rationale Validity of X".into())
        );
        assert_eq!(layout.cell("B3").unwrap().content, Content::Text("X".into()));
        assert_eq!(
            layout.cell("A5").unwrap().content,
            Content::Text("Event Ending Week".into())
        );
        assert_eq!(layout.cell("D6").unwrap().content, Content::Text("Total Sum of Volume".into()));
        assert_eq!(layout.merges, vec!["A1:H1", "B5:C5", "D5:E5"]);
        assert_eq!(
            layout.widths,
            vec![(1, 18.0), (2, 20.0), (3, 20.0), (4, 20.0), (5, 20.0)]
        );
    }

    #[test]
    fn empty_report_has_bare_grand_total() {
        let layout = PivotLayout::build("t", "c", &[]);
        let total = layout.cell("A7").unwrap();
        assert_eq!(total.content, Content::Text("Grand Total".into()));
        assert_eq!(total.style, CellStyle::Header);
        assert!(layout.cells.iter().all(|c| c.row <= 7));
        assert!(
            !layout
                .cells
                .iter()
                .any(|c| matches!(c.content, Content::Formula(_)))
        );
    }

    #[test]
    fn data_rows_then_formula_row() {
        let weeks = vec![week(1, 10.0, 15.0), week(8, 0.0, 4.0)];
        let layout = PivotLayout::build("t", "c", &weeks);

        assert_eq!(
            layout.cell("A7").unwrap().content,
            Content::Date(NaiveDate::from_ymd_opt(2025, 8, 1))
        );
        assert_eq!(layout.cell("B7").unwrap().content, Content::Number(10.0));
        assert_eq!(layout.cell("C8").unwrap().style, CellStyle::Percent);
        assert_eq!(layout.cell("E8").unwrap().content, Content::Number(1.0));
        assert_eq!(
            layout.cell("A9").unwrap().content,
            Content::Text("Grand Total".into())
        );

        assert_eq!(
            formula_at(&layout, "B9"),
            Formula {
                expression: "SUM(B7:B8)".into(),
                range: "B7:B8".into()
            }
        );
        assert_eq!(
            formula_at(&layout, "C9").expression,
            "IF(SUM(D7:D8)=0,0,SUM(B7:B8)/SUM(D7:D8))"
        );
        assert_eq!(formula_at(&layout, "D9").expression, "SUM(D7:D8)");
        assert_eq!(formula_at(&layout, "E9").expression, "IF(D9=0,0,D9/D9)");
        assert_eq!(formula_at(&layout, "E9").range, "D9");
    }

    #[test]
    fn single_week_formulas_cover_one_row() {
        let layout = PivotLayout::build("t", "c", &[week(1, 10.0, 15.0)]);
        assert_eq!(formula_at(&layout, "B8").expression, "SUM(B7:B7)");
        assert_eq!(formula_at(&layout, "E8").expression, "IF(D8=0,0,D8/D8)");
    }

    #[test]
    fn undated_week_leaves_date_blank() {
        let mut undated = week(1, 1.0, 2.0);
        undated.week_ending_date = None;
        let layout = PivotLayout::build("t", "c", &[undated]);
        assert_eq!(layout.cell("A7").unwrap().content, Content::Date(None));
        assert_eq!(layout.cell("A7").unwrap().style, CellStyle::Date);
    }
}
