use anyhow::Result;
use autopivot::cell::to_a1;

fn main() -> Result<()> {
    let mut book = umya_spreadsheet::new_file();

    let sheet = book.get_active_sheet_mut();
    sheet.set_name("AutoComplete");

    // Padded header on purpose: the loader trims column names.
    let headers = ["Id", " segment3", "segment4", "SnapDate ", "Volume"];
    for (i, header) in headers.iter().enumerate() {
        sheet.get_cell_mut(to_a1(i as u32 + 1, 1).as_str()).set_value(*header);
    }

    let rows = [
        ("Product Not Appropriate", "Valid", "2025-08-01 09:30:00", 10.0),
        ("Product Not Appropriate", "Invalid", "2025-08-01 16:05:00", 5.0),
        ("Product Not Appropriate", "Invalid", "2025-08-08", 4.0),
        ("Product Not Appropriate", "Valid", "2025-08-08", 12.0),
        ("Product Not Appropriate", "Invalid", "2025-08-15", 7.0),
        ("Other", "Valid", "2025-08-01", 99.0),
    ];
    for (i, (segment3, segment4, snap_date, volume)) in rows.iter().enumerate() {
        let row = i as u32 + 2;
        sheet.get_cell_mut(to_a1(1, row).as_str()).set_value_number(i as f64 + 1.0);
        sheet.get_cell_mut(to_a1(2, row).as_str()).set_value(*segment3);
        sheet.get_cell_mut(to_a1(3, row).as_str()).set_value(*segment4);
        sheet.get_cell_mut(to_a1(4, row).as_str()).set_value(*snap_date);
        sheet.get_cell_mut(to_a1(5, row).as_str()).set_value_number(*volume);
    }

    umya_spreadsheet::writer::xlsx::write(&book, "AP_08082025.xlsx")?;
    println!("Wrote AP_08082025.xlsx");
    Ok(())
}
