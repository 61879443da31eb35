use sheetforge::Workbook;
use tempfile::TempDir;

#[test]
fn test_create_and_save_empty_workbook() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.xlsx");

    let wb = Workbook::new();
    wb.save(&path).unwrap();

    assert!(path.exists());
    let metadata = std::fs::metadata(&path).unwrap();
    assert!(metadata.len() > 0);
}

#[test]
fn test_roundtrip_preserves_sheet_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roundtrip.xlsx");

    let wb1 = Workbook::new();
    assert_eq!(wb1.sheet_names(), vec!["Sheet1"]);
    wb1.save(&path).unwrap();

    let wb2 = Workbook::open(&path).unwrap();
    assert_eq!(wb2.sheet_names(), vec!["Sheet1"]);
}

#[test]
fn test_open_nonexistent_returns_io_error() {
    let result = Workbook::open("/tmp/nonexistent_file_12345.xlsx");
    assert!(result.is_err());
}

#[test]
fn test_workbook_default_trait() {
    let wb = Workbook::default();
    assert_eq!(wb.sheet_names(), vec!["Sheet1"]);
}

#[test]
fn test_public_api_reexports() {
    let _wb = sheetforge::Workbook::new();
    let _col = sheetforge::utils::column_name_to_number("A").unwrap();
    let _name = sheetforge::utils::column_number_to_name(1).unwrap();
    let _coords = sheetforge::utils::cell_name_to_coordinates("A1").unwrap();
    let _cell = sheetforge::utils::coordinates_to_cell_name(1, 1).unwrap();
}

#[test]
fn test_error_type_accessible() {
    let err = sheetforge::Error::InvalidCellReference("bad".to_string());
    assert!(err.to_string().contains("bad"));
}

#[test]
fn test_save_and_reopen_multiple_times() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.xlsx");

    let wb = Workbook::new();
    wb.save(&path).unwrap();

    let wb2 = Workbook::open(&path).unwrap();
    let path2 = dir.path().join("multi2.xlsx");
    wb2.save(&path2).unwrap();

    let wb3 = Workbook::open(&path2).unwrap();
    assert_eq!(wb3.sheet_names(), vec!["Sheet1"]);
}

#[test]
fn test_set_cell_value_then_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("values.xlsx");

    let mut wb = Workbook::new();
    wb.set_cell_value("Sheet1", "A1", "hello").unwrap();
    wb.set_cell_value("Sheet1", "A2", 7i64).unwrap();
    wb.save(&path).unwrap();

    let wb2 = Workbook::open(&path).unwrap();
    assert_eq!(wb2.cell_value("Sheet1", "A1").unwrap(), sheetforge::Value::text("hello"));
    assert_eq!(wb2.cell_value("Sheet1", "A2").unwrap(), sheetforge::Value::number(7i64));
}

#[test]
fn test_add_and_rename_sheet_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sheets.xlsx");

    let mut wb = Workbook::new();
    wb.add_sheet("Data").unwrap();
    wb.rename_sheet("Data", "Renamed").unwrap();
    wb.save(&path).unwrap();

    let wb2 = Workbook::open(&path).unwrap();
    assert_eq!(wb2.sheet_names(), vec!["Sheet1", "Renamed"]);
}

#[test]
fn test_editing_an_opened_workbook_only_rewrites_dirty_parts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edit.xlsx");

    let wb = Workbook::new();
    wb.save(&path).unwrap();

    let mut reopened = Workbook::open(&path).unwrap();
    reopened.set_cell_value("Sheet1", "C3", "edited").unwrap();
    let path2 = dir.path().join("edit2.xlsx");
    reopened.save(&path2).unwrap();

    let final_wb = Workbook::open(&path2).unwrap();
    assert_eq!(final_wb.cell_value("Sheet1", "C3").unwrap(), sheetforge::Value::text("edited"));
}
