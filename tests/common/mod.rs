#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Creates (if needed) and returns a sub-folder of the workspace.
    pub fn dir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("create sub dir");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read workspace file")
    }
}

/// Workbook with a title banner above a two-column table of three rows.
///
/// Sheet `Clientes`: row 1 banner, row 2 header (`Cliente`, `Ciudad`), rows 3-5 data.
pub fn write_banner_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name("Clientes")
        .expect("sheet name");
    sheet
        .write_string(0, 0, "Informe trimestral de clientes")
        .expect("banner");
    sheet.write_string(1, 0, "Cliente").expect("header");
    sheet.write_string(1, 1, "Ciudad").expect("header");
    for (idx, (name, city)) in [("Ada", "Lima"), ("Grace", "Quito"), ("Linus", "Cusco")]
        .iter()
        .enumerate()
    {
        let row = 2 + idx as u32;
        sheet.write_string(row, 0, *name).expect("name");
        sheet.write_string(row, 1, *city).expect("city");
    }
    workbook.save(path).expect("save workbook");
}

/// Workbook with a `Pagos` sheet holding a real date cell and a text placeholder in a
/// date-named column, plus an empty `Notas` sheet.
pub fn write_payments_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook
        .add_worksheet()
        .set_name("Pagos")
        .expect("sheet name");
    sheet.write_string(0, 0, "Fecha Pago").expect("header");
    sheet.write_string(0, 1, "Monto").expect("header");
    let date = ExcelDateTime::from_ymd(2024, 1, 5).expect("valid date");
    sheet
        .write_datetime_with_format(1, 0, &date, &date_format)
        .expect("date");
    sheet.write_number(1, 1, 10.5).expect("amount");
    sheet.write_string(2, 0, "sin fecha").expect("text");
    sheet.write_number(2, 1, 20.25).expect("amount");
    workbook
        .add_worksheet()
        .set_name("Notas")
        .expect("sheet name");
    workbook.save(path).expect("save workbook");
}

/// Sheet `Totales`: header `Id`, `Total`, `Total`, `Total 2` over one row of whole numbers.
pub fn write_totals_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name("Totales")
        .expect("sheet name");
    for (col, name) in ["Id", "Total", "Total", "Total 2"].iter().enumerate() {
        sheet.write_string(0, col as u16, *name).expect("header");
    }
    for (col, value) in [12345.0, 1.0, 2.0, 3.5].iter().enumerate() {
        sheet.write_number(1, col as u16, *value).expect("number");
    }
    workbook.save(path).expect("save workbook");
}
