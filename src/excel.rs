use anyhow::{Result, anyhow};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

/// One worksheet, split into a header row and typed data rows.
///
/// Cells keep their calamine type because the scoring pipeline treats text,
/// numeric and empty cells differently.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

/// Read one sheet from an in-memory xlsx workbook.
///
/// `sheet_name = None` selects the first sheet of the workbook.
pub fn read_sheet(bytes: &[u8], sheet_name: Option<&str>) -> Result<SheetData> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| anyhow!("Failed to open workbook: {}", e))?;

    let sheets = workbook.sheet_names().to_owned();
    if sheets.is_empty() {
        return Err(anyhow!("Workbook contains no sheets"));
    }

    let name = match sheet_name {
        Some(name) => {
            if !sheets.iter().any(|s| s == name) {
                return Err(anyhow!(
                    "Workbook has no sheet named '{}' (available: {})",
                    name,
                    sheets.join(", ")
                ));
            }
            name.to_string()
        }
        None => sheets[0].clone(),
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| anyhow!("Error reading sheet '{}': {}", name, e))?;

    let mut headers = Vec::new();
    let mut rows = Vec::new();

    for (row_idx, row) in range.rows().enumerate() {
        if row_idx == 0 {
            headers = row.iter().map(|cell| cell.to_string()).collect();
        } else {
            rows.push(row.to_vec());
        }
    }

    Ok(SheetData { name, headers, rows })
}

impl SheetData {
    /// Position of the first column whose trimmed header matches `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
