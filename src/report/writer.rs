use crate::report::scoring::ReportTables;
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

/// Column layout of the three sheets. Sheet names and column order are part
/// of the external contract; downstream dashboards read them by name.
const GROUPED_HEADERS: [&str; 8] = [
    "ID",
    "Empresa",
    "Tamaño",
    "Pais",
    "Seccion",
    "Tamaño de empresa",
    "Puntaje",
    "Puntaje Seccion",
];
const COMPANY_HEADERS: [&str; 3] = ["ID", "Empresa", "Porcentaje Total"];
const COUNTRY_HEADERS: [&str; 4] = ["Pais", "Seccion", "Puntaje", "Puntaje Seccion"];

pub const COMPANIES_SHEET: &str = "General por empresas";
pub const COUNTRIES_SHEET: &str = "General por paises";

/// Serialize the three result tables into a single xlsx workbook in memory.
pub fn write_workbook(tables: &ReportTables) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    // Sheet 1 keeps the default name; consumers address it positionally.
    let sheet = workbook.add_worksheet();
    write_headers(sheet, &GROUPED_HEADERS, &header_format)?;
    for (idx, row) in tables.rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, &row.id)?;
        sheet.write_string(r, 1, &row.company)?;
        sheet.write_string(r, 2, &row.size_path)?;
        sheet.write_string(r, 3, &row.country)?;
        sheet.write_string(r, 4, &row.section)?;
        sheet.write_string(r, 5, &row.size_category)?;
        sheet.write_number(r, 6, row.points)?;
        sheet.write_number(r, 7, row.section_total)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(COMPANIES_SHEET)?;
    write_headers(sheet, &COMPANY_HEADERS, &header_format)?;
    for (idx, company) in tables.companies.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, &company.id)?;
        sheet.write_string(r, 1, &company.company)?;
        sheet.write_number(r, 2, company.percentage_total)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(COUNTRIES_SHEET)?;
    write_headers(sheet, &COUNTRY_HEADERS, &header_format)?;
    for (idx, average) in tables.countries.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, &average.country)?;
        sheet.write_string(r, 1, &average.section)?;
        sheet.write_number(r, 2, average.points)?;
        sheet.write_number(r, 3, average.section_total)?;
    }

    workbook
        .save_to_buffer()
        .context("Failed to serialize report workbook")
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}
