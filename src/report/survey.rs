use crate::excel::SheetData;
use anyhow::{Result, anyhow};
use calamine::Data;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Column-name marker of the company-name question.
const COMPANY_NAME_MARKER: &str = "Pg001";
/// Answer codes of the country question.
const COSTA_RICA_MARKER: &str = "[Pg011.01]";
const PANAMA_MARKER: &str = "[Pg011.02]";

/// First bracketed answer code embedded in a free-text cell, e.g. `[Pc012.01]`.
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Za-z0-9_.]+)\]").expect("valid answer-code pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    CostaRica,
    Panama,
    Unknown,
}

impl Country {
    pub fn label(self) -> &'static str {
        match self {
            Country::CostaRica => "Costa Rica",
            Country::Panama => "Panamá",
            Country::Unknown => "",
        }
    }
}

/// Estimated company-size class, derived from country-specific answer codes.
/// Independent of which rule branch an answer later matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCategory {
    Micro,
    Pequena,
    Mediana,
    Grande,
    Desconocido,
}

impl SizeCategory {
    pub fn label(self) -> &'static str {
        match self {
            SizeCategory::Micro => "Micro",
            SizeCategory::Pequena => "Pequeña",
            SizeCategory::Mediana => "Mediana",
            SizeCategory::Grande => "Grande",
            SizeCategory::Desconocido => "Desconocido",
        }
    }
}

/// Per-respondent data gathered from the survey row.
#[derive(Debug, Clone)]
pub struct CompanyProfile {
    pub name: String,
    pub country: Country,
    pub size: SizeCategory,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            country: Country::Unknown,
            size: SizeCategory::Desconocido,
        }
    }
}

/// Position of the respondent-id column.
///
/// Falls back to the first column when no column is named `ID`; the source
/// form occasionally exports the key under a localized header.
pub fn respondent_column(sheet: &SheetData) -> Result<usize> {
    if sheet.headers.is_empty() {
        return Err(anyhow!("Survey sheet '{}' has no header row", sheet.name));
    }
    match sheet.headers.iter().position(|h| h == "ID") {
        Some(idx) => Ok(idx),
        None => {
            warn!(
                "Survey sheet has no 'ID' column, using first column '{}' as respondent id",
                sheet.headers[0]
            );
            Ok(0)
        }
    }
}

/// Build one [`CompanyProfile`] per respondent id.
///
/// Cells are visited strictly in column order and later matches overwrite
/// earlier ones. The size-category codes are country-prefixed, so a row only
/// classifies correctly when its country marker appears in an earlier column
/// than its size marker. That coupling is deployed behavior the downstream
/// report relies on; it is covered by tests instead of being reordered away.
pub fn scan_companies(sheet: &SheetData, id_col: usize) -> HashMap<String, CompanyProfile> {
    let mut profiles: HashMap<String, CompanyProfile> = HashMap::new();

    for row in &sheet.rows {
        let Some(id_cell) = row.get(id_col) else {
            continue;
        };
        let id = id_cell.to_string();
        let profile = profiles.entry(id).or_default();

        for (column, cell) in sheet.headers.iter().zip(row.iter()) {
            let Data::String(value) = cell else {
                continue;
            };

            if column.contains(COMPANY_NAME_MARKER) {
                profile.name = value.clone();
            }

            if value.contains(COSTA_RICA_MARKER) {
                profile.country = Country::CostaRica;
            } else if value.contains(PANAMA_MARKER) {
                profile.country = Country::Panama;
            }

            match profile.country {
                Country::Panama => {
                    if value.contains("[Pa012.01]") {
                        profile.size = SizeCategory::Micro;
                    } else if value.contains("[Pa012.02]") {
                        profile.size = SizeCategory::Pequena;
                    } else if value.contains("[Pa012.03]") {
                        profile.size = SizeCategory::Mediana;
                    } else if value.contains("[Pa012.04]") || value.contains("[Pa012.05]") {
                        profile.size = SizeCategory::Grande;
                    }
                }
                Country::CostaRica => {
                    if value.contains("[Pc012.01]") {
                        profile.size = SizeCategory::Micro;
                    } else if value.contains("[Pc012.02]") {
                        profile.size = SizeCategory::Pequena;
                    } else if value.contains("[Pc012.03]") || value.contains("[Pc012.04]") {
                        profile.size = SizeCategory::Mediana;
                    } else if value.contains("[Pc012.05]") || value.contains("[Pc012.06]") {
                        profile.size = SizeCategory::Grande;
                    }
                }
                Country::Unknown => {}
            }
        }
    }

    debug!("Scanned {} respondent profiles", profiles.len());
    profiles
}

/// First bracketed answer code in a cell, if any. A cell with several codes
/// only contributes the first one.
pub fn extract_code(text: &str) -> Option<&str> {
    CODE_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
