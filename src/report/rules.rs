use crate::excel::SheetData;
use anyhow::{Result, anyhow};
use calamine::Data;
use log::debug;
use std::collections::HashMap;

/// Which rule branch an answer code matched against. Selects the scoring
/// denominator; distinct from the respondent's estimated size category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePath {
    Pequena,
    Mediana,
}

impl SizePath {
    pub fn label(self) -> &'static str {
        match self {
            SizePath::Pequena => "Pequeña",
            SizePath::Mediana => "Mediana",
        }
    }
}

/// One row of the scoring-rules table.
#[derive(Debug, Clone)]
pub struct ScoreRule {
    pub section: String,
    pub points: f64,
    pub small_code: Option<String>,
    pub medium_code: Option<String>,
}

/// Lookup structures built once per run from the full rules table.
#[derive(Debug)]
pub struct RuleIndex {
    rules: Vec<ScoreRule>,
    small_totals: HashMap<String, f64>,
    medium_totals: HashMap<String, f64>,
}

impl RuleIndex {
    pub fn build(sheet: &SheetData) -> Result<Self> {
        let section_col = required_column(sheet, "Seccion")?;
        let points_col = required_column(sheet, "Puntaje")?;
        let small_col = required_column(sheet, "Respuesta Pequeña")?;
        let medium_col = required_column(sheet, "Respuesta Mediana")?;

        let mut rules = Vec::with_capacity(sheet.rows.len());
        let mut small_totals: HashMap<String, f64> = HashMap::new();
        let mut medium_totals: HashMap<String, f64> = HashMap::new();

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let section = match row.get(section_col) {
                Some(Data::Empty) | None => continue,
                Some(cell) => cell.to_string().trim().to_string(),
            };
            if section.is_empty() {
                continue;
            }

            let points = points_value(row.get(points_col)).ok_or_else(|| {
                anyhow!(
                    "Rules table row {} has a non-numeric 'Puntaje' value",
                    row_idx + 2
                )
            })?;

            let small_code = answer_code(row.get(small_col));
            let medium_code = answer_code(row.get(medium_col));

            // An empty code cell is excluded from its branch total; a rule
            // with both codes populated contributes to both.
            if small_code.is_some() {
                *small_totals.entry(section.clone()).or_insert(0.0) += points;
            }
            if medium_code.is_some() {
                *medium_totals.entry(section.clone()).or_insert(0.0) += points;
            }

            rules.push(ScoreRule {
                section,
                points,
                small_code,
                medium_code,
            });
        }

        debug!(
            "Indexed {} scoring rules over {} sections",
            rules.len(),
            small_totals.len().max(medium_totals.len())
        );

        Ok(Self {
            rules,
            small_totals,
            medium_totals,
        })
    }

    /// Match an answer code against the rules table.
    ///
    /// The first rule row in table order wins when a code appears in several
    /// rows; within a row the small-path column is checked before the
    /// medium-path column.
    pub fn lookup(&self, code: &str) -> Option<(&ScoreRule, SizePath)> {
        for rule in &self.rules {
            if rule.small_code.as_deref() == Some(code) {
                return Some((rule, SizePath::Pequena));
            }
            if rule.medium_code.as_deref() == Some(code) {
                return Some((rule, SizePath::Mediana));
            }
        }
        None
    }

    /// Summed points of all rules in `section` reachable on the given path.
    pub fn section_total(&self, section: &str, path: SizePath) -> f64 {
        let totals = match path {
            SizePath::Pequena => &self.small_totals,
            SizePath::Mediana => &self.medium_totals,
        };
        totals.get(section).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn required_column(sheet: &SheetData, name: &str) -> Result<usize> {
    sheet.column(name).ok_or_else(|| {
        anyhow!(
            "Rules table is missing required column '{}' (found: {})",
            name,
            sheet
                .headers
                .iter()
                .map(|h| h.trim())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

fn points_value(cell: Option<&Data>) -> Option<f64> {
    match cell {
        Some(Data::Float(v)) => Some(*v),
        Some(Data::Int(v)) => Some(*v as f64),
        Some(Data::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A blank or non-text cell is the absence marker, distinct from any
/// legitimate answer code.
fn answer_code(cell: Option<&Data>) -> Option<String> {
    match cell {
        Some(Data::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_sheet(rows: Vec<Vec<Data>>) -> SheetData {
        SheetData {
            name: "puntajes".to_string(),
            headers: vec![
                "Seccion".to_string(),
                // header whitespace is trimmed before matching
                " Puntaje ".to_string(),
                "Respuesta Pequeña".to_string(),
                "Respuesta Mediana".to_string(),
            ],
            rows,
        }
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn rule(section: &str, points: f64, small: &str, medium: &str) -> Vec<Data> {
        let code = |c: &str| {
            if c.is_empty() { Data::Empty } else { s(c) }
        };
        vec![s(section), Data::Float(points), code(small), code(medium)]
    }

    #[test]
    fn test_branch_totals_are_separate() {
        let sheet = rules_sheet(vec![
            rule("Gov", 5.0, "Pc012.01", ""),
            rule("Gov", 3.0, "", "Pc013.01"),
            rule("Gov", 2.0, "Pc014.01", "Pc014.02"),
            rule("Ops", 7.0, "Pc020.01", ""),
        ]);
        let index = RuleIndex::build(&sheet).unwrap();

        assert_eq!(index.section_total("Gov", SizePath::Pequena), 7.0);
        assert_eq!(index.section_total("Gov", SizePath::Mediana), 5.0);
        assert_eq!(index.section_total("Ops", SizePath::Pequena), 7.0);
        assert_eq!(index.section_total("Ops", SizePath::Mediana), 0.0);
    }

    #[test]
    fn test_lookup_small_before_medium() {
        // Same code in both columns of one row resolves to the small path.
        let sheet = rules_sheet(vec![rule("Gov", 5.0, "Pc012.01", "Pc012.01")]);
        let index = RuleIndex::build(&sheet).unwrap();

        let (matched, path) = index.lookup("Pc012.01").unwrap();
        assert_eq!(path, SizePath::Pequena);
        assert_eq!(matched.points, 5.0);
    }

    #[test]
    fn test_lookup_first_row_wins() {
        // A code present in several rows resolves to the earliest row, even
        // when the later row would match on the small path.
        let sheet = rules_sheet(vec![
            rule("Gov", 5.0, "", "Px001.01"),
            rule("Ops", 9.0, "Px001.01", ""),
        ]);
        let index = RuleIndex::build(&sheet).unwrap();

        let (matched, path) = index.lookup("Px001.01").unwrap();
        assert_eq!(matched.section, "Gov");
        assert_eq!(path, SizePath::Mediana);
    }

    #[test]
    fn test_unknown_code_misses() {
        let sheet = rules_sheet(vec![rule("Gov", 5.0, "Pc012.01", "")]);
        let index = RuleIndex::build(&sheet).unwrap();
        assert!(index.lookup("Zz999.99").is_none());
    }

    #[test]
    fn test_zero_points_rule_still_counts_as_present() {
        // A populated code with zero points is not the absence marker.
        let sheet = rules_sheet(vec![
            rule("Gov", 0.0, "Pc012.01", ""),
            rule("Gov", 4.0, "Pc012.02", ""),
        ]);
        let index = RuleIndex::build(&sheet).unwrap();

        assert!(index.lookup("Pc012.01").is_some());
        assert_eq!(index.section_total("Gov", SizePath::Pequena), 4.0);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let sheet = SheetData {
            name: "puntajes".to_string(),
            headers: vec!["Seccion".to_string(), "Puntaje".to_string()],
            rows: vec![],
        };
        let err = RuleIndex::build(&sheet).unwrap_err();
        assert!(err.to_string().contains("Respuesta Pequeña"));
    }

    #[test]
    fn test_non_numeric_points_is_an_error() {
        let sheet = rules_sheet(vec![vec![
            s("Gov"),
            s("cinco"),
            s("Pc012.01"),
            Data::Empty,
        ]]);
        assert!(RuleIndex::build(&sheet).is_err());
    }
}
