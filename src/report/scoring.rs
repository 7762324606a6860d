use crate::excel::SheetData;
use crate::report::rules::{RuleIndex, SizePath};
use crate::report::survey::{self, CompanyProfile, Country, SizeCategory};
use anyhow::{Result, bail};
use calamine::Data;
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// One matched answer code, before aggregation.
#[derive(Debug, Clone)]
struct ScoredAnswer {
    id: String,
    company: String,
    size_path: SizePath,
    size_category: SizeCategory,
    country: Country,
    points: f64,
    section: String,
    section_total: f64,
}

/// Per respondent and section: summed points against the branch total.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub id: String,
    pub company: String,
    pub size_path: String,
    pub country: String,
    pub section: String,
    pub size_category: String,
    pub points: f64,
    pub section_total: f64,
}

/// Per respondent: overall score as a fraction of the reachable total.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyTotal {
    pub id: String,
    pub company: String,
    pub points: f64,
    pub section_total: f64,
    pub percentage_total: f64,
}

/// Per country and section: mean points across respondents.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryAverage {
    pub country: String,
    pub section: String,
    pub points: f64,
    pub section_total: f64,
}

/// The three output tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTables {
    pub rows: Vec<ReportRow>,
    pub companies: Vec<CompanyTotal>,
    pub countries: Vec<CountryAverage>,
}

/// Join every extracted answer code against the rule index and roll the
/// matches up into the three report tables.
///
/// Group keys are emitted in sorted order, which keeps repeated runs over
/// the same inputs identical.
pub fn score_responses(
    survey: &SheetData,
    id_col: usize,
    profiles: &HashMap<String, CompanyProfile>,
    index: &RuleIndex,
) -> Result<ReportTables> {
    let answers = collect_answers(survey, id_col, profiles, index);

    if answers.is_empty() {
        bail!("No results: no survey answer matched the scoring rules");
    }
    info!("Matched {} scored answers", answers.len());

    let rows = aggregate_rows(&answers);
    let companies = aggregate_companies(&rows)?;
    let countries = aggregate_countries(&rows);

    debug!(
        "Aggregated into {} report rows, {} companies, {} country/section groups",
        rows.len(),
        companies.len(),
        countries.len()
    );

    Ok(ReportTables {
        rows,
        companies,
        countries,
    })
}

fn collect_answers(
    survey: &SheetData,
    id_col: usize,
    profiles: &HashMap<String, CompanyProfile>,
    index: &RuleIndex,
) -> Vec<ScoredAnswer> {
    let mut answers = Vec::new();

    for row in &survey.rows {
        let Some(id_cell) = row.get(id_col) else {
            continue;
        };
        let id = id_cell.to_string();

        // Respondents without a company name are excluded entirely.
        let Some(profile) = profiles.get(&id) else {
            continue;
        };
        if profile.name.is_empty() {
            continue;
        }

        for cell in row {
            let Data::String(value) = cell else {
                continue;
            };
            let Some(code) = survey::extract_code(value) else {
                continue;
            };
            // Codes absent from the rules table are silently dropped.
            let Some((rule, size_path)) = index.lookup(code) else {
                continue;
            };

            answers.push(ScoredAnswer {
                id: id.clone(),
                company: profile.name.clone(),
                size_path,
                size_category: profile.size,
                country: profile.country,
                points: rule.points,
                section: rule.section.clone(),
                section_total: index.section_total(&rule.section, size_path),
            });
        }
    }

    answers
}

fn aggregate_rows(answers: &[ScoredAnswer]) -> Vec<ReportRow> {
    // (id, company, size path, country, section, size category)
    // -> (summed points, first section total seen)
    let mut groups: BTreeMap<(String, String, String, String, String, String), (f64, f64)> =
        BTreeMap::new();

    for answer in answers {
        let key = (
            answer.id.clone(),
            answer.company.clone(),
            answer.size_path.label().to_string(),
            answer.country.label().to_string(),
            answer.section.clone(),
            answer.size_category.label().to_string(),
        );
        groups
            .entry(key)
            .and_modify(|(points, _)| *points += answer.points)
            .or_insert((answer.points, answer.section_total));
    }

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(
            |((id, company, size_path, country, section, size_category), (points, total))| {
                ReportRow {
                    id,
                    company,
                    size_path,
                    country,
                    section,
                    size_category,
                    points,
                    section_total: total,
                }
            },
        )
        .collect();

    // The source table orders numeric ids numerically; the downstream
    // "first section_total" picks depend on this order.
    rows.sort_by(|a, b| {
        compare_ids(&a.id, &b.id)
            .then_with(|| a.company.cmp(&b.company))
            .then_with(|| a.size_path.cmp(&b.size_path))
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.section.cmp(&b.section))
            .then_with(|| a.size_category.cmp(&b.size_category))
    });
    rows
}

/// Respondent ids are kept as display strings; numeric ids still have to
/// order by magnitude ("2" before "10"). Non-numeric ids sort after the
/// numeric ones, lexicographically.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn aggregate_companies(rows: &[ReportRow]) -> Result<Vec<CompanyTotal>> {
    let mut groups: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();

    for row in rows {
        let entry = groups
            .entry((row.id.clone(), row.company.clone()))
            .or_insert((0.0, 0.0));
        entry.0 += row.points;
        entry.1 += row.section_total;
    }

    let mut companies = Vec::with_capacity(groups.len());
    for ((id, company), (points, section_total)) in groups {
        if section_total == 0.0 {
            // A respondent with matched answers but no reachable points is a
            // data-integrity problem in the rules table; refusing beats
            // writing a NaN into the report.
            bail!(
                "Zero section total for respondent {} ('{}') despite matched answers",
                id,
                company
            );
        }
        let percentage_total = points / section_total;
        companies.push(CompanyTotal {
            id,
            company,
            points,
            section_total,
            percentage_total,
        });
    }

    companies.sort_by(|a, b| compare_ids(&a.id, &b.id).then_with(|| a.company.cmp(&b.company)));
    Ok(companies)
}

fn aggregate_countries(rows: &[ReportRow]) -> Vec<CountryAverage> {
    // (country, section) -> (summed points, first section total, row count)
    let mut groups: BTreeMap<(String, String), (f64, f64, usize)> = BTreeMap::new();

    for row in rows {
        groups
            .entry((row.country.clone(), row.section.clone()))
            .and_modify(|(points, _, count)| {
                *points += row.points;
                *count += 1;
            })
            .or_insert((row.points, row.section_total, 1));
    }

    groups
        .into_iter()
        .map(|((country, section), (points, total, count))| CountryAverage {
            country,
            section,
            points: points / count as f64,
            section_total: total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::survey::scan_companies;

    fn survey_sheet(rows: Vec<Vec<Data>>) -> SheetData {
        SheetData {
            name: "Form1".to_string(),
            headers: vec![
                "ID".to_string(),
                "Pg001 Empresa".to_string(),
                "Pais".to_string(),
                "Q1".to_string(),
                "Q2".to_string(),
            ],
            rows,
        }
    }

    fn rules_index(rows: Vec<(&str, f64, &str, &str)>) -> RuleIndex {
        let sheet = SheetData {
            name: "puntajes".to_string(),
            headers: vec![
                "Seccion".to_string(),
                "Puntaje".to_string(),
                "Respuesta Pequeña".to_string(),
                "Respuesta Mediana".to_string(),
            ],
            rows: rows
                .into_iter()
                .map(|(section, points, small, medium)| {
                    let code = |c: &str| {
                        if c.is_empty() {
                            Data::Empty
                        } else {
                            Data::String(c.to_string())
                        }
                    };
                    vec![
                        Data::String(section.to_string()),
                        Data::Float(points),
                        code(small),
                        code(medium),
                    ]
                })
                .collect(),
        };
        RuleIndex::build(&sheet).unwrap()
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn run(survey: &SheetData, index: &RuleIndex) -> Result<ReportTables> {
        let profiles = scan_companies(survey, 0);
        score_responses(survey, 0, &profiles, index)
    }

    #[test]
    fn test_nameless_respondents_are_filtered() {
        let index = rules_index(vec![("Gov", 5.0, "Pc012.01", "")]);
        let survey = survey_sheet(vec![
            vec![Data::Int(1), Data::Empty, s("[Pg011.01]"), s("[Pc012.01]"), Data::Empty],
            vec![Data::Int(2), s("Acme"), s("[Pg011.01]"), s("[Pc012.01]"), Data::Empty],
        ]);

        let tables = run(&survey, &index).unwrap();
        assert_eq!(tables.rows.len(), 1);
        assert!(tables.rows.iter().all(|r| r.id == "2"));
    }

    #[test]
    fn test_no_matches_is_fatal() {
        let index = rules_index(vec![("Gov", 5.0, "Pc012.01", "")]);
        let survey = survey_sheet(vec![vec![
            Data::Int(1),
            s("Acme"),
            s("[Pg011.01]"),
            s("[Zz999.99]"),
            Data::Empty,
        ]]);

        let err = run(&survey, &index).unwrap_err();
        assert!(err.to_string().contains("No results"));
    }

    #[test]
    fn test_section_points_round_trip() {
        // Summed points per respondent+section equal the raw per-code sum.
        let index = rules_index(vec![
            ("Gov", 5.0, "Pc012.01", ""),
            ("Gov", 3.0, "Pc013.01", ""),
        ]);
        let survey = survey_sheet(vec![vec![
            Data::Int(1),
            s("Acme"),
            s("[Pg011.01]"),
            s("[Pc012.01]"),
            s("[Pc013.01]"),
        ]]);

        let tables = run(&survey, &index).unwrap();
        assert_eq!(tables.rows.len(), 1);
        assert_eq!(tables.rows[0].points, 8.0);
        assert_eq!(tables.rows[0].section_total, 8.0);
    }

    #[test]
    fn test_percentage_total_is_exact() {
        let index = rules_index(vec![
            ("Gov", 10.0, "Pc012.01", ""),
            ("Gov", 10.0, "Pc013.01", ""),
        ]);
        // Only one of the two small-path answers is present.
        let survey = survey_sheet(vec![vec![
            Data::Int(1),
            s("Acme"),
            s("[Pg011.01]"),
            s("[Pc012.01]"),
            Data::Empty,
        ]]);

        let tables = run(&survey, &index).unwrap();
        assert_eq!(tables.companies.len(), 1);
        assert_eq!(tables.companies[0].points, 10.0);
        assert_eq!(tables.companies[0].section_total, 20.0);
        assert_eq!(tables.companies[0].percentage_total, 0.5);
    }

    #[test]
    fn test_zero_denominator_is_fatal() {
        // All reachable points in the section are zero.
        let index = rules_index(vec![("Gov", 0.0, "Pc012.01", "")]);
        let survey = survey_sheet(vec![vec![
            Data::Int(1),
            s("Acme"),
            s("[Pg011.01]"),
            s("[Pc012.01]"),
            Data::Empty,
        ]]);

        let err = run(&survey, &index).unwrap_err();
        assert!(err.to_string().contains("Zero section total"));
    }

    #[test]
    fn test_country_average_means_points() {
        let index = rules_index(vec![("Gov", 4.0, "Pc012.01", ""), ("Gov", 2.0, "Pc013.01", "")]);
        let survey = survey_sheet(vec![
            vec![Data::Int(1), s("Acme"), s("[Pg011.01]"), s("[Pc012.01]"), s("[Pc013.01]")],
            vec![Data::Int(2), s("Globex"), s("[Pg011.01]"), s("[Pc012.01]"), Data::Empty],
        ]);

        let tables = run(&survey, &index).unwrap();
        assert_eq!(tables.countries.len(), 1);
        let avg = &tables.countries[0];
        assert_eq!(avg.country, "Costa Rica");
        // (6.0 + 4.0) / 2 respondents
        assert_eq!(avg.points, 5.0);
        assert_eq!(avg.section_total, 6.0);
    }

    #[test]
    fn test_numeric_ids_order_by_magnitude() {
        // "10" sorts after "2" despite being lexicographically smaller, and
        // the country average takes its first section total from the
        // numerically smallest respondent.
        let index = rules_index(vec![
            ("Gov", 4.0, "Pc012.01", ""),
            ("Gov", 6.0, "", "Pm012.01"),
        ]);
        let survey = survey_sheet(vec![
            vec![Data::Int(10), s("Globex"), s("[Pg011.01]"), s("[Pm012.01]"), Data::Empty],
            vec![Data::Int(2), s("Acme"), s("[Pg011.01]"), s("[Pc012.01]"), Data::Empty],
        ]);

        let tables = run(&survey, &index).unwrap();
        assert_eq!(tables.rows[0].id, "2");
        assert_eq!(tables.rows[1].id, "10");
        assert_eq!(tables.companies[0].id, "2");

        // First in numeric id order is the small-path row (total 4.0).
        assert_eq!(tables.countries.len(), 1);
        assert_eq!(tables.countries[0].section_total, 4.0);
        assert_eq!(tables.countries[0].points, 5.0);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let index = rules_index(vec![("Gov", 5.0, "Pc012.01", "Pm012.01")]);
        let survey = survey_sheet(vec![
            vec![Data::Int(2), s("Globex"), s("[Pg011.02]"), s("[Pm012.01]"), Data::Empty],
            vec![Data::Int(1), s("Acme"), s("[Pg011.01]"), s("[Pc012.01]"), Data::Empty],
        ]);

        let first = run(&survey, &index).unwrap();
        let second = run(&survey, &index).unwrap();
        assert_eq!(first, second);
        // Sorted by group key, not input order.
        assert_eq!(first.rows[0].id, "1");
        assert_eq!(first.rows[1].id, "2");
    }
}
