//! The scoring pipeline: survey parsing, rule indexing, aggregation and
//! workbook serialization.
//!
//! The pipeline is single-pass and stateless; everything is built fresh per
//! run from the two input sheets and dropped once the workbook is written.

pub mod rules;
pub mod scoring;
pub mod survey;
pub mod writer;

pub use rules::{RuleIndex, ScoreRule, SizePath};
pub use scoring::{CompanyTotal, CountryAverage, ReportRow, ReportTables, score_responses};
pub use survey::{CompanyProfile, Country, SizeCategory, respondent_column, scan_companies};
pub use writer::write_workbook;

/// Sheet holding the survey responses in the source workbook.
pub const SURVEY_SHEET: &str = "Form1";
