use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    /// Read the survey workbook from a local file instead of SharePoint
    #[arg(long, requires = "rules_file")]
    pub survey_file: Option<PathBuf>,

    /// Read the scoring-rules workbook from a local file instead of SharePoint
    #[arg(long, requires = "survey_file")]
    pub rules_file: Option<PathBuf>,

    /// Write the report to a local file instead of uploading it
    #[arg(long)]
    pub out_file: Option<PathBuf>,
}
