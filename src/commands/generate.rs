use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::excel;
use crate::report::{self, RuleIndex, SURVEY_SHEET};
use crate::sharepoint::SharePointClient;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

/// End-to-end run: fetch both workbooks, score, write the report back.
pub async fn generate_command(config: &Config, args: &GenerateArgs) -> Result<()> {
    let remote;
    let survey_bytes;
    let rules_bytes;

    match (&args.survey_file, &args.rules_file) {
        (Some(survey_path), Some(rules_path)) => {
            info!("Reading local input workbooks");
            survey_bytes = fs::read(survey_path)
                .with_context(|| format!("Failed to read survey file {:?}", survey_path))?;
            rules_bytes = fs::read(rules_path)
                .with_context(|| format!("Failed to read rules file {:?}", rules_path))?;
            remote = None;
        }
        _ => {
            let client = SharePointClient::connect(config).await?;
            let site_id = client.resolve_site(&config.site_url).await?;

            survey_bytes = client.download(&site_id, &config.survey_path).await?;
            rules_bytes = client.download(&site_id, &config.rules_path).await?;
            println!("✓ Downloaded survey and scoring workbooks");

            if config.debug_mode {
                mirror_to_debug_dir(&config.survey_path, &survey_bytes)?;
                mirror_to_debug_dir(&config.rules_path, &rules_bytes)?;
            }
            remote = Some((client, site_id));
        }
    }

    let survey = excel::read_sheet(&survey_bytes, Some(SURVEY_SHEET))
        .context("Failed to parse the survey workbook")?;
    let rules = excel::read_sheet(&rules_bytes, None)
        .context("Failed to parse the scoring-rules workbook")?;
    info!(
        "Loaded {} survey rows and {} rule rows",
        survey.row_count(),
        rules.row_count()
    );

    let id_col = report::respondent_column(&survey)?;
    let profiles = report::scan_companies(&survey, id_col);
    let index = RuleIndex::build(&rules)?;
    let tables = report::score_responses(&survey, id_col, &profiles, &index)?;
    println!(
        "✓ Scored {} report rows across {} companies",
        tables.rows.len(),
        tables.companies.len()
    );

    let workbook = report::write_workbook(&tables)?;

    if config.debug_mode {
        mirror_to_debug_dir(&config.output_filename, &workbook)?;
    }

    match &args.out_file {
        Some(path) => {
            fs::write(path, &workbook)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            println!("✓ Report written to {}", path.display());
        }
        None => match &remote {
            Some((client, site_id)) => {
                client
                    .upload(site_id, &config.output_filename, &workbook)
                    .await?;
                println!("✓ Report uploaded as {}", config.output_filename);
            }
            None => {
                anyhow::bail!("--out-file is required when reading local input files");
            }
        },
    }

    Ok(())
}

/// Keep a local copy of everything that crossed the wire.
fn mirror_to_debug_dir(source_path: &str, bytes: &[u8]) -> Result<()> {
    let debug_dir = Path::new("debug_files");
    fs::create_dir_all(debug_dir).context("Failed to create debug_files directory")?;

    let filename = source_path.rsplit('/').next().unwrap_or(source_path);
    let target = debug_dir.join(filename);
    fs::write(&target, bytes)
        .with_context(|| format!("Failed to write debug copy {:?}", target))?;

    info!("Mirrored {} to {:?}", source_path, target);
    Ok(())
}
