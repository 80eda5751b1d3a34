// docrecon CLI - cross-document consistency checks for shipment files

mod exit_codes;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use docrecon_engine::{
    compare_documents, document_quality, merge_validation, render, validate_shipment_consistency,
    EngineConfig, ReportFormat, RiskLevel, ShipmentDocuments,
};

use exit_codes::{
    EXIT_ERROR, EXIT_HIGH_RISK, EXIT_INVALID_CONFIG, EXIT_MEDIUM_RISK, EXIT_SUCCESS,
    EXIT_VALIDATION_FAILED,
};

/// Error carrying its exit code; `hint` is a one-line fix suggestion.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Parser)]
#[command(name = "docrecon")]
#[command(about = "Cross-document consistency checks for trade and logistics documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two or more extraction JSON files and produce a report
    #[command(after_help = "\
Examples:
  docrecon compare invoice.json hawb.json boe.json
  docrecon compare invoice.json boe.json --format html --output report.html
  docrecon compare invoice.json boe.json --format json | jq .summary
  docrecon compare invoice.json boe.json --config thresholds.toml

Exit codes: 0 low risk, 3 medium risk, 4 high risk.")]
    Compare {
        /// Extraction JSON files (at least two)
        files: Vec<PathBuf>,

        /// Report format: text, html or json
        #[arg(long, short = 't', default_value = "text")]
        format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// TOML file overriding calibration thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Cross-validate one shipment's documents against business rules
    #[command(after_help = "\
Examples:
  docrecon validate invoice.json hawb.json boe.json
  docrecon validate invoice.json boe.json --json

Exit codes: 0 all rules pass, 7 failed rules or relationship issues.")]
    Validate {
        /// Extraction JSON files, one per document type
        files: Vec<PathBuf>,

        /// Output the validation result as JSON
        #[arg(long)]
        json: bool,

        /// TOML file overriding calibration thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score the data quality of a single extracted document
    #[command(after_help = "\
Examples:
  docrecon quality invoice.json
  docrecon quality invoice.json --json")]
    Quality {
        /// Extraction JSON file
        file: PathBuf,

        /// Output the quality score as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Compare {
            files,
            format,
            output,
            config,
        } => cmd_compare(files, format, output, config),
        Commands::Validate {
            files,
            json,
            config,
        } => cmd_validate(files, json, config),
        Commands::Quality { file, json } => cmd_quality(file, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("error: {}", e.message);
            }
            if let Some(hint) = &e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig, CliError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let data = std::fs::read_to_string(&path).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("cannot read {}: {e}", path.display()),
        hint: None,
    })?;
    EngineConfig::from_toml(&data).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: Some("thresholds are fractions in [0, 1]".into()),
    })
}

fn cmd_compare(
    files: Vec<PathBuf>,
    format: ReportFormat,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let documents = input::load_documents(&files)?;

    let mut report = compare_documents(&documents, &config).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: e.to_string(),
        hint: Some("pass at least two extraction JSON files".into()),
    })?;

    // Fold shipment-level rule failures into the report before rendering.
    let mut shipment = ShipmentDocuments::new();
    for doc in documents {
        shipment.insert(doc);
    }
    let validation = validate_shipment_consistency(&shipment, &config);
    merge_validation(&mut report, &validation);

    // The engine never reads the clock; the run timestamp belongs here.
    report.meta.generated_at = Some(chrono::Utc::now().to_rfc3339());

    let rendered = render(&report, format).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: e.to_string(),
        hint: None,
    })?;

    if let Some(path) = &output {
        std::fs::write(path, &rendered).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    } else {
        println!("{rendered}");
    }

    let s = &report.summary;
    eprintln!(
        "{} documents, {} fields: {} consistent, {} discrepant, {} missing — risk {}",
        s.total_documents,
        s.total_fields_compared,
        s.consistent_fields,
        s.discrepant_fields,
        s.missing_fields,
        s.risk_level,
    );

    match s.risk_level {
        RiskLevel::Low => Ok(()),
        RiskLevel::Medium => Err(CliError {
            code: EXIT_MEDIUM_RISK,
            message: String::new(),
            hint: None,
        }),
        RiskLevel::High => Err(CliError {
            code: EXIT_HIGH_RISK,
            message: String::new(),
            hint: None,
        }),
    }
}

fn cmd_validate(
    files: Vec<PathBuf>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let documents = input::load_documents(&files)?;

    let mut shipment = ShipmentDocuments::new();
    for doc in documents {
        if let Some(displaced) = shipment.insert(doc) {
            eprintln!(
                "note: {} replaced by a later document of the same type",
                displaced.name
            );
        }
    }

    let validation = validate_shipment_consistency(&shipment, &config);

    if json {
        let out = serde_json::to_string_pretty(&validation).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{out}");
    } else {
        println!(
            "relationship score: {:.2}",
            validation.relationship_score
        );
        for rule in &validation.business_rules {
            let status = if !rule.applicable {
                "n/a "
            } else if rule.passed {
                "pass"
            } else {
                "FAIL"
            };
            println!("[{status}] {}: {}", rule.rule, rule.message);
        }
        for issue in &validation.issues {
            println!("issue: {issue}");
        }
        for rec in &validation.recommendations {
            println!("recommendation: {rec}");
        }
    }

    let failed = validation
        .business_rules
        .iter()
        .any(|r| r.applicable && !r.passed);
    if failed || !validation.issues.is_empty() {
        return Err(CliError {
            code: EXIT_VALIDATION_FAILED,
            message: String::new(),
            hint: None,
        });
    }
    Ok(())
}

fn cmd_quality(file: PathBuf, json: bool) -> Result<(), CliError> {
    let document = input::load_document(&file)?;
    let score = document_quality(&document, &EngineConfig::default());

    if json {
        let out = serde_json::to_string_pretty(&score).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{out}");
    } else {
        println!("{}: overall quality {:.2}", document.name, score.overall);
        println!(
            "  identifiers {:.2}, completion {:.2}, format {:.2}, rules {:.2}",
            score.factors.identifier_consistency,
            score.factors.data_completion,
            score.factors.format_validation,
            score.factors.rule_compliance,
        );
        for rec in &score.recommendations {
            println!("  recommendation: {rec}");
        }
    }
    Ok(())
}
