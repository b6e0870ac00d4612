//! Intake CLI: builds a patient record from a JSON file or flags, runs one
//! assessment and prints the result as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use triage_lib::models::{parse_conditions, parse_symptoms, Gender, PatientRecord};
use triage_lib::triage::{DecisionTreeModel, TriageOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "triage", version, about = "Rank a patient by urgency from vitals and symptoms")]
struct Cli {
    /// Patient record as JSON (collaborator field names). Overrides the vital flags.
    #[arg(long, value_name = "FILE")]
    patient: Option<PathBuf>,

    #[arg(long, default_value_t = PatientRecord::default().age)]
    age: u32,

    /// Male or Female.
    #[arg(long, default_value = "Male")]
    gender: String,

    /// Beats per minute.
    #[arg(long, default_value_t = PatientRecord::default().heart_rate)]
    heart_rate: u32,

    /// Systolic blood pressure, mmHg.
    #[arg(long, default_value_t = PatientRecord::default().systolic_bp)]
    systolic_bp: u32,

    /// Degrees Fahrenheit.
    #[arg(long, default_value_t = PatientRecord::default().temperature)]
    temperature: f64,

    /// Comma-separated, e.g. "chest pain, fever".
    #[arg(long, default_value = "")]
    symptoms: String,

    /// Comma-separated, or "none".
    #[arg(long, default_value = "none")]
    conditions: String,

    /// Optional skin image (PNG or JPEG).
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Classifier artifact; defaults to $TRIAGE_MODEL_PATH or data/risk_classifier.json.
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Single-line JSON output.
    #[arg(long)]
    compact: bool,
}

fn main() -> ExitCode {
    triage_lib::init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let orchestrator = match &cli.model {
        Some(path) => TriageOrchestrator::new(Arc::new(DecisionTreeModel::load(path)?)),
        None => TriageOrchestrator::from_shared_model()?,
    };

    let record = build_record(cli)?;
    let image = read_image(cli);

    let result = orchestrator.assess(&record, image.as_deref())?;
    if let Some(notice) = result.image_notice() {
        eprintln!("{notice}");
    }

    let json = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");
    Ok(())
}

fn build_record(cli: &Cli) -> Result<PatientRecord> {
    if let Some(path) = &cli.patient {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read patient file {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("patient file {} is not a valid record", path.display()));
    }

    Ok(PatientRecord {
        age: cli.age,
        gender: cli.gender.parse::<Gender>()?,
        heart_rate: cli.heart_rate,
        systolic_bp: cli.systolic_bp,
        temperature: cli.temperature,
        symptoms: parse_symptoms(&cli.symptoms)?,
        pre_existing_conditions: parse_conditions(&cli.conditions)?,
    })
}

/// A missing or unreadable image file is reported and skipped, like an
/// undecodable one.
fn read_image(cli: &Cli) -> Option<Vec<u8>> {
    let path = cli.image.as_ref()?;
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Image file unreadable");
            eprintln!(
                "Image {} could not be read, proceeding without it.",
                path.display()
            );
            None
        }
    }
}
