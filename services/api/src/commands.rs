use crate::infra::{parse_date, parse_variant, BackendClients};
use chrono::{NaiveDate, Utc};
use clap::Args;
use inspection_ai::config::AppConfig;
use inspection_ai::error::AppError;
use inspection_ai::telemetry;
use inspection_ai::workflows::inspection::{
    schema, FileExporter, InputKind, InspectionRecord, ReportPresenter, Variant,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct SchemaArgs {
    /// Only list one variant (API510, API570, API653 or its slug)
    #[arg(long, value_parser = parse_variant)]
    pub(crate) variant: Option<Variant>,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// JSON file holding the inspection record (camelCase keys, `inspectionType` tag)
    #[arg(long)]
    pub(crate) record: PathBuf,
    /// Save the generated report into this directory
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Date stamped into the report filename (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn run_schema(args: SchemaArgs) -> Result<(), AppError> {
    let variants: Vec<Variant> = match args.variant {
        Some(variant) => vec![variant],
        None => Variant::ALL.to_vec(),
    };

    for variant in variants {
        println!("{}", variant.display_name());
        for section in schema::form_sections(variant) {
            println!("  {}", section.title);
            for descriptor in section.fields {
                println!(
                    "    - {} ({}) [{}]",
                    descriptor.label,
                    descriptor.key,
                    describe_input(&descriptor.input)
                );
            }
        }
        println!();
    }

    Ok(())
}

fn describe_input(input: &InputKind) -> String {
    match input {
        InputKind::Date => "date".to_string(),
        InputKind::Text => "text".to_string(),
        InputKind::TextArea => "text area".to_string(),
        InputKind::Select { options } => {
            let labels: Vec<&str> = options.iter().map(|option| option.label).collect();
            format!("select: {}", labels.join(" | "))
        }
    }
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs { record, out, date } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let orchestrator = BackendClients::from_config(&config)?.orchestrator();

    let raw = std::fs::read_to_string(&record)?;
    let record: InspectionRecord = serde_json::from_str(&raw)?;
    println!(
        "Submitting {} inspection for {}",
        record.variant().display_name(),
        if record.common.facility.trim().is_empty() {
            "(facility not set)"
        } else {
            record.common.facility.as_str()
        }
    );

    let report = orchestrator.submit(record).await?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let artifact = ReportPresenter::present(&report, date);

    println!("\n{}\n", artifact.content);
    match out {
        Some(directory) => {
            let path = FileExporter::new(directory).write(&artifact)?;
            println!("Report saved to {}", path.display());
        }
        None => println!("Suggested filename: {}", artifact.suggested_filename),
    }

    Ok(())
}
