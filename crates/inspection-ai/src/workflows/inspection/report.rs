use std::io;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Serialize, Serializer};

use super::domain::Variant;

/// Report text returned by the generator for a stored inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedReport {
    pub text: String,
    pub variant: Variant,
}

/// Downloadable rendition of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArtifact {
    pub content: String,
    pub suggested_filename: String,
    #[serde(serialize_with = "serialize_mime")]
    pub mime_type: mime::Mime,
}

fn serialize_mime<S: Serializer>(value: &mime::Mime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_ref())
}

/// `inspection-report-<designation>-<YYYY-MM-DD>`
pub fn report_filename(variant: Variant, on: NaiveDate) -> String {
    format!(
        "inspection-report-{}-{}",
        variant.designation(),
        on.format("%Y-%m-%d")
    )
}

pub struct ReportPresenter;

impl ReportPresenter {
    pub fn present(report: &GeneratedReport, on: NaiveDate) -> ReportArtifact {
        ReportArtifact {
            content: report.text.clone(),
            suggested_filename: report_filename(report.variant, on),
            mime_type: mime::TEXT_PLAIN_UTF_8,
        }
    }

    /// Presents the report stamped with the current UTC calendar date.
    pub fn present_today(report: &GeneratedReport) -> ReportArtifact {
        Self::present(report, Utc::now().date_naive())
    }
}

/// Client-side save action. Fire-and-forget: the pipeline never observes the outcome.
pub trait ReportExporter: Send + Sync {
    fn export(&self, artifact: &ReportArtifact);
}

/// Saves artifacts into a directory under their suggested filename.
#[derive(Debug, Clone)]
pub struct FileExporter {
    directory: PathBuf,
}

impl FileExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn write(&self, artifact: &ReportArtifact) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(&artifact.suggested_filename);
        std::fs::write(&path, artifact.content.as_bytes())?;
        Ok(path)
    }
}

impl ReportExporter for FileExporter {
    fn export(&self, artifact: &ReportArtifact) {
        match self.write(artifact) {
            Ok(path) => tracing::info!(path = %path.display(), "report saved"),
            Err(err) => tracing::warn!(
                error = %err,
                filename = %artifact.suggested_filename,
                "unable to save report"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_tank_report() -> GeneratedReport {
        GeneratedReport {
            text: "Shell plates show\nlocalized corrosion.".to_string(),
            variant: Variant::StorageTank,
        }
    }

    #[test]
    fn storage_tank_filename_uses_public_designation() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
        let artifact = ReportPresenter::present(&storage_tank_report(), date);

        assert_eq!(
            artifact.suggested_filename,
            "inspection-report-API653-2024-03-05"
        );
        assert_eq!(artifact.content, storage_tank_report().text);
        assert_eq!(artifact.mime_type.type_(), mime::TEXT);
        assert_eq!(artifact.mime_type.subtype(), mime::PLAIN);
    }

    #[test]
    fn present_today_stamps_the_utc_date() {
        let before = Utc::now().date_naive();
        let artifact = ReportPresenter::present_today(&storage_tank_report());
        let after = Utc::now().date_naive();

        assert!(
            artifact.suggested_filename == report_filename(Variant::StorageTank, before)
                || artifact.suggested_filename == report_filename(Variant::StorageTank, after)
        );
    }

    #[test]
    fn artifact_serializes_mime_as_string() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
        let artifact = ReportPresenter::present(&storage_tank_report(), date);
        let json = serde_json::to_value(&artifact).expect("serializes");
        assert_eq!(json["mime_type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn file_exporter_writes_verbatim_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exporter = FileExporter::new(dir.path().join("reports"));
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
        let artifact = ReportPresenter::present(&storage_tank_report(), date);

        let path = exporter.write(&artifact).expect("writes artifact");

        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("inspection-report-API653-2024-03-05")
        );
        let saved = std::fs::read_to_string(path).expect("reads artifact");
        assert_eq!(saved, artifact.content);
    }
}
