use super::common::*;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::workflows::inspection::gateway::GeneratorReply;
use crate::workflows::inspection::store::StoreError;
use crate::workflows::inspection::{
    CompletionOutcome, FieldError, FieldKey, FieldValue, FormError, FormSession, GeneratedReport,
    SubmissionError, Variant, VariantSwitchPolicy,
};

fn report(variant: Variant) -> GeneratedReport {
    GeneratedReport {
        text: REPORT_TEXT.to_string(),
        variant,
    }
}

#[test]
fn change_events_use_wire_names() {
    let mut form = FormSession::default();
    form.set_field("inspectionType", "API570")
        .expect("variant switch");
    form.set_field("pipingComponents", "flanges sound")
        .expect("piping field");

    assert_eq!(form.record().variant(), Variant::Piping);
    assert_eq!(
        form.record().value_of(FieldKey::PipingComponents),
        Some(FieldValue::Text("flanges sound"))
    );
    assert_eq!(
        form.set_field("colour", "red"),
        Err(FormError::Field(FieldError::UnknownField("colour".to_string())))
    );
    assert!(matches!(
        form.set_field("tankNumber", "T-1"),
        Err(FormError::Field(FieldError::NotInVariant { .. }))
    ));
}

#[test]
fn sections_follow_active_variant() {
    let mut form = FormSession::default();
    form.switch_variant(Variant::StorageTank);

    let identification = form
        .sections()
        .into_iter()
        .find(|section| section.title == "Identification")
        .expect("identification section");
    let keys: Vec<FieldKey> = identification.fields.iter().map(|d| d.key).collect();
    assert_eq!(
        keys,
        vec![FieldKey::TankNumber, FieldKey::TankType, FieldKey::TankLocation]
    );
}

#[test]
fn reset_policy_clears_common_attributes_on_switch() {
    let mut form = FormSession::new(VariantSwitchPolicy::Reset);
    form.set_field("facility", "North Refinery").expect("common");
    form.set_field("inspectionType", "API653").expect("switch");

    assert_eq!(form.record().common.facility, "");
    assert_eq!(form.record().variant(), Variant::StorageTank);
}

#[test]
fn submission_clears_previous_report_and_blocks_resubmission() {
    let mut form = FormSession::default();
    let (ticket, _) = form.begin_submission().expect("first submission");
    form.complete(ticket, Ok(report(Variant::PressureVessel)));
    assert!(form.report().is_some());

    let (_ticket, snapshot) = form.begin_submission().expect("second submission");
    assert!(form.report().is_none());
    assert!(form.error().is_none());
    assert!(form.is_pending());
    assert_eq!(&snapshot, form.record());

    assert_eq!(
        form.begin_submission().map(|_| ()),
        Err(FormError::SubmissionPending)
    );
}

#[test]
fn failure_keeps_entered_data_for_retry() {
    let mut form = FormSession::default();
    form.set_field("inspector", "R. Alvarez").expect("common");
    form.set_field("shell", "minor pitting").expect("API510");
    let before = form.record().clone();

    let (ticket, _) = form.begin_submission().expect("submission");
    let outcome = form.complete(
        ticket,
        Err(SubmissionError::Persistence(
            StoreError::new("duplicate key").with_detail("equipment_id"),
        )),
    );

    assert_eq!(outcome, CompletionOutcome::Applied);
    assert_eq!(form.record(), &before);
    assert!(form.report().is_none());
    assert!(!form.is_pending());
    let message = form.error().expect("error shown");
    assert!(message.contains("duplicate key"));
    assert!(message.contains("equipment_id"));
}

#[test]
fn late_result_after_discard_is_ignored() {
    let mut form = FormSession::default();
    form.set_field("facility", "Tank Farm 3").expect("common");
    let (ticket, _) = form.begin_submission().expect("submission");

    form.discard();
    let outcome = form.complete(ticket, Ok(report(Variant::PressureVessel)));

    assert_eq!(outcome, CompletionOutcome::Stale);
    assert!(form.report().is_none());
    assert!(form.error().is_none());
    assert!(!form.is_pending());
    assert_eq!(form.record().common.facility, "");
}

#[test]
fn download_is_available_only_with_a_report() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
    let mut form = FormSession::default();
    assert!(form.download(date).is_none());

    form.switch_variant(Variant::StorageTank);
    let (ticket, _) = form.begin_submission().expect("submission");
    form.complete(ticket, Ok(report(Variant::StorageTank)));

    let artifact = form.download(date).expect("artifact");
    assert_eq!(
        artifact.suggested_filename,
        "inspection-report-API653-2024-03-05"
    );
    assert_eq!(artifact.content, REPORT_TEXT);
}

#[tokio::test]
async fn form_drives_orchestrator_end_to_end() {
    let generator = Arc::new(ScriptedGenerator::replying(GeneratorReply::report(
        "REPORT TEXT",
    )));
    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(generator, store.clone());

    let mut form = FormSession::default();
    form.switch_variant(Variant::Piping);
    let filled = filled_record(Variant::Piping);
    for key in crate::workflows::inspection::schema::declared_keys(Variant::Piping) {
        if let Some(FieldValue::Text(text)) = filled.value_of(key) {
            form.set_field(key.wire_name(), text).expect("declared field");
        }
    }
    form.set_field("inspectionDate", "2024-03-05").expect("date");

    let (ticket, record) = form.begin_submission().expect("submission");
    let result = orchestrator.submit(record).await;
    assert_eq!(form.complete(ticket, result), CompletionOutcome::Applied);

    assert_eq!(form.report(), Some(&report(Variant::Piping)));
    assert_eq!(store.rows().len(), 1);
}
