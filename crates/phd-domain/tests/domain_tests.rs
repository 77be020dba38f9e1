use chrono::{TimeZone, Utc};
use phd_domain::{AnalyticsFilter, DomainError, FormProgress, FormSubmission, ProgressSummary, ProgressWithUser,
                 SubmissionDetail, SubmissionStatus};
use serde_json::json;

fn progress() -> FormProgress {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    FormProgress { id: 7,
                   user_id: 1,
                   form_type: "PHDEE02".into(),
                   form_data: json!({"title": "Engines", "nested": {"list": [1, 2]}}),
                   step_number: 2,
                   created_at: at,
                   updated_at: at }
}

#[test]
fn test_progress_summary_from_row() {
    let p = progress();
    let summary = ProgressSummary::from(&p);
    assert_eq!(summary.form_type, "PHDEE02");
    assert_eq!(summary.step_number, 2);
    assert_eq!(summary.updated_at, p.updated_at);
}

#[test]
fn test_progress_with_user_is_flat_json() {
    let row = ProgressWithUser { progress: progress(),
                                 first_name: "Ada".into(),
                                 last_name: "Lovelace".into(),
                                 email: "ada@uni.edu".into() };
    let v = serde_json::to_value(&row).unwrap();
    // campos del borrador y del dueño al mismo nivel
    assert_eq!(v["form_type"], "PHDEE02");
    assert_eq!(v["email"], "ada@uni.edu");
    assert_eq!(v["form_data"]["nested"]["list"][1], 2);
}

#[test]
fn test_submission_detail_serializes_status_lowercase() {
    let at = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
    let detail = SubmissionDetail { submission: FormSubmission { id: 3,
                                                                 user_id: 1,
                                                                 form_type: "PHDEE03".into(),
                                                                 form_data: json!({}),
                                                                 status: SubmissionStatus::Approved,
                                                                 submitted_at: at,
                                                                 reviewed_by: Some(9),
                                                                 review_comments: None,
                                                                 reviewed_at: Some(at),
                                                                 updated_at: at },
                                    first_name: "Ada".into(),
                                    last_name: "Lovelace".into(),
                                    email: "ada@uni.edu".into(),
                                    role: "student".into(),
                                    reviewer_first_name: Some("Grace".into()),
                                    reviewer_last_name: Some("Hopper".into()) };
    let v = serde_json::to_value(&detail).unwrap();
    assert_eq!(v["status"], "approved");
    assert_eq!(v["reviewer_first_name"], "Grace");
    assert_eq!(v["id"], 3);
}

#[test]
fn test_status_parse_rejects_unknown() {
    assert_eq!("archived".parse::<SubmissionStatus>(), Err(DomainError::UnknownStatus("archived".into())));
    assert_eq!(" PENDING ".parse::<SubmissionStatus>(), Ok(SubmissionStatus::Pending));
}

#[test]
fn test_analytics_filter_range_validation() {
    let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    let backwards = AnalyticsFilter { form_type: None, start_date: Some(start), end_date: Some(end) };
    assert!(matches!(backwards.validate(), Err(DomainError::InvalidRange { .. })));
    let open = AnalyticsFilter { form_type: None, start_date: Some(start), end_date: None };
    assert!(open.validate().is_ok());
}
