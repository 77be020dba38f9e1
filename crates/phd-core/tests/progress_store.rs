use chrono::{Duration, TimeZone, Utc};
use phd_core::{FormProgressStore, FormSubmissionStore, InMemoryForms, StoreFault, StoreOp, DEFAULT_RETENTION_DAYS,
               DEFAULT_STEP};
use phd_domain::UserProfile;
use serde_json::json;

fn store_with_users() -> InMemoryForms {
    let mut store = InMemoryForms::new();
    store.add_user(UserProfile::new(1, "Ada", "Lovelace", "ada@uni.edu", "student"));
    store.add_user(UserProfile::new(2, "Alan", "Turing", "alan@uni.edu", "student"));
    store.add_user(UserProfile::new(9, "Grace", "Hopper", "grace@uni.edu", "supervisor"));
    store
}

#[test]
fn second_save_replaces_the_single_row() {
    let mut store = store_with_users();
    let first = store.save_progress(1, "PHDEE02-A", &json!({"title": "draft"}), DEFAULT_STEP).unwrap();
    let second = store.save_progress(1, "PHDEE02-A", &json!({"title": "final"}), 3).unwrap();

    assert_eq!(store.progress_rows(), 1, "upsert must keep one row per (user, form_type)");
    assert_eq!(first.id, second.id);
    assert!(second.updated_at > first.updated_at, "updated_at debe avanzar");
    let loaded = store.load_progress(1, "PHDEE02-A").unwrap().expect("row");
    assert_eq!(loaded.form_data, json!({"title": "final"}));
    assert_eq!(loaded.step_number, 3);
}

#[test]
fn clear_then_load_is_absent_and_clear_is_idempotent() {
    let mut store = store_with_users();
    store.save_progress(1, "PHDEE03", &json!({}), 1).unwrap();
    assert!(store.has_progress(1, "PHDEE03").unwrap());

    assert!(store.clear_progress(1, "PHDEE03").unwrap());
    assert!(store.load_progress(1, "PHDEE03").unwrap().is_none());
    assert!(!store.has_progress(1, "PHDEE03").unwrap());
    // sin fila previa también es éxito
    assert!(store.clear_progress(1, "PHDEE03").unwrap());
}

#[test]
fn update_step_never_creates_rows() {
    let mut store = store_with_users();
    assert!(store.update_step(1, "PHDEE04-B", 2).unwrap().is_none());
    assert!(!store.has_progress(1, "PHDEE04-B").unwrap());

    let saved = store.save_progress(1, "PHDEE04-B", &json!({"a": 1}), 0).unwrap();
    let updated = store.update_step(1, "PHDEE04-B", 5).unwrap().expect("existing row");
    assert_eq!(updated.step_number, 5);
    assert_eq!(updated.form_data, json!({"a": 1}));
    assert!(updated.updated_at > saved.updated_at);
}

#[test]
fn unknown_user_is_a_foreign_key_failure() {
    let mut store = store_with_users();
    let err = store.save_progress(404, "PHDEE03", &json!({}), 0).unwrap_err();
    assert_eq!(err.operation, StoreOp::SaveProgress);
    assert!(matches!(err.cause, StoreFault::ForeignKeyViolation(_)));
    assert!(err.to_string().starts_with("Failed to save form progress:"));
}

#[test]
fn user_progress_lists_newest_first() {
    let mut store = store_with_users();
    store.save_progress(1, "PHDEE02-A", &json!({}), 1).unwrap();
    store.save_progress(1, "PHDEE03", &json!({}), 2).unwrap();
    store.save_progress(2, "PHDEE03", &json!({}), 4).unwrap();
    store.save_progress(1, "PHDEE02-A", &json!({"touched": true}), 2).unwrap();

    let list = store.user_progress(1).unwrap();
    let kinds: Vec<&str> = list.iter().map(|p| p.form_type.as_str()).collect();
    assert_eq!(kinds, vec!["PHDEE02-A", "PHDEE03"]);
    assert_eq!(list[0].step_number, 2);
}

#[test]
fn stats_group_by_form_type() {
    let mut store = store_with_users();
    store.save_progress(1, "PHDEE03", &json!({}), 2).unwrap();
    store.save_progress(2, "PHDEE03", &json!({}), 4).unwrap();
    store.save_progress(1, "PHDEE-E1", &json!({}), 1).unwrap();

    let stats = store.progress_stats().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].form_type, "PHDEE03");
    assert_eq!(stats[0].total_progress, 2);
    assert!((stats[0].average_step - 3.0).abs() < f64::EPSILON);
    assert_eq!(stats[0].max_step, 4);
    assert_eq!(stats[1].form_type, "PHDEE-E1");
}

#[test]
fn date_range_is_inclusive_and_joins_owner() {
    let mut store = store_with_users();
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    store.save_progress(1, "PHDEE03", &json!({}), 1).unwrap();
    store.save_progress(2, "PHDEE03", &json!({}), 1).unwrap();
    store.backdate_progress(1, "PHDEE03", t0);
    store.backdate_progress(2, "PHDEE03", t0 + Duration::days(10));

    let rows = store.progress_by_date_range(t0, t0 + Duration::days(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email, "ada@uni.edu");
    assert_eq!(rows[0].progress.user_id, 1);

    let both = store.progress_by_date_range(t0, t0 + Duration::days(10)).unwrap();
    assert_eq!(both.len(), 2);
    assert_eq!(both[0].progress.user_id, 2, "más reciente primero");
}

#[test]
fn cleanup_keeps_stale_rows_of_recent_submitters() {
    let mut store = store_with_users();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    store.set_clock(now);

    store.save_progress(1, "PHDEE03", &json!({}), 1).unwrap();
    store.save_progress(2, "PHDEE03", &json!({}), 1).unwrap();
    store.save_progress(2, "PHDEE05-A", &json!({}), 1).unwrap();
    store.backdate_progress(1, "PHDEE03", now - Duration::days(45));
    store.backdate_progress(2, "PHDEE03", now - Duration::days(45));
    // user 2: borrador reciente, no se toca

    // user 1 envió algo hace 3 días -> conserva su borrador viejo
    let sub = store.create(1, "PHDEE02-A", &json!({})).unwrap();
    store.backdate_submission(sub.id, now - Duration::days(3));

    let removed = store.cleanup_old_progress(DEFAULT_RETENTION_DAYS).unwrap();
    assert_eq!(removed, 1);
    assert!(store.has_progress(1, "PHDEE03").unwrap());
    assert!(!store.has_progress(2, "PHDEE03").unwrap());
    assert!(store.has_progress(2, "PHDEE05-A").unwrap());
}

#[test]
fn cleanup_ignores_submissions_outside_the_window() {
    let mut store = store_with_users();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    store.set_clock(now);
    store.save_progress(1, "PHDEE03", &json!({}), 1).unwrap();
    store.backdate_progress(1, "PHDEE03", now - Duration::days(60));
    let sub = store.create(1, "PHDEE02-A", &json!({})).unwrap();
    store.backdate_submission(sub.id, now - Duration::days(40));

    assert_eq!(store.cleanup_old_progress(30).unwrap(), 1);
    assert_eq!(store.progress_rows(), 0);
}

#[test]
fn cleanup_with_out_of_range_window_removes_nothing() {
    let mut store = store_with_users();
    store.save_progress(1, "PHDEE03", &json!({}), 1).unwrap();
    assert_eq!(store.cleanup_old_progress(u32::MAX).unwrap(), 0);
    assert!(store.has_progress(1, "PHDEE03").unwrap());
}
