//! Filas mapeadas de Postgres y su conversión a tipos de dominio.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text};
use phd_core::StoreFault;
use phd_domain::{DashboardStats, FormProgress, FormSubmission, FormTypeStats, MonthlyCount, OverallStats, ProgressStat,
                 SubmissionDetail, SubmissionStatus};
use serde_json::Value;

use crate::schema::{form_progress, form_submissions};

/// Fila de `form_progress`. Sirve tanto para el DSL (`as_select`) como para
/// `sql_query` con `RETURNING`.
#[derive(Queryable, Selectable, QueryableByName, Debug)]
#[diesel(table_name = form_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressRow {
    pub id: i64,
    pub user_id: i64,
    pub form_type: String,
    pub form_data: Value,
    pub step_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for FormProgress {
    fn from(row: ProgressRow) -> Self {
        Self { id: row.id,
               user_id: row.user_id,
               form_type: row.form_type,
               form_data: row.form_data,
               step_number: row.step_number,
               created_at: row.created_at,
               updated_at: row.updated_at }
    }
}

/// Columnas de `ProgressRow` en el orden del esquema (para `RETURNING`).
pub const PROGRESS_COLUMNS: &str = "id, user_id, form_type, form_data, step_number, created_at, updated_at";

#[derive(Queryable, Selectable, QueryableByName, Debug)]
#[diesel(table_name = form_submissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubmissionRow {
    pub id: i64,
    pub user_id: i64,
    pub form_type: String,
    pub form_data: Value,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub review_comments: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Columnas de `SubmissionRow` calificadas con el alias `fs`.
pub const SUBMISSION_COLUMNS: &str = "fs.id, fs.user_id, fs.form_type, fs.form_data, fs.status, fs.submitted_at, \
                                      fs.reviewed_by, fs.review_comments, fs.reviewed_at, fs.updated_at";

impl SubmissionRow {
    pub fn into_domain(self) -> Result<FormSubmission, StoreFault> {
        let status: SubmissionStatus = self.status
                                           .parse()
                                           .map_err(|e| StoreFault::Corrupt(format!("submission {}: {e}", self.id)))?;
        Ok(FormSubmission { id: self.id,
                            user_id: self.user_id,
                            form_type: self.form_type,
                            form_data: self.form_data,
                            status,
                            submitted_at: self.submitted_at,
                            reviewed_by: self.reviewed_by,
                            review_comments: self.review_comments,
                            reviewed_at: self.reviewed_at,
                            updated_at: self.updated_at })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = form_submissions)]
pub struct NewSubmissionRow<'a> {
    pub user_id: i64,
    pub form_type: &'a str,
    pub form_data: &'a Value,
    pub status: &'a str,
}

/// Envío unido al autor (`u`) y al revisor opcional (`r`).
#[derive(QueryableByName, Debug)]
pub struct SubmissionDetailRow {
    #[diesel(embed)]
    pub submission: SubmissionRow,
    #[diesel(sql_type = Text)]
    pub first_name: String,
    #[diesel(sql_type = Text)]
    pub last_name: String,
    #[diesel(sql_type = Text)]
    pub email: String,
    #[diesel(sql_type = Text)]
    pub role: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub reviewer_first_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub reviewer_last_name: Option<String>,
}

impl SubmissionDetailRow {
    pub fn into_domain(self) -> Result<SubmissionDetail, StoreFault> {
        Ok(SubmissionDetail { submission: self.submission.into_domain()?,
                              first_name: self.first_name,
                              last_name: self.last_name,
                              email: self.email,
                              role: self.role,
                              reviewer_first_name: self.reviewer_first_name,
                              reviewer_last_name: self.reviewer_last_name })
    }
}

#[derive(QueryableByName, Debug)]
pub struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}

#[derive(QueryableByName, Debug)]
pub struct ProgressStatRow {
    #[diesel(sql_type = Text)]
    pub form_type: String,
    #[diesel(sql_type = BigInt)]
    pub total_progress: i64,
    #[diesel(sql_type = Double)]
    pub average_step: f64,
    #[diesel(sql_type = Integer)]
    pub max_step: i32,
}

impl From<ProgressStatRow> for ProgressStat {
    fn from(row: ProgressStatRow) -> Self {
        Self { form_type: row.form_type,
               total_progress: row.total_progress,
               average_step: row.average_step,
               max_step: row.max_step }
    }
}

#[derive(QueryableByName, Debug)]
pub struct OverallRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
    #[diesel(sql_type = BigInt)]
    pub pending: i64,
    #[diesel(sql_type = BigInt)]
    pub approved: i64,
    #[diesel(sql_type = BigInt)]
    pub rejected: i64,
    #[diesel(sql_type = BigInt)]
    pub deleted: i64,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_review_hours: Option<f64>,
}

impl From<OverallRow> for OverallStats {
    fn from(row: OverallRow) -> Self {
        Self { total: row.total,
               pending: row.pending,
               approved: row.approved,
               rejected: row.rejected,
               deleted: row.deleted,
               avg_review_hours: row.avg_review_hours }
    }
}

#[derive(QueryableByName, Debug)]
pub struct FormTypeRow {
    #[diesel(sql_type = Text)]
    pub form_type: String,
    #[diesel(sql_type = BigInt)]
    pub total: i64,
    #[diesel(sql_type = BigInt)]
    pub pending: i64,
    #[diesel(sql_type = BigInt)]
    pub approved: i64,
    #[diesel(sql_type = BigInt)]
    pub rejected: i64,
}

impl From<FormTypeRow> for FormTypeStats {
    fn from(row: FormTypeRow) -> Self {
        Self { form_type: row.form_type,
               total: row.total,
               pending: row.pending,
               approved: row.approved,
               rejected: row.rejected }
    }
}

#[derive(QueryableByName, Debug)]
pub struct MonthRow {
    #[diesel(sql_type = Text)]
    pub month: String,
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}

impl From<MonthRow> for MonthlyCount {
    fn from(row: MonthRow) -> Self {
        Self { month: row.month, total: row.total }
    }
}

#[derive(QueryableByName, Debug)]
pub struct DashboardRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
    #[diesel(sql_type = BigInt)]
    pub pending: i64,
    #[diesel(sql_type = BigInt)]
    pub approved: i64,
    #[diesel(sql_type = BigInt)]
    pub rejected: i64,
    #[diesel(sql_type = BigInt)]
    pub today: i64,
    #[diesel(sql_type = BigInt)]
    pub this_week: i64,
    #[diesel(sql_type = BigInt)]
    pub this_month: i64,
}

impl From<DashboardRow> for DashboardStats {
    fn from(row: DashboardRow) -> Self {
        Self { total: row.total,
               pending: row.pending,
               approved: row.approved,
               rejected: row.rejected,
               today: row.today,
               this_week: row.this_week,
               this_month: row.this_month }
    }
}
