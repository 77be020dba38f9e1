//! `FormSubmissionStore` sobre Postgres.
//!
//! Listados y reportes se arman con `SqlBuilder` (filtros opcionales, orden
//! desde enums cerrados, valores siempre enlazados). Altas y cambios de estado
//! usan el DSL o SQL fijo.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use log::{debug, warn};
use phd_core::{FormSubmissionStore, PersistenceError, StoreFault, StoreOp, TransitionPolicy};
use phd_domain::{AnalyticsFilter, DashboardStats, FormSubmission, PageRequest, SortField, SortOrder,
                 SubmissionAnalytics, SubmissionDetail, SubmissionId, SubmissionPage, SubmissionQuery,
                 SubmissionStatus, UserId, UserSubmissionFilter};
use serde_json::Value;

use super::query::{sort_column, BindValue, Cmp, Column, SqlBuilder};
use super::rows::{CountRow, DashboardRow, FormTypeRow, MonthRow, NewSubmissionRow, OverallRow, SubmissionDetailRow,
                  SubmissionRow, SUBMISSION_COLUMNS};
use super::{with_connection, ConnectionProvider};
use crate::error::DbError;
use crate::schema::form_submissions;

/// Envío con su autor (`u`) y revisor opcional (`r`).
const DETAIL_FROM: &str = "FROM form_submissions fs \
                           JOIN users u ON u.id = fs.user_id \
                           LEFT JOIN users r ON r.id = fs.reviewed_by";

fn detail_select() -> String {
    format!("SELECT {SUBMISSION_COLUMNS}, u.first_name, u.last_name, u.email, u.role, \
             r.first_name AS reviewer_first_name, r.last_name AS reviewer_last_name {DETAIL_FROM}")
}

fn count_select() -> String {
    format!("SELECT COUNT(*) AS total {DETAIL_FROM}")
}

fn apply_query_filters(b: &mut SqlBuilder, query: &SubmissionQuery) {
    if let Some(form_type) = &query.form_type {
        b.filter(Column::FormType, Cmp::Eq, BindValue::Text(form_type.clone()));
    }
    if let Some(status) = query.status {
        b.filter(Column::Status, Cmp::Eq, BindValue::Text(status.as_str().to_string()));
    }
    if let Some(term) = query.search_term() {
        b.search(term);
    }
}

fn apply_analytics_filters(b: &mut SqlBuilder, filter: &AnalyticsFilter) {
    if let Some(form_type) = &filter.form_type {
        b.filter(Column::FormType, Cmp::Eq, BindValue::Text(form_type.clone()));
    }
    if let Some(start) = filter.start_date {
        b.filter(Column::SubmittedAt, Cmp::Gte, BindValue::Timestamptz(start));
    }
    if let Some(end) = filter.end_date {
        b.filter(Column::SubmittedAt, Cmp::Lte, BindValue::Timestamptz(end));
    }
}

/// Inicio (UTC) del primero de los 12 meses que terminan en el mes de `now`.
fn month_window_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let index = now.year() * 12 + now.month0() as i32 - 11;
    let month = u32::try_from(index.rem_euclid(12) + 1).ok()?;
    NaiveDate::from_ymd_opt(index.div_euclid(12), month, 1)?.and_hms_opt(0, 0, 0)
                                                             .map(|d| d.and_utc())
}

/// Corre el par conteo + página con los mismos filtros.
fn load_detail_page<F>(conn: &mut PgConnection,
                       page: PageRequest,
                       sort: (SortField, SortOrder),
                       filters: F)
                       -> Result<SubmissionPage<SubmissionDetail>, DbError>
    where F: Fn(&mut SqlBuilder)
{
    let mut count = SqlBuilder::new(&count_select());
    filters(&mut count);
    let total = count.into_query().get_result::<CountRow>(conn)?.total;

    let mut select = SqlBuilder::new(&detail_select());
    filters(&mut select);
    select.order_by(sort_column(sort.0), sort.1).paginate(page);
    let rows = select.into_query().load::<SubmissionDetailRow>(conn)?;
    let submissions = rows.into_iter()
                          .map(SubmissionDetailRow::into_domain)
                          .collect::<Result<Vec<_>, _>>()?;
    Ok(SubmissionPage::new(submissions, total.max(0) as u64, page))
}

/// Estado actual bloqueado para el resto de la transacción.
fn lock_status(conn: &mut PgConnection, id: SubmissionId) -> Result<Option<SubmissionStatus>, DbError> {
    let raw = form_submissions::table.find(id)
                                     .select(form_submissions::status)
                                     .for_update()
                                     .get_result::<String>(conn)
                                     .optional()?;
    match raw {
        None => Ok(None),
        Some(s) => s.parse()
                    .map(Some)
                    .map_err(|e| DbError::Fault(StoreFault::Corrupt(format!("submission {id}: {e}")))),
    }
}

fn write_status(conn: &mut PgConnection,
                id: SubmissionId,
                status: SubmissionStatus,
                reviewer_id: UserId,
                comments: Option<&str>)
                -> Result<Option<FormSubmission>, DbError> {
    let sql = format!("UPDATE form_submissions AS fs SET status = $1, reviewed_by = $2, review_comments = $3, \
                       reviewed_at = NOW(), updated_at = NOW() WHERE fs.id = $4 RETURNING {SUBMISSION_COLUMNS}");
    let row = diesel::sql_query(sql).bind::<Text, _>(status.as_str())
                                    .bind::<BigInt, _>(reviewer_id)
                                    .bind::<Nullable<Text>, _>(comments)
                                    .bind::<BigInt, _>(id)
                                    .get_result::<SubmissionRow>(conn)
                                    .optional()?;
    Ok(row.map(SubmissionRow::into_domain).transpose()?)
}

fn mark_deleted(conn: &mut PgConnection, id: SubmissionId) -> Result<bool, DbError> {
    let affected = diesel::sql_query("UPDATE form_submissions SET status = 'deleted', updated_at = NOW() WHERE id = $1")
        .bind::<BigInt, _>(id)
        .execute(conn)?;
    Ok(affected > 0)
}

/// Store de envíos respaldado por Postgres.
pub struct PgFormSubmissionStore<P: ConnectionProvider> {
    pub provider: P,
    policy: TransitionPolicy,
}

impl<P: ConnectionProvider> PgFormSubmissionStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, policy: TransitionPolicy::default() }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }
}

impl<P: ConnectionProvider> FormSubmissionStore for PgFormSubmissionStore<P> {
    fn create(&mut self, user_id: UserId, form_type: &str, form_data: &Value) -> Result<FormSubmission, PersistenceError> {
        let created = with_connection(&self.provider, StoreOp::CreateSubmission, |conn| {
            let result = conn.build_transaction().read_write().run(|tx| {
                                                                  let new_row = NewSubmissionRow { user_id,
                                                                                                   form_type,
                                                                                                   form_data,
                                                                                                   status: SubmissionStatus::Pending.as_str() };
                                                                  let row = diesel::insert_into(form_submissions::table)
                                                                      .values(new_row)
                                                                      .returning(SubmissionRow::as_returning())
                                                                      .get_result::<SubmissionRow>(tx)?;
                                                                  Ok::<_, DbError>(row.into_domain()?)
                                                              });
            if result.is_err() {
                warn!("create submission user_id={user_id} form_type={form_type}: transaction rolled back");
            }
            result
        })?;
        debug!("create submission id={} user_id={user_id} form_type={form_type}", created.id);
        Ok(created)
    }

    fn find_by_id(&self, id: SubmissionId) -> Result<Option<SubmissionDetail>, PersistenceError> {
        with_connection(&self.provider, StoreOp::FindSubmission, |conn| {
            let mut b = SqlBuilder::new(&detail_select());
            b.filter(Column::Id, Cmp::Eq, BindValue::BigInt(id));
            let row = b.into_query().get_result::<SubmissionDetailRow>(conn).optional()?;
            Ok(row.map(SubmissionDetailRow::into_domain).transpose()?)
        })
    }

    fn user_submissions(&self,
                        user_id: UserId,
                        filter: &UserSubmissionFilter,
                        page: PageRequest)
                        -> Result<SubmissionPage<FormSubmission>, PersistenceError> {
        let filters = |b: &mut SqlBuilder| {
            b.filter(Column::UserId, Cmp::Eq, BindValue::BigInt(user_id));
            if let Some(form_type) = &filter.form_type {
                b.filter(Column::FormType, Cmp::Eq, BindValue::Text(form_type.clone()));
            }
            if let Some(status) = filter.status {
                b.filter(Column::Status, Cmp::Eq, BindValue::Text(status.as_str().to_string()));
            }
        };
        let result = with_connection(&self.provider, StoreOp::UserSubmissions, |conn| {
            let mut count = SqlBuilder::new("SELECT COUNT(*) AS total FROM form_submissions fs");
            filters(&mut count);
            let total = count.into_query().get_result::<CountRow>(conn)?.total;

            let mut select = SqlBuilder::new(&format!("SELECT {SUBMISSION_COLUMNS} FROM form_submissions fs"));
            filters(&mut select);
            select.order_by(sort_column(SortField::SubmittedAt), SortOrder::Desc)
                  .paginate(page);
            let rows = select.into_query().load::<SubmissionRow>(conn)?;
            let submissions = rows.into_iter()
                                  .map(SubmissionRow::into_domain)
                                  .collect::<Result<Vec<_>, _>>()?;
            Ok(SubmissionPage::new(submissions, total.max(0) as u64, page))
        })?;
        debug!("user_submissions user_id={user_id} page={} total={}", page.page, result.total_count);
        Ok(result)
    }

    fn all_submissions(&self,
                       query: &SubmissionQuery,
                       page: PageRequest)
                       -> Result<SubmissionPage<SubmissionDetail>, PersistenceError> {
        let result = with_connection(&self.provider, StoreOp::AllSubmissions, |conn| {
            load_detail_page(conn, page, (query.sort_by, query.sort_order), |b| apply_query_filters(b, query))
        })?;
        debug!("all_submissions sort_by={} page={} total={}",
               query.sort_by.as_str(),
               page.page,
               result.total_count);
        Ok(result)
    }

    fn pending_submissions(&self, page: PageRequest) -> Result<SubmissionPage<SubmissionDetail>, PersistenceError> {
        with_connection(&self.provider, StoreOp::PendingSubmissions, |conn| {
            load_detail_page(conn, page, (SortField::SubmittedAt, SortOrder::Asc), |b| {
                b.filter(Column::Status, Cmp::Eq, BindValue::Text(SubmissionStatus::Pending.as_str().to_string()));
            })
        })
    }

    fn update_status(&mut self,
                     id: SubmissionId,
                     status: SubmissionStatus,
                     reviewer_id: UserId,
                     comments: Option<&str>)
                     -> Result<Option<FormSubmission>, PersistenceError> {
        let policy = self.policy;
        let updated = with_connection(&self.provider, StoreOp::UpdateStatus, |conn| {
            if !policy.is_strict() {
                return write_status(conn, id, status, reviewer_id, comments);
            }
            conn.build_transaction().read_write().run(|tx| {
                                                     let current = match lock_status(tx, id)? {
                                                         Some(current) => current,
                                                         None => return Ok(None),
                                                     };
                                                     policy.check(current, status)?;
                                                     write_status(tx, id, status, reviewer_id, comments)
                                                 })
        })?;
        debug!("update_status id={id} status={status} reviewer_id={reviewer_id} found={}", updated.is_some());
        Ok(updated)
    }

    fn delete(&mut self, id: SubmissionId) -> Result<bool, PersistenceError> {
        let policy = self.policy;
        let deleted = with_connection(&self.provider, StoreOp::DeleteSubmission, |conn| {
            if !policy.is_strict() {
                return mark_deleted(conn, id);
            }
            conn.build_transaction().read_write().run(|tx| {
                                                     let current = match lock_status(tx, id)? {
                                                         Some(current) => current,
                                                         None => return Ok(false),
                                                     };
                                                     policy.check(current, SubmissionStatus::Deleted)?;
                                                     mark_deleted(tx, id)
                                                 })
        })?;
        debug!("delete submission id={id} affected={deleted}");
        Ok(deleted)
    }

    fn analytics(&self, filter: &AnalyticsFilter) -> Result<SubmissionAnalytics, PersistenceError> {
        with_connection(&self.provider, StoreOp::Analytics, |conn| {
            let mut overall = SqlBuilder::new("SELECT COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE fs.status = 'pending') AS pending, \
                 COUNT(*) FILTER (WHERE fs.status = 'approved') AS approved, \
                 COUNT(*) FILTER (WHERE fs.status = 'rejected') AS rejected, \
                 COUNT(*) FILTER (WHERE fs.status = 'deleted') AS deleted, \
                 (AVG(EXTRACT(EPOCH FROM (fs.reviewed_at - fs.submitted_at)) / 3600) \
                 FILTER (WHERE fs.reviewed_at IS NOT NULL))::float8 AS avg_review_hours \
                 FROM form_submissions fs");
            apply_analytics_filters(&mut overall, filter);
            let overall = overall.into_query().get_result::<OverallRow>(conn)?;

            let mut by_type = SqlBuilder::new("SELECT fs.form_type, COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE fs.status = 'pending') AS pending, \
                 COUNT(*) FILTER (WHERE fs.status = 'approved') AS approved, \
                 COUNT(*) FILTER (WHERE fs.status = 'rejected') AS rejected \
                 FROM form_submissions fs");
            apply_analytics_filters(&mut by_type, filter);
            by_type.push(" GROUP BY fs.form_type ORDER BY total DESC, fs.form_type ASC");
            let by_type = by_type.into_query().load::<FormTypeRow>(conn)?;

            let mut by_month = SqlBuilder::new("SELECT to_char(date_trunc('month', fs.submitted_at AT TIME ZONE 'UTC'), \
                 'YYYY-MM') AS month, COUNT(*) AS total FROM form_submissions fs");
            apply_analytics_filters(&mut by_month, filter);
            if let Some(start) = month_window_start(Utc::now()) {
                by_month.filter(Column::SubmittedAt, Cmp::Gte, BindValue::Timestamptz(start));
            }
            by_month.push(" GROUP BY 1 ORDER BY 1 DESC");
            let by_month = by_month.into_query().load::<MonthRow>(conn)?;

            Ok(SubmissionAnalytics { overall: overall.into(),
                                     by_form_type: by_type.into_iter().map(Into::into).collect(),
                                     by_month: by_month.into_iter().map(Into::into).collect() })
        })
    }

    fn dashboard_stats(&self) -> Result<DashboardStats, PersistenceError> {
        with_connection(&self.provider, StoreOp::DashboardStats, |conn| {
            let row = diesel::sql_query("SELECT COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                 COUNT(*) FILTER (WHERE status = 'approved') AS approved, \
                 COUNT(*) FILTER (WHERE status = 'rejected') AS rejected, \
                 COUNT(*) FILTER (WHERE submitted_at >= date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC') AS today, \
                 COUNT(*) FILTER (WHERE submitted_at >= NOW() - INTERVAL '7 days') AS this_week, \
                 COUNT(*) FILTER (WHERE submitted_at >= NOW() - INTERVAL '30 days') AS this_month \
                 FROM form_submissions WHERE status <> 'deleted'").get_result::<DashboardRow>(conn)?;
            Ok(row.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::month_window_start;
    use chrono::{TimeZone, Utc};

    #[test]
    fn month_window_starts_eleven_months_back() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        assert_eq!(month_window_start(now), Some(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()));
        let january = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(month_window_start(january), Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }
}
