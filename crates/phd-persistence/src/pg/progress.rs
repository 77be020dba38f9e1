//! `FormProgressStore` sobre Postgres.

use chrono::{DateTime, Datelike, Duration, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Jsonb, Text, Timestamptz};
use log::debug;
use phd_core::{FormProgressStore, PersistenceError, StoreOp};
use phd_domain::{FormProgress, ProgressStat, ProgressSummary, ProgressWithUser, UserId};
use serde_json::Value;

use super::rows::{ProgressRow, ProgressStatRow, PROGRESS_COLUMNS};
use super::{with_connection, ConnectionProvider};
use crate::schema::{form_progress, users};

/// Año más antiguo que acepta `timestamptz` (4713 a.C. en calendario proléptico).
const PG_MIN_YEAR: i32 = -4712;

/// Corte de retención `now - days`; `None` si cae fuera del rango de Postgres,
/// en cuyo caso ningún borrador es más viejo que él.
fn retention_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d))
                                       .filter(|cutoff| cutoff.year() > PG_MIN_YEAR)
}

/// Store de borradores respaldado por Postgres. Una fila por
/// `(user_id, form_type)`, garantizado por la restricción única de la tabla.
pub struct PgFormProgressStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgFormProgressStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> FormProgressStore for PgFormProgressStore<P> {
    fn save_progress(&mut self,
                     user_id: UserId,
                     form_type: &str,
                     form_data: &Value,
                     step_number: i32)
                     -> Result<FormProgress, PersistenceError> {
        let sql = format!("INSERT INTO form_progress (user_id, form_type, form_data, step_number, updated_at) \
                           VALUES ($1, $2, $3, $4, NOW()) \
                           ON CONFLICT (user_id, form_type) DO UPDATE SET \
                           form_data = EXCLUDED.form_data, step_number = EXCLUDED.step_number, updated_at = NOW() \
                           RETURNING {PROGRESS_COLUMNS}");
        let row = with_connection(&self.provider, StoreOp::SaveProgress, |conn| {
            Ok(diesel::sql_query(sql).bind::<BigInt, _>(user_id)
                                     .bind::<Text, _>(form_type)
                                     .bind::<Jsonb, _>(form_data)
                                     .bind::<Integer, _>(step_number)
                                     .get_result::<ProgressRow>(conn)?)
        })?;
        debug!("save_progress user_id={user_id} form_type={form_type} step={step_number}");
        Ok(row.into())
    }

    fn load_progress(&self, user_id: UserId, form_type: &str) -> Result<Option<FormProgress>, PersistenceError> {
        with_connection(&self.provider, StoreOp::LoadProgress, |conn| {
            let row = form_progress::table.filter(form_progress::user_id.eq(user_id))
                                          .filter(form_progress::form_type.eq(form_type))
                                          .select(ProgressRow::as_select())
                                          .first(conn)
                                          .optional()?;
            Ok(row.map(FormProgress::from))
        })
    }

    fn clear_progress(&mut self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError> {
        let removed = with_connection(&self.provider, StoreOp::ClearProgress, |conn| {
            Ok(diesel::delete(form_progress::table.filter(form_progress::user_id.eq(user_id))
                                                  .filter(form_progress::form_type.eq(form_type))).execute(conn)?)
        })?;
        debug!("clear_progress user_id={user_id} form_type={form_type} removed={removed}");
        Ok(true)
    }

    fn user_progress(&self, user_id: UserId) -> Result<Vec<ProgressSummary>, PersistenceError> {
        with_connection(&self.provider, StoreOp::UserProgress, |conn| {
            let rows = form_progress::table.filter(form_progress::user_id.eq(user_id))
                                           .order((form_progress::updated_at.desc(), form_progress::id.desc()))
                                           .select((form_progress::form_type,
                                                    form_progress::step_number,
                                                    form_progress::updated_at))
                                           .load::<(String, i32, DateTime<Utc>)>(conn)?;
            Ok(rows.into_iter()
                   .map(|(form_type, step_number, updated_at)| ProgressSummary { form_type,
                                                                                 step_number,
                                                                                 updated_at })
                   .collect())
        })
    }

    fn has_progress(&self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError> {
        with_connection(&self.provider, StoreOp::HasProgress, |conn| {
            Ok(diesel::select(exists(form_progress::table.filter(form_progress::user_id.eq(user_id))
                                                         .filter(form_progress::form_type.eq(form_type))))
                   .get_result::<bool>(conn)?)
        })
    }

    fn update_step(&mut self,
                   user_id: UserId,
                   form_type: &str,
                   step_number: i32)
                   -> Result<Option<FormProgress>, PersistenceError> {
        let sql = format!("UPDATE form_progress SET step_number = $1, updated_at = NOW() \
                           WHERE user_id = $2 AND form_type = $3 RETURNING {PROGRESS_COLUMNS}");
        with_connection(&self.provider, StoreOp::UpdateStep, |conn| {
            let row = diesel::sql_query(sql).bind::<Integer, _>(step_number)
                                            .bind::<BigInt, _>(user_id)
                                            .bind::<Text, _>(form_type)
                                            .get_result::<ProgressRow>(conn)
                                            .optional()?;
            Ok(row.map(FormProgress::from))
        })
    }

    fn progress_stats(&self) -> Result<Vec<ProgressStat>, PersistenceError> {
        with_connection(&self.provider, StoreOp::ProgressStats, |conn| {
            let rows = diesel::sql_query("SELECT form_type, COUNT(*) AS total_progress, \
                                          AVG(step_number)::float8 AS average_step, MAX(step_number) AS max_step \
                                          FROM form_progress GROUP BY form_type \
                                          ORDER BY total_progress DESC, form_type ASC").load::<ProgressStatRow>(conn)?;
            Ok(rows.into_iter().map(ProgressStat::from).collect())
        })
    }

    fn progress_by_date_range(&self,
                              start: DateTime<Utc>,
                              end: DateTime<Utc>)
                              -> Result<Vec<ProgressWithUser>, PersistenceError> {
        with_connection(&self.provider, StoreOp::ProgressByDateRange, |conn| {
            let rows = form_progress::table.inner_join(users::table)
                                           .filter(form_progress::updated_at.between(start, end))
                                           .order((form_progress::updated_at.desc(), form_progress::id.desc()))
                                           .select((ProgressRow::as_select(),
                                                    users::first_name,
                                                    users::last_name,
                                                    users::email))
                                           .load::<(ProgressRow, String, String, String)>(conn)?;
            Ok(rows.into_iter()
                   .map(|(row, first_name, last_name, email)| ProgressWithUser { progress: row.into(),
                                                                                 first_name,
                                                                                 last_name,
                                                                                 email })
                   .collect())
        })
    }

    fn cleanup_old_progress(&mut self, days: u32) -> Result<u64, PersistenceError> {
        let Some(cutoff) = retention_cutoff(Utc::now(), days) else {
            debug!("cleanup_old_progress days={days} removed=0 (corte fuera de rango)");
            return Ok(0);
        };
        let removed = with_connection(&self.provider, StoreOp::CleanupProgress, |conn| {
            Ok(diesel::sql_query("DELETE FROM form_progress fp \
                                  WHERE fp.updated_at < $1 \
                                  AND NOT EXISTS (SELECT 1 FROM form_submissions fs \
                                  WHERE fs.user_id = fp.user_id AND fs.submitted_at > $1)").bind::<Timestamptz, _>(cutoff)
                                                                                           .execute(conn)?)
        })?;
        debug!("cleanup_old_progress days={days} removed={removed}");
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::retention_cutoff;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn cutoff_is_now_minus_days() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert_eq!(retention_cutoff(now, 30), Some(now - Duration::days(30)));
        assert_eq!(retention_cutoff(now, 0), Some(now));
    }

    #[test]
    fn cutoff_beyond_postgres_range_is_none() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert_eq!(retention_cutoff(now, u32::MAX), None);
        assert_eq!(retention_cutoff(now, i32::MAX as u32), None);
    }
}
