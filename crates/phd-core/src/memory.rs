//! Backend en memoria con paridad respecto a Postgres.
//!
//! Un único `InMemoryForms` implementa ambos traits porque la limpieza de
//! borradores necesita ver los envíos (en Postgres es una sola consulta sobre
//! las dos tablas). También simula las llaves foráneas hacia `users`: guardar
//! un borrador o un envío para un usuario desconocido falla igual que en la
//! base de datos.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Utc};
use log::debug;
use phd_domain::{AnalyticsFilter, DashboardStats, FormProgress, FormSubmission, FormTypeStats, MonthlyCount,
                 OverallStats, PageRequest, ProgressId, ProgressStat, ProgressSummary, ProgressWithUser, SortField,
                 SortOrder, SubmissionAnalytics, SubmissionDetail, SubmissionId, SubmissionPage, SubmissionQuery,
                 SubmissionStatus, UserId, UserProfile, UserSubmissionFilter};
use serde_json::Value;

use crate::errors::{PersistenceError, StoreFault, StoreOp};
use crate::policy::TransitionPolicy;
use crate::store::{FormProgressStore, FormSubmissionStore};

#[derive(Debug, Default)]
pub struct InMemoryForms {
    users: BTreeMap<UserId, UserProfile>,
    progress: BTreeMap<(UserId, String), FormProgress>,
    submissions: BTreeMap<SubmissionId, FormSubmission>,
    next_progress_id: ProgressId,
    next_submission_id: SubmissionId,
    policy: TransitionPolicy,
    clock: Option<DateTime<Utc>>,
    last_tick: Option<DateTime<Utc>>,
}

impl InMemoryForms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn add_user(&mut self, user: UserProfile) {
        self.users.insert(user.id, user);
    }

    /// Fija el reloj (tests). Sin reloj fijo se usa `Utc::now()`.
    pub fn set_clock(&mut self, now: DateTime<Utc>) {
        self.clock = Some(now);
    }

    /// Reescribe `updated_at` de un borrador existente (simula filas viejas).
    pub fn backdate_progress(&mut self, user_id: UserId, form_type: &str, at: DateTime<Utc>) -> bool {
        match self.progress.get_mut(&(user_id, form_type.to_string())) {
            Some(p) => {
                p.updated_at = at;
                true
            }
            None => false,
        }
    }

    /// Reescribe `submitted_at` de un envío existente.
    pub fn backdate_submission(&mut self, id: SubmissionId, at: DateTime<Utc>) -> bool {
        match self.submissions.get_mut(&id) {
            Some(s) => {
                s.submitted_at = at;
                true
            }
            None => false,
        }
    }

    pub fn progress_rows(&self) -> usize {
        self.progress.len()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    // Reloj estrictamente creciente para escrituras consecutivas.
    fn tick(&mut self) -> DateTime<Utc> {
        let mut now = self.now();
        if let Some(last) = self.last_tick {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_tick = Some(now);
        now
    }

    fn require_user(&self, op: StoreOp, user_id: UserId) -> Result<&UserProfile, PersistenceError> {
        self.users.get(&user_id).ok_or_else(|| {
            PersistenceError::new(op,
                                  StoreFault::ForeignKeyViolation(format!("user {user_id} is not present in table \"users\"")))
        })
    }

    fn detail(&self, submission: &FormSubmission) -> Option<SubmissionDetail> {
        let owner = self.users.get(&submission.user_id)?;
        let reviewer = submission.reviewed_by.and_then(|id| self.users.get(&id));
        Some(SubmissionDetail { submission: submission.clone(),
                                first_name: owner.first_name.clone(),
                                last_name: owner.last_name.clone(),
                                email: owner.email.clone(),
                                role: owner.role.clone(),
                                reviewer_first_name: reviewer.map(|r| r.first_name.clone()),
                                reviewer_last_name: reviewer.map(|r| r.last_name.clone()) })
    }

    fn matches_search(detail: &SubmissionDetail, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        detail.first_name.to_lowercase().contains(&needle)
        || detail.last_name.to_lowercase().contains(&needle)
        || detail.email.to_lowercase().contains(&needle)
        || jsonb_text(&detail.submission.form_data).to_lowercase().contains(&needle)
    }

    fn compare(a: &SubmissionDetail, b: &SubmissionDetail, field: SortField) -> Ordering {
        let primary = match field {
            SortField::SubmittedAt => a.submission.submitted_at.cmp(&b.submission.submitted_at),
            SortField::Status => a.submission.status.as_str().cmp(b.submission.status.as_str()),
            SortField::FormType => a.submission.form_type.cmp(&b.submission.form_type),
            SortField::FirstName => a.first_name.cmp(&b.first_name),
            SortField::LastName => a.last_name.cmp(&b.last_name),
        };
        primary.then(a.submission.id.cmp(&b.submission.id))
    }

    fn paginate<T>(rows: Vec<T>, page: PageRequest) -> SubmissionPage<T> {
        let total = rows.len() as u64;
        let window = rows.into_iter()
                         .skip(page.offset() as usize)
                         .take(page.limit as usize)
                         .collect();
        SubmissionPage::new(window, total, page)
    }
}

impl FormProgressStore for InMemoryForms {
    fn save_progress(&mut self,
                     user_id: UserId,
                     form_type: &str,
                     form_data: &Value,
                     step_number: i32)
                     -> Result<FormProgress, PersistenceError> {
        self.require_user(StoreOp::SaveProgress, user_id)?;
        let now = self.tick();
        let key = (user_id, form_type.to_string());
        let row = match self.progress.get_mut(&key) {
            Some(existing) => {
                existing.form_data = form_data.clone();
                existing.step_number = step_number;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                self.next_progress_id += 1;
                let row = FormProgress { id: self.next_progress_id,
                                         user_id,
                                         form_type: form_type.to_string(),
                                         form_data: form_data.clone(),
                                         step_number,
                                         created_at: now,
                                         updated_at: now };
                self.progress.insert(key, row.clone());
                row
            }
        };
        debug!("save_progress user_id={user_id} form_type={form_type} step={step_number}");
        Ok(row)
    }

    fn load_progress(&self, user_id: UserId, form_type: &str) -> Result<Option<FormProgress>, PersistenceError> {
        Ok(self.progress.get(&(user_id, form_type.to_string())).cloned())
    }

    fn clear_progress(&mut self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError> {
        self.progress.remove(&(user_id, form_type.to_string()));
        Ok(true)
    }

    fn user_progress(&self, user_id: UserId) -> Result<Vec<ProgressSummary>, PersistenceError> {
        let mut rows: Vec<&FormProgress> = self.progress.values().filter(|p| p.user_id == user_id).collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows.into_iter().map(ProgressSummary::from).collect())
    }

    fn has_progress(&self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError> {
        Ok(self.progress.contains_key(&(user_id, form_type.to_string())))
    }

    fn update_step(&mut self,
                   user_id: UserId,
                   form_type: &str,
                   step_number: i32)
                   -> Result<Option<FormProgress>, PersistenceError> {
        let key = (user_id, form_type.to_string());
        if !self.progress.contains_key(&key) {
            return Ok(None);
        }
        let now = self.tick();
        Ok(self.progress.get_mut(&key).map(|row| {
                                          row.step_number = step_number;
                                          row.updated_at = now;
                                          row.clone()
                                      }))
    }

    fn progress_stats(&self) -> Result<Vec<ProgressStat>, PersistenceError> {
        let mut groups: BTreeMap<&str, (i64, i64, i32)> = BTreeMap::new();
        for p in self.progress.values() {
            let entry = groups.entry(p.form_type.as_str()).or_insert((0, 0, i32::MIN));
            entry.0 += 1;
            entry.1 += p.step_number as i64;
            entry.2 = entry.2.max(p.step_number);
        }
        let mut stats: Vec<ProgressStat> =
            groups.into_iter()
                  .map(|(form_type, (total, sum, max))| ProgressStat { form_type: form_type.to_string(),
                                                                         total_progress: total,
                                                                         average_step: sum as f64 / total as f64,
                                                                         max_step: max })
                  .collect();
        stats.sort_by(|a, b| b.total_progress.cmp(&a.total_progress).then_with(|| a.form_type.cmp(&b.form_type)));
        Ok(stats)
    }

    fn progress_by_date_range(&self,
                              start: DateTime<Utc>,
                              end: DateTime<Utc>)
                              -> Result<Vec<ProgressWithUser>, PersistenceError> {
        let mut rows: Vec<ProgressWithUser> =
            self.progress
                .values()
                .filter(|p| p.updated_at >= start && p.updated_at <= end)
                .filter_map(|p| {
                    self.users.get(&p.user_id).map(|u| ProgressWithUser { progress: p.clone(),
                                                                          first_name: u.first_name.clone(),
                                                                          last_name: u.last_name.clone(),
                                                                          email: u.email.clone() })
                })
                .collect();
        rows.sort_by(|a, b| b.progress.updated_at.cmp(&a.progress.updated_at));
        Ok(rows)
    }

    fn cleanup_old_progress(&mut self, days: u32) -> Result<u64, PersistenceError> {
        // Un corte anterior al mínimo representable no deja nada más viejo.
        let Some(cutoff) = Duration::try_days(i64::from(days)).and_then(|d| self.now().checked_sub_signed(d)) else {
            debug!("cleanup_old_progress days={days} removed=0 (corte fuera de rango)");
            return Ok(0);
        };
        let recent_submitters: Vec<UserId> = self.submissions
                                                 .values()
                                                 .filter(|s| s.submitted_at > cutoff)
                                                 .map(|s| s.user_id)
                                                 .collect();
        let before = self.progress.len();
        self.progress
            .retain(|_, p| p.updated_at >= cutoff || recent_submitters.contains(&p.user_id));
        let removed = (before - self.progress.len()) as u64;
        debug!("cleanup_old_progress days={days} removed={removed}");
        Ok(removed)
    }
}

impl FormSubmissionStore for InMemoryForms {
    fn create(&mut self, user_id: UserId, form_type: &str, form_data: &Value) -> Result<FormSubmission, PersistenceError> {
        self.require_user(StoreOp::CreateSubmission, user_id)?;
        let now = self.tick();
        self.next_submission_id += 1;
        let row = FormSubmission { id: self.next_submission_id,
                                   user_id,
                                   form_type: form_type.to_string(),
                                   form_data: form_data.clone(),
                                   status: SubmissionStatus::Pending,
                                   submitted_at: now,
                                   reviewed_by: None,
                                   review_comments: None,
                                   reviewed_at: None,
                                   updated_at: now };
        self.submissions.insert(row.id, row.clone());
        debug!("create submission id={} user_id={user_id} form_type={form_type}", row.id);
        Ok(row)
    }

    fn find_by_id(&self, id: SubmissionId) -> Result<Option<SubmissionDetail>, PersistenceError> {
        Ok(self.submissions.get(&id).and_then(|s| self.detail(s)))
    }

    fn user_submissions(&self,
                        user_id: UserId,
                        filter: &UserSubmissionFilter,
                        page: PageRequest)
                        -> Result<SubmissionPage<FormSubmission>, PersistenceError> {
        let mut rows: Vec<FormSubmission> =
            self.submissions
                .values()
                .filter(|s| s.user_id == user_id)
                .filter(|s| filter.form_type.as_deref().map_or(true, |ft| s.form_type == ft))
                .filter(|s| filter.status.map_or(true, |st| s.status == st))
                .cloned()
                .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(Self::paginate(rows, page))
    }

    fn all_submissions(&self,
                       query: &SubmissionQuery,
                       page: PageRequest)
                       -> Result<SubmissionPage<SubmissionDetail>, PersistenceError> {
        let mut rows: Vec<SubmissionDetail> =
            self.submissions
                .values()
                .filter(|s| query.form_type.as_deref().map_or(true, |ft| s.form_type == ft))
                .filter(|s| query.status.map_or(true, |st| s.status == st))
                .filter_map(|s| self.detail(s))
                .filter(|d| query.search_term().map_or(true, |needle| Self::matches_search(d, needle)))
                .collect();
        rows.sort_by(|a, b| {
                let ord = Self::compare(a, b, query.sort_by);
                match query.sort_order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        Ok(Self::paginate(rows, page))
    }

    fn pending_submissions(&self, page: PageRequest) -> Result<SubmissionPage<SubmissionDetail>, PersistenceError> {
        let mut rows: Vec<SubmissionDetail> = self.submissions
                                                  .values()
                                                  .filter(|s| s.status == SubmissionStatus::Pending)
                                                  .filter_map(|s| self.detail(s))
                                                  .collect();
        rows.sort_by(|a, b| Self::compare(a, b, SortField::SubmittedAt));
        Ok(Self::paginate(rows, page))
    }

    fn update_status(&mut self,
                     id: SubmissionId,
                     status: SubmissionStatus,
                     reviewer_id: UserId,
                     comments: Option<&str>)
                     -> Result<Option<FormSubmission>, PersistenceError> {
        let current = match self.submissions.get(&id) {
            Some(s) => s.status,
            None => return Ok(None),
        };
        self.policy
            .check(current, status)
            .map_err(|fault| PersistenceError::new(StoreOp::UpdateStatus, fault))?;
        self.require_user(StoreOp::UpdateStatus, reviewer_id)?;
        let now = self.tick();
        Ok(self.submissions.get_mut(&id).map(|row| {
                                            row.status = status;
                                            row.reviewed_by = Some(reviewer_id);
                                            row.review_comments = comments.map(str::to_string);
                                            row.reviewed_at = Some(now);
                                            row.updated_at = now;
                                            row.clone()
                                        }))
    }

    fn delete(&mut self, id: SubmissionId) -> Result<bool, PersistenceError> {
        let current = match self.submissions.get(&id) {
            Some(s) => s.status,
            None => return Ok(false),
        };
        self.policy
            .check(current, SubmissionStatus::Deleted)
            .map_err(|fault| PersistenceError::new(StoreOp::DeleteSubmission, fault))?;
        let now = self.tick();
        if let Some(row) = self.submissions.get_mut(&id) {
            row.status = SubmissionStatus::Deleted;
            row.updated_at = now;
        }
        Ok(true)
    }

    fn analytics(&self, filter: &AnalyticsFilter) -> Result<SubmissionAnalytics, PersistenceError> {
        let rows: Vec<&FormSubmission> =
            self.submissions
                .values()
                .filter(|s| filter.form_type.as_deref().map_or(true, |ft| s.form_type == ft))
                .filter(|s| filter.start_date.map_or(true, |start| s.submitted_at >= start))
                .filter(|s| filter.end_date.map_or(true, |end| s.submitted_at <= end))
                .collect();

        let mut overall = OverallStats::default();
        let mut review_hours = Vec::new();
        let mut by_type: HashMap<&str, FormTypeStats> = HashMap::new();
        let mut by_month: BTreeMap<String, i64> = BTreeMap::new();
        for s in &rows {
            overall.total += 1;
            let entry = by_type.entry(s.form_type.as_str()).or_insert_with(|| FormTypeStats { form_type: s.form_type.clone(),
                                                                                               total: 0,
                                                                                               pending: 0,
                                                                                               approved: 0,
                                                                                               rejected: 0 });
            entry.total += 1;
            match s.status {
                SubmissionStatus::Pending => {
                    overall.pending += 1;
                    entry.pending += 1;
                }
                SubmissionStatus::Approved => {
                    overall.approved += 1;
                    entry.approved += 1;
                }
                SubmissionStatus::Rejected => {
                    overall.rejected += 1;
                    entry.rejected += 1;
                }
                SubmissionStatus::Deleted => overall.deleted += 1,
            }
            if let Some(reviewed_at) = s.reviewed_at {
                review_hours.push((reviewed_at - s.submitted_at).num_milliseconds() as f64 / 3_600_000.0);
            }
            *by_month.entry(s.submitted_at.format("%Y-%m").to_string()).or_insert(0) += 1;
        }
        if !review_hours.is_empty() {
            overall.avg_review_hours = Some(review_hours.iter().sum::<f64>() / review_hours.len() as f64);
        }

        let mut by_form_type: Vec<FormTypeStats> = by_type.into_values().collect();
        by_form_type.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.form_type.cmp(&b.form_type)));
        let first_month = first_reported_month(self.now());
        let by_month = by_month.into_iter()
                               .rev()
                               .take_while(|(month, _)| *month >= first_month)
                               .map(|(month, total)| MonthlyCount { month, total })
                               .collect();
        Ok(SubmissionAnalytics { overall, by_form_type, by_month })
    }

    fn dashboard_stats(&self) -> Result<DashboardStats, PersistenceError> {
        let now = self.now();
        let start_of_day = now.date_naive().and_hms_opt(0, 0, 0).map(|d| d.and_utc()).unwrap_or(now);
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);
        let mut stats = DashboardStats::default();
        for s in self.submissions.values().filter(|s| s.status != SubmissionStatus::Deleted) {
            stats.total += 1;
            match s.status {
                SubmissionStatus::Pending => stats.pending += 1,
                SubmissionStatus::Approved => stats.approved += 1,
                SubmissionStatus::Rejected => stats.rejected += 1,
                SubmissionStatus::Deleted => {}
            }
            if s.submitted_at >= start_of_day {
                stats.today += 1;
            }
            if s.submitted_at >= week_ago {
                stats.this_week += 1;
            }
            if s.submitted_at >= month_ago {
                stats.this_month += 1;
            }
        }
        Ok(stats)
    }
}

/// Primer mes (`YYYY-MM`, UTC) de la ventana de 12 meses que termina en el mes de `now`.
fn first_reported_month(now: DateTime<Utc>) -> String {
    let index = now.year() * 12 + now.month0() as i32 - 11;
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

/// Texto de `form_data` tal como lo imprime `jsonb::text` en Postgres:
/// separadores `", "` y `": "`, claves ordenadas por longitud y luego por bytes.
fn jsonb_text(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            let body: Vec<String> = entries.into_iter()
                                           .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), jsonb_text(v)))
                                           .collect();
            format!("{{{}}}", body.join(", "))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(jsonb_text).collect();
            format!("[{}]", body.join(", "))
        }
        scalar => scalar.to_string(),
    }
}
