//! CLI de operación: `phd-tracker <progress|submission> <acción> [--flag valor]...`
//!
//! El parseo produce un `Command` tipado; el despacho es genérico sobre los
//! traits de store, así que los mismos comandos corren contra Postgres o
//! contra `InMemoryForms`.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::info;
use phd_core::{FormProgressStore, FormSubmissionStore, DEFAULT_STEP};
use phd_domain::{parse_timestamp, AnalyticsFilter, DomainError, PageRequest, SortField, SortOrder, SubmissionId,
                 SubmissionQuery, SubmissionStatus, UserId, UserSubmissionFilter, DEFAULT_PAGE_LIMIT};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;

pub const USAGE: &str = "\
Uso: phd-tracker <grupo> <acción> [--flag valor]...

progress save     --user <ID> --form <TIPO> --data '<JSON>' [--step <N>]
progress load     --user <ID> --form <TIPO>
progress clear    --user <ID> --form <TIPO>
progress list     --user <ID>
progress step     --user <ID> --form <TIPO> --step <N>
progress stats
progress range    --from <FECHA> --to <FECHA>
progress cleanup  [--days <N>]

submission create    --user <ID> --form <TIPO> --data '<JSON>'
submission show      --id <ID>
submission mine      --user <ID> [--form <TIPO>] [--status <S>] [--page <N>] [--limit <N>]
submission list      [--form <TIPO>] [--status <S>] [--search <TXT>] [--sort-by <CAMPO>]
                     [--sort-order asc|desc] [--page <N>] [--limit <N>]
submission pending   [--page <N>] [--limit <N>]
submission status    --id <ID> --status <S> --reviewer <ID> [--comments <TXT>]
submission approve   --id <ID> --reviewer <ID> [--comments <TXT>]
submission reject    --id <ID> --reviewer <ID> [--comments <TXT>]
submission delete    --id <ID>
submission analytics [--form <TIPO>] [--from <FECHA>] [--to <FECHA>]
submission dashboard

FECHA: RFC 3339 o AAAA-MM-DD (UTC).";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Progress(ProgressCommand),
    Submission(SubmissionCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressCommand {
    Save { user_id: UserId, form_type: String, form_data: Value, step_number: i32 },
    Load { user_id: UserId, form_type: String },
    Clear { user_id: UserId, form_type: String },
    List { user_id: UserId },
    Step { user_id: UserId, form_type: String, step_number: i32 },
    Stats,
    Range { start: DateTime<Utc>, end: DateTime<Utc> },
    /// `None` usa la retención configurada.
    Cleanup { days: Option<u32> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionCommand {
    Create { user_id: UserId, form_type: String, form_data: Value },
    Show { id: SubmissionId },
    Mine { user_id: UserId, filter: UserSubmissionFilter, page: PageRequest },
    List { query: SubmissionQuery, page: PageRequest },
    Pending { page: PageRequest },
    Status { id: SubmissionId, status: SubmissionStatus, reviewer_id: UserId, comments: Option<String> },
    Delete { id: SubmissionId },
    Analytics { filter: AnalyticsFilter },
    Dashboard,
}

/// Resultado de un comando: JSON para stdout, o ausencia (código 4).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Json(Value),
    NotFound(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupReport {
    removed: u64,
    retention_days: u32,
}

/// Pares `--nombre valor`. Un flag repetido conserva el último valor.
struct Flags {
    values: BTreeMap<String, String>,
}

impl Flags {
    fn parse(args: &[String]) -> Result<Self, AppError> {
        let mut values = BTreeMap::new();
        let mut i = 0;
        while i < args.len() {
            let name = args[i].strip_prefix("--")
                              .filter(|n| !n.is_empty())
                              .ok_or_else(|| AppError::Usage(format!("argumento inesperado '{}'", args[i])))?;
            let value = args.get(i + 1)
                            .ok_or_else(|| AppError::Usage(format!("--{name} requiere un valor")))?;
            values.insert(name.to_string(), value.clone());
            i += 2;
        }
        Ok(Self { values })
    }

    fn opt(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn req(&self, name: &str) -> Result<&str, AppError> {
        self.opt(name).ok_or_else(|| AppError::Usage(format!("falta --{name}")))
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.opt(name) {
            None => Ok(None),
            Some(raw) => raw.trim()
                            .parse()
                            .map(Some)
                            .map_err(|_| AppError::Usage(format!("valor inválido para --{name}: '{raw}'"))),
        }
    }

    fn req_parsed<T: FromStr>(&self, name: &str) -> Result<T, AppError> {
        self.parsed(name)?.ok_or_else(|| AppError::Usage(format!("falta --{name}")))
    }

    fn json(&self, name: &str) -> Result<Value, AppError> {
        Ok(serde_json::from_str(self.req(name)?)?)
    }

    fn status(&self, name: &str) -> Result<Option<SubmissionStatus>, AppError> {
        Ok(self.opt(name).map(SubmissionStatus::from_str).transpose()?)
    }

    fn timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.opt(name).map(parse_timestamp).transpose()?)
    }

    fn page(&self) -> Result<PageRequest, AppError> {
        let page = self.parsed("page")?.unwrap_or(1);
        let limit = self.parsed("limit")?.unwrap_or(DEFAULT_PAGE_LIMIT);
        Ok(PageRequest::new(page, limit))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.opt(name).map(str::to_string)
    }
}

/// Parsea los argumentos (sin el nombre del programa).
pub fn parse_args(args: &[String]) -> Result<Command, AppError> {
    let group = match args.first().map(String::as_str) {
        None | Some("help") | Some("--help") | Some("-h") => return Ok(Command::Help),
        Some(g) => g,
    };
    let action = args.get(1)
                     .map(String::as_str)
                     .ok_or_else(|| AppError::Usage(format!("falta la acción de '{group}'")))?;
    let flags = Flags::parse(&args[2..])?;
    match group {
        "progress" => parse_progress(action, &flags).map(Command::Progress),
        "submission" => parse_submission(action, &flags).map(Command::Submission),
        other => Err(AppError::Usage(format!("grupo desconocido '{other}'"))),
    }
}

fn parse_progress(action: &str, flags: &Flags) -> Result<ProgressCommand, AppError> {
    Ok(match action {
        "save" => ProgressCommand::Save { user_id: flags.req_parsed("user")?,
                                          form_type: flags.req("form")?.to_string(),
                                          form_data: flags.json("data")?,
                                          step_number: flags.parsed("step")?.unwrap_or(DEFAULT_STEP) },
        "load" => ProgressCommand::Load { user_id: flags.req_parsed("user")?,
                                          form_type: flags.req("form")?.to_string() },
        "clear" => ProgressCommand::Clear { user_id: flags.req_parsed("user")?,
                                            form_type: flags.req("form")?.to_string() },
        "list" => ProgressCommand::List { user_id: flags.req_parsed("user")? },
        "step" => ProgressCommand::Step { user_id: flags.req_parsed("user")?,
                                          form_type: flags.req("form")?.to_string(),
                                          step_number: flags.req_parsed("step")? },
        "stats" => ProgressCommand::Stats,
        "range" => {
            let start = flags.timestamp("from")?.ok_or_else(|| AppError::Usage("falta --from".into()))?;
            let end = flags.timestamp("to")?.ok_or_else(|| AppError::Usage("falta --to".into()))?;
            if start > end {
                return Err(DomainError::InvalidRange { start: start.to_rfc3339(), end: end.to_rfc3339() }.into());
            }
            ProgressCommand::Range { start, end }
        }
        "cleanup" => ProgressCommand::Cleanup { days: flags.parsed("days")? },
        other => return Err(AppError::Usage(format!("acción desconocida 'progress {other}'"))),
    })
}

fn parse_submission(action: &str, flags: &Flags) -> Result<SubmissionCommand, AppError> {
    let review = |status: SubmissionStatus| -> Result<SubmissionCommand, AppError> {
        Ok(SubmissionCommand::Status { id: flags.req_parsed("id")?,
                                       status,
                                       reviewer_id: flags.req_parsed("reviewer")?,
                                       comments: flags.text("comments") })
    };
    Ok(match action {
        "create" => SubmissionCommand::Create { user_id: flags.req_parsed("user")?,
                                                form_type: flags.req("form")?.to_string(),
                                                form_data: flags.json("data")? },
        "show" => SubmissionCommand::Show { id: flags.req_parsed("id")? },
        "mine" => SubmissionCommand::Mine { user_id: flags.req_parsed("user")?,
                                            filter: UserSubmissionFilter { form_type: flags.text("form"),
                                                                           status: flags.status("status")? },
                                            page: flags.page()? },
        "list" => {
            let query = SubmissionQuery { form_type: flags.text("form"),
                                          status: flags.status("status")?,
                                          search: flags.text("search"),
                                          sort_by: flags.opt("sort-by").map(SortField::parse_or_default).unwrap_or_default(),
                                          sort_order: flags.opt("sort-order")
                                                           .map(SortOrder::parse_or_default)
                                                           .unwrap_or_default() };
            SubmissionCommand::List { query, page: flags.page()? }
        }
        "pending" => SubmissionCommand::Pending { page: flags.page()? },
        "status" => {
            let status = flags.status("status")?.ok_or_else(|| AppError::Usage("falta --status".into()))?;
            review(status)?
        }
        "approve" => review(SubmissionStatus::Approved)?,
        "reject" => review(SubmissionStatus::Rejected)?,
        "delete" => SubmissionCommand::Delete { id: flags.req_parsed("id")? },
        "analytics" => {
            let filter = AnalyticsFilter { form_type: flags.text("form"),
                                           start_date: flags.timestamp("from")?,
                                           end_date: flags.timestamp("to")? };
            filter.validate()?;
            SubmissionCommand::Analytics { filter }
        }
        "dashboard" => SubmissionCommand::Dashboard,
        other => return Err(AppError::Usage(format!("acción desconocida 'submission {other}'"))),
    })
}

/// Ejecuta un comando de borradores. `retention_days` se usa cuando
/// `cleanup` no trae `--days`.
pub fn run_progress<S: FormProgressStore>(cmd: ProgressCommand,
                                          store: &mut S,
                                          retention_days: u32)
                                          -> Result<Outcome, AppError> {
    Ok(match cmd {
        ProgressCommand::Save { user_id, form_type, form_data, step_number } => {
            Outcome::Json(serde_json::to_value(store.save_progress(user_id, &form_type, &form_data, step_number)?)?)
        }
        ProgressCommand::Load { user_id, form_type } => match store.load_progress(user_id, &form_type)? {
            Some(p) => Outcome::Json(serde_json::to_value(p)?),
            None => Outcome::NotFound(format!("sin borrador para user={user_id} form={form_type}")),
        },
        ProgressCommand::Clear { user_id, form_type } => {
            Outcome::Json(json!({ "cleared": store.clear_progress(user_id, &form_type)? }))
        }
        ProgressCommand::List { user_id } => Outcome::Json(serde_json::to_value(store.user_progress(user_id)?)?),
        ProgressCommand::Step { user_id, form_type, step_number } => {
            match store.update_step(user_id, &form_type, step_number)? {
                Some(p) => Outcome::Json(serde_json::to_value(p)?),
                None => Outcome::NotFound(format!("sin borrador para user={user_id} form={form_type}")),
            }
        }
        ProgressCommand::Stats => Outcome::Json(serde_json::to_value(store.progress_stats()?)?),
        ProgressCommand::Range { start, end } => {
            Outcome::Json(serde_json::to_value(store.progress_by_date_range(start, end)?)?)
        }
        ProgressCommand::Cleanup { days } => {
            let retention_days = days.unwrap_or(retention_days);
            let removed = store.cleanup_old_progress(retention_days)?;
            info!("cleanup removed {removed} draft(s) older than {retention_days} day(s)");
            Outcome::Json(serde_json::to_value(CleanupReport { removed, retention_days })?)
        }
    })
}

pub fn run_submission<S: FormSubmissionStore>(cmd: SubmissionCommand, store: &mut S) -> Result<Outcome, AppError> {
    Ok(match cmd {
        SubmissionCommand::Create { user_id, form_type, form_data } => {
            Outcome::Json(serde_json::to_value(store.create(user_id, &form_type, &form_data)?)?)
        }
        SubmissionCommand::Show { id } => match store.find_by_id(id)? {
            Some(detail) => Outcome::Json(serde_json::to_value(detail)?),
            None => Outcome::NotFound(format!("envío {id} no encontrado")),
        },
        SubmissionCommand::Mine { user_id, filter, page } => {
            Outcome::Json(serde_json::to_value(store.user_submissions(user_id, &filter, page)?)?)
        }
        SubmissionCommand::List { query, page } => {
            Outcome::Json(serde_json::to_value(store.all_submissions(&query, page)?)?)
        }
        SubmissionCommand::Pending { page } => Outcome::Json(serde_json::to_value(store.pending_submissions(page)?)?),
        SubmissionCommand::Status { id, status, reviewer_id, comments } => {
            match store.update_status(id, status, reviewer_id, comments.as_deref())? {
                Some(updated) => Outcome::Json(serde_json::to_value(updated)?),
                None => Outcome::NotFound(format!("envío {id} no encontrado")),
            }
        }
        SubmissionCommand::Delete { id } => {
            if store.delete(id)? {
                Outcome::Json(json!({ "deleted": true, "id": id }))
            } else {
                Outcome::NotFound(format!("envío {id} no encontrado"))
            }
        }
        SubmissionCommand::Analytics { filter } => Outcome::Json(serde_json::to_value(store.analytics(&filter)?)?),
        SubmissionCommand::Dashboard => Outcome::Json(serde_json::to_value(store.dashboard_stats()?)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn flags_keep_last_value() {
        let flags = Flags::parse(&args("--user 1 --user 2")).unwrap();
        assert_eq!(flags.req_parsed::<i64>("user").unwrap(), 2);
    }

    #[test]
    fn dangling_flag_is_usage_error() {
        let err = Flags::parse(&args("--user")).err().unwrap();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("--user requiere un valor"));
    }

    #[test]
    fn positional_garbage_is_usage_error() {
        assert!(matches!(Flags::parse(&args("oops")), Err(AppError::Usage(_))));
    }

    #[test]
    fn no_arguments_is_help() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn unknown_group_and_action() {
        assert!(matches!(parse_args(&args("grades list")), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(&args("progress explode")), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(&args("submission")), Err(AppError::Usage(_))));
    }
}
