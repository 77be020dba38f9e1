//! Constructor de SQL dinámico para listados y reportes.
//!
//! Reglas:
//! - Todo valor que llega del llamador se enlaza como parámetro (`$n`).
//! - Los nombres de columna y la dirección de orden salen de enums cerrados
//!   (`Column`, `SortField`, `SortOrder`); nunca de texto del llamador.

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Text, Timestamptz};
use phd_domain::{PageRequest, SortField, SortOrder};

#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    BigInt(i64),
    Timestamptz(DateTime<Utc>),
}

/// Columnas filtrables de `form_submissions` (alias `fs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    UserId,
    FormType,
    Status,
    SubmittedAt,
}

impl Column {
    pub fn qualified(&self) -> &'static str {
        match self {
            Self::Id => "fs.id",
            Self::UserId => "fs.user_id",
            Self::FormType => "fs.form_type",
            Self::Status => "fs.status",
            Self::SubmittedAt => "fs.submitted_at",
        }
    }
}

/// Columna SQL de cada campo de orden permitido. `first_name` y `last_name`
/// requieren el join con `users u`.
pub fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::SubmittedAt => "fs.submitted_at",
        SortField::Status => "fs.status",
        SortField::FormType => "fs.form_type",
        SortField::FirstName => "u.first_name",
        SortField::LastName => "u.last_name",
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Cmp {
    Eq,
    Gte,
    Lte,
}

impl Cmp {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// Escapa comodines de `LIKE` y envuelve en `%...%`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone)]
pub struct SqlBuilder {
    sql: String,
    binds: Vec<BindValue>,
    has_where: bool,
}

impl SqlBuilder {
    pub fn new(base: &str) -> Self {
        Self { sql: base.to_string(), binds: Vec::new(), has_where: false }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Registra el valor y devuelve su placeholder.
    pub fn bind(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    fn open_condition(&mut self) {
        if self.has_where {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.has_where = true;
        }
    }

    pub fn filter(&mut self, column: Column, cmp: Cmp, value: BindValue) -> &mut Self {
        let placeholder = self.bind(value);
        self.open_condition();
        self.sql.push_str(&format!("{} {} {}", column.qualified(), cmp.as_sql(), placeholder));
        self
    }

    /// Búsqueda insensible a mayúsculas en nombre, apellido, email y el texto
    /// JSON de `form_data`. Requiere el join con `users u`.
    pub fn search(&mut self, term: &str) -> &mut Self {
        let p = self.bind(BindValue::Text(like_pattern(term)));
        self.open_condition();
        self.sql.push_str(&format!("(u.first_name ILIKE {p} OR u.last_name ILIKE {p} OR u.email ILIKE {p} OR fs.form_data::text ILIKE {p})"));
        self
    }

    /// Orden con desempate por id en la misma dirección (paginación estable).
    pub fn order_by(&mut self, column: &'static str, order: SortOrder) -> &mut Self {
        let dir = order.as_sql();
        self.sql.push_str(&format!(" ORDER BY {column} {dir}, fs.id {dir}"));
        self
    }

    pub fn paginate(&mut self, page: PageRequest) -> &mut Self {
        let limit = self.bind(BindValue::BigInt(page.limit as i64));
        let offset = self.bind(BindValue::BigInt(page.offset() as i64));
        self.sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        self
    }

    pub fn into_query(self) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
        let mut query: BoxedSqlQuery<'static, Pg, SqlQuery> = diesel::sql_query(self.sql).into_boxed();
        for value in self.binds {
            query = match value {
                BindValue::Text(v) => query.bind::<Text, _>(v),
                BindValue::BigInt(v) => query.bind::<BigInt, _>(v),
                BindValue::Timestamptz(v) => query.bind::<Timestamptz, _>(v),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_follow_bind_order() {
        let mut b = SqlBuilder::new("SELECT COUNT(*) AS total FROM form_submissions fs");
        b.filter(Column::UserId, Cmp::Eq, BindValue::BigInt(7))
         .filter(Column::Status, Cmp::Eq, BindValue::Text("pending".into()));
        assert_eq!(b.sql(),
                   "SELECT COUNT(*) AS total FROM form_submissions fs WHERE fs.user_id = $1 AND fs.status = $2");
        assert_eq!(b.binds(), &[BindValue::BigInt(7), BindValue::Text("pending".into())]);
    }

    #[test]
    fn search_reuses_one_parameter() {
        let mut b = SqlBuilder::new("SELECT 1 FROM form_submissions fs JOIN users u ON u.id = fs.user_id");
        b.filter(Column::FormType, Cmp::Eq, BindValue::Text("PHDEE03".into()))
         .search("50%_off");
        assert!(b.sql().ends_with("(u.first_name ILIKE $2 OR u.last_name ILIKE $2 OR u.email ILIKE $2 OR fs.form_data::text ILIKE $2)"));
        assert_eq!(b.binds()[1], BindValue::Text("%50\\%\\_off%".into()));
    }

    #[test]
    fn hostile_text_never_reaches_the_sql() {
        let hostile = "'; DROP TABLE users; --";
        let mut b = SqlBuilder::new("SELECT 1 FROM form_submissions fs JOIN users u ON u.id = fs.user_id");
        b.search(hostile)
         .order_by(sort_column(SortField::parse_or_default(hostile)), SortOrder::parse_or_default(hostile))
         .paginate(PageRequest::new(3, 20));
        assert!(!b.sql().contains("DROP"));
        assert!(b.sql().ends_with(" ORDER BY fs.submitted_at DESC, fs.id DESC LIMIT $2 OFFSET $3"));
        assert_eq!(&b.binds()[1..], &[BindValue::BigInt(20), BindValue::BigInt(40)]);
    }

    #[test]
    fn range_filters_on_submitted_at() {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let mut b = SqlBuilder::new("SELECT 1 FROM form_submissions fs");
        b.filter(Column::SubmittedAt, Cmp::Gte, BindValue::Timestamptz(start))
         .filter(Column::SubmittedAt, Cmp::Lte, BindValue::Timestamptz(start));
        assert!(b.sql().ends_with("WHERE fs.submitted_at >= $1 AND fs.submitted_at <= $2"));
    }

    #[test]
    fn like_pattern_escapes_backslash() {
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(like_pattern("ada"), "%ada%");
    }
}
