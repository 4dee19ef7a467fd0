//! Parameter handling for statements.
//!
//! Statements use client-side `%s` / `%(name)s` markers. Before a statement is
//! sent, [`bind_statement`] rewrites those markers into the driver's `?`
//! placeholders and lines the values up in order. The `bind_*_param` helpers then
//! attach each value to a backend-specific sqlx query.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, Params, QueryParam};
use sqlx::mysql::MySqlArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Sqlite};
use std::borrow::Cow;

/// A statement ready for the driver: `?` placeholders and their values in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement<'a> {
    pub sql: Cow<'a, str>,
    pub params: Vec<QueryParam>,
}

/// Rewrite client-side markers and order the parameter values.
///
/// - No parameter set: the SQL is passed through untouched, `%` included.
/// - `%s` takes the next positional value, `%(name)s` the named value, `%%` is a literal `%`.
/// - A positional set with no `%s` markers binds to native `?` placeholders in order.
/// - Markers inside quoted literals or identifiers are left alone. Backslash escapes
///   inside literals are honored for MySQL only.
pub fn bind_statement<'a>(
    sql: &'a str,
    params: Option<&Params>,
    db_type: DatabaseType,
) -> DbResult<BoundStatement<'a>> {
    let Some(params) = params else {
        return Ok(BoundStatement {
            sql: Cow::Borrowed(sql),
            params: Vec::new(),
        });
    };

    let mut out = String::with_capacity(sql.len());
    let mut bound = Vec::new();
    let mut positional_markers = 0usize;
    let mut quote: Option<char> = None;
    let backslash_escapes = db_type == DatabaseType::MySQL;
    let mut chars = sql.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if backslash_escapes && c == '\\' && q != '`' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '%' => match chars.peek().map(|&(_, next)| next) {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some('s') => {
                    chars.next();
                    let Params::Positional(values) = params else {
                        return Err(DbError::invalid_input(format!(
                            "Positional marker %s at offset {} used with named parameters",
                            pos
                        )));
                    };
                    let value = values.get(positional_markers).ok_or_else(|| {
                        DbError::invalid_input(format!(
                            "Not enough parameters: statement has more than {} %s markers",
                            values.len()
                        ))
                    })?;
                    positional_markers += 1;
                    bound.push(value.clone());
                    out.push('?');
                }
                Some('(') => {
                    let (name, end) = named_marker(sql, pos)?;
                    let Params::Named(values) = params else {
                        return Err(DbError::invalid_input(format!(
                            "Named marker %({})s used with positional parameters",
                            name
                        )));
                    };
                    let value = values.get(name).ok_or_else(|| {
                        DbError::invalid_input(format!("Missing value for parameter '{}'", name))
                    })?;
                    bound.push(value.clone());
                    out.push('?');
                    while chars.next_if(|&(i, _)| i < end).is_some() {}
                }
                _ => {
                    return Err(DbError::invalid_input(format!(
                        "Unsupported format marker at offset {} (use %s, %(name)s or %%)",
                        pos
                    )));
                }
            },
            _ => out.push(c),
        }
    }

    if quote.is_some() {
        return Err(DbError::invalid_input("Unterminated quoted literal in statement"));
    }

    if let Params::Positional(values) = params {
        if positional_markers == 0 {
            // Native `?` placeholders
            bound = values.clone();
        } else if positional_markers != values.len() {
            return Err(DbError::invalid_input(format!(
                "Too many parameters: {} given for {} %s markers",
                values.len(),
                positional_markers
            )));
        }
    }

    Ok(BoundStatement {
        sql: Cow::Owned(out),
        params: bound,
    })
}

/// Parse `%(name)s` starting at the `%` at `start`. Returns the name and the end offset.
fn named_marker(sql: &str, start: usize) -> DbResult<(&str, usize)> {
    let rest = &sql[start + 2..];
    let close = rest.find(')').ok_or_else(|| {
        DbError::invalid_input(format!("Unterminated %( marker at offset {}", start))
    })?;
    let name = &rest[..close];
    if !rest[close + 1..].starts_with('s') {
        return Err(DbError::invalid_input(format!(
            "Named marker %({}) must end with 's'",
            name
        )));
    }
    if name.is_empty() {
        return Err(DbError::invalid_input(format!(
            "Empty parameter name at offset {}",
            start
        )));
    }
    Ok((name, start + 2 + close + 2))
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
    }
}
