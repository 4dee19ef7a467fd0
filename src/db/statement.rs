//! Statement counting for the multi-statement switch.
//!
//! Uses the [sqlparser](https://docs.rs/sqlparser/) tokenizer with the backend's
//! dialect, so semicolons inside string literals, quoted identifiers and comments
//! are not mistaken for statement separators.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Count the non-empty statements in `sql`.
///
/// Empty statements (`;;`, trailing `;`, comment-only segments) are not counted.
pub fn count_statements(sql: &str, db_type: DatabaseType) -> DbResult<usize> {
    let dialect = get_dialect(db_type);
    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .tokenize()
        .map_err(|e| DbError::invalid_input(format!("Failed to tokenize SQL: {}", e)))?;

    let mut count = 0;
    let mut in_statement = false;
    for token in tokens {
        match token {
            Token::SemiColon => {
                if in_statement {
                    count += 1;
                }
                in_statement = false;
            }
            Token::Whitespace(_) | Token::EOF => {}
            _ => in_statement = true,
        }
    }
    if in_statement {
        count += 1;
    }
    Ok(count)
}

/// Reject SQL containing more than one statement.
///
/// SQL the tokenizer cannot read is let through; the server reports the real error.
pub fn ensure_single_statement(sql: &str, db_type: DatabaseType) -> DbResult<()> {
    match count_statements(sql, db_type) {
        Ok(count) if count > 1 => Err(DbError::invalid_input(format!(
            "Multi-statement execution is disabled for this session, but the SQL contains {} statements",
            count
        ))),
        Ok(_) => Ok(()),
        Err(e) => {
            debug!(error = %e, "Skipping statement count check");
            Ok(())
        }
    }
}

/// Check whether `sql` starts with a statement that returns a result set.
pub fn is_query(sql: &str, db_type: DatabaseType) -> bool {
    let dialect = get_dialect(db_type);
    let Ok(tokens) = Tokenizer::new(dialect.as_ref(), sql).tokenize() else {
        return false;
    };
    match tokens
        .into_iter()
        .find(|token| !matches!(token, Token::Whitespace(_)))
    {
        Some(Token::LParen) => true,
        Some(Token::Word(word)) => matches!(
            word.value.to_ascii_uppercase().as_str(),
            "SELECT" | "WITH" | "VALUES" | "TABLE" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN"
                | "PRAGMA"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement() {
        assert_eq!(
            count_statements("SELECT id, name FROM user", DatabaseType::MySQL).unwrap(),
            1
        );
        assert_eq!(
            count_statements("SELECT 1;", DatabaseType::MySQL).unwrap(),
            1
        );
    }

    #[test]
    fn test_multiple_statements() {
        let sql = "
            DROP TABLE IF EXISTS `user`;
            CREATE TABLE `user` (
              `id` int(11) NOT NULL AUTO_INCREMENT,
              `name` varchar(255) DEFAULT NULL,
              PRIMARY KEY (`id`)
            );
        ";
        assert_eq!(count_statements(sql, DatabaseType::MySQL).unwrap(), 2);
    }

    #[test]
    fn test_semicolons_in_literals_and_comments() {
        let sql = "SELECT 'a;b', `c;d` FROM t -- trailing; comment\n";
        assert_eq!(count_statements(sql, DatabaseType::MySQL).unwrap(), 1);

        let sql = "SELECT 1; /* ; */ ;";
        assert_eq!(count_statements(sql, DatabaseType::SQLite).unwrap(), 1);
    }

    #[test]
    fn test_empty_sql() {
        assert_eq!(count_statements("", DatabaseType::MySQL).unwrap(), 0);
        assert_eq!(count_statements(" ; ; ", DatabaseType::MySQL).unwrap(), 0);
    }

    #[test]
    fn test_is_query() {
        assert!(is_query("SELECT id FROM user", DatabaseType::MySQL));
        assert!(is_query("  /* note */ select 1", DatabaseType::SQLite));
        assert!(is_query("WITH t AS (SELECT 1) SELECT * FROM t", DatabaseType::SQLite));
        assert!(is_query("SHOW TABLES", DatabaseType::MySQL));
        assert!(!is_query("INSERT INTO user (name) VALUES ('a')", DatabaseType::MySQL));
        assert!(!is_query("CREATE TABLE t (v INTEGER)", DatabaseType::SQLite));
        assert!(!is_query("", DatabaseType::SQLite));
    }

    #[test]
    fn test_ensure_single_statement() {
        assert!(ensure_single_statement("SELECT ?", DatabaseType::SQLite).is_ok());
        let err = ensure_single_statement("SELECT 1; SELECT 2", DatabaseType::SQLite).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(err.to_string().contains("2 statements"));
    }
}
