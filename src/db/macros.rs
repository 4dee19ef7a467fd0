//! Backend dispatch and parameter macros.
//!
//! These declarative macros keep the per-backend match arms linear and readable.
//! They expand at compile time with zero runtime overhead.

/// Macro for generating backend dispatch match arms.
///
/// Works on any enum with `MySql` and `SQLite` variants, such as
/// [`DbConnection`](crate::db::DbConnection) and
/// [`DbTransaction`](crate::db::DbTransaction).
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbConnection, self, {
///     MySql(c) => do_mysql(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::$enum::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

/// Build a [`Params`](crate::models::Params) set.
///
/// `params!{"name" => "tim", "age" => 18}` builds a named set for `%(name)s`
/// markers; `params!["tim", 18]` builds a positional set for `%s` markers.
#[macro_export]
macro_rules! params {
    () => {
        $crate::models::Params::Positional(::std::vec::Vec::new())
    };
    ($($name:literal => $value:expr),+ $(,)?) => {
        $crate::models::Params::named([$(($name, $crate::models::QueryParam::from($value))),+])
    };
    ($($value:expr),+ $(,)?) => {
        $crate::models::Params::Positional(::std::vec![$($crate::models::QueryParam::from($value)),+])
    };
}

pub use params;

#[cfg(test)]
mod tests {
    use crate::models::{Params, QueryParam};

    #[test]
    fn test_params_macro_named() {
        let params = params! {"name" => "tim", "age" => 18};
        assert_eq!(
            params,
            Params::named([("name", QueryParam::from("tim")), ("age", QueryParam::Int(18))])
        );
    }

    #[test]
    fn test_params_macro_positional() {
        let params = params!["tim", 18, None::<i32>];
        assert_eq!(
            params,
            Params::Positional(vec![
                QueryParam::from("tim"),
                QueryParam::Int(18),
                QueryParam::Null
            ])
        );
    }

    #[test]
    fn test_params_macro_empty() {
        assert!(params!().is_empty());
    }
}
