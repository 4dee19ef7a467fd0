//! mysql-session - Demo entry point.
//!
//! Connects with the configured options and walks a `user` table through
//! create, insert, select, update, delete, printing every fetched record as JSON.

use mysql_session::config::Config;
use mysql_session::{DatabaseType, DbResult, Session, params};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

fn create_table_sql(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::MySQL => {
            "DROP TABLE IF EXISTS `user`;
            CREATE TABLE `user` (
              `id` int(11) NOT NULL AUTO_INCREMENT,
              `name` varchar(255) DEFAULT NULL,
              `age` int(11) DEFAULT NULL,
              PRIMARY KEY (`id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        }
        DatabaseType::SQLite => {
            "DROP TABLE IF EXISTS user;
            CREATE TABLE user (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              name VARCHAR(255) DEFAULT NULL,
              age INTEGER DEFAULT NULL
            )"
        }
    }
}

fn print_users(session: &mut Session, step: &str) -> DbResult<()> {
    session.execute(|cur| cur.run("SELECT * FROM user", None))?;
    let records = session.fetchall()?;
    println!("-- {} ({} rows)", step, records.len());
    for record in records {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn run(session: &mut Session) -> DbResult<()> {
    // The two-statement setup needs multi-statement support
    if session.info().multi_statements {
        let sql = create_table_sql(session.db_type());
        session.execute(|cur| cur.run(sql, None))?;
    } else {
        let sql = create_table_sql(session.db_type());
        let (drop, create) = sql.split_once(';').unwrap_or((sql, ""));
        session.execute(|cur| {
            cur.run(drop, None)?;
            cur.run(create, None)
        })?;
    }

    session.execute(|cur| {
        cur.run(
            "INSERT INTO user (name, age) VALUES (%(name)s, %(age)s)",
            Some(&params! {"name" => "tim", "age" => 18}),
        )
    })?;
    info!(id = ?session.lastrowid(), "Inserted user");
    print_users(session, "after insert")?;

    session.execute(|cur| {
        cur.run(
            "UPDATE user SET age = %(age)s WHERE name = %(name)s",
            Some(&params! {"name" => "tim", "age" => 20}),
        )
    })?;
    print_users(session, "after update")?;

    session.execute(|cur| {
        cur.run(
            "DELETE FROM user WHERE name = %(name)s",
            Some(&params! {"name" => "tim"}),
        )
    })?;
    print_users(session, "after delete")?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!(
        target_db = %config.connection.display_target(),
        "Starting mysql-session demo v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut session = Session::connect(&config.connection)?;

    if let Err(e) = run(&mut session) {
        error!(error = %e, "Demo failed");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        return Err(e.into());
    }

    session.close();
    Ok(())
}
