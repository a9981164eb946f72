//! Integration tests against live PostgreSQL and MySQL servers.
//!
//! Set TEST_POSTGRES_HOST / TEST_MYSQL_HOST to run them. The companion variables
//! `_PORT`, `_DB`, `_USER` and `_PASSWORD` default to the engine's usual values.
//! The fixture tables are created through a separate writable connection since
//! the gateway's own session is read-only.
//! Example: TEST_POSTGRES_HOST=localhost TEST_POSTGRES_DB=test TEST_POSTGRES_USER=postgres

use db_gateway::db::ConnectionManager;
use db_gateway::models::{DatabaseConfig, DatabaseType};
use db_gateway::protocol::GatewayService;
use serde_json::{Value as JsonValue, json};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read `TEST_<prefix>_*` variables; `None` when the host is not set.
fn server_config(
    prefix: &str,
    backend: DatabaseType,
    default_port: &str,
) -> Option<DatabaseConfig> {
    let host = match std::env::var(format!("TEST_{}_HOST", prefix)) {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_{}_HOST not set", prefix);
            return None;
        }
    };
    let port = env_or(&format!("TEST_{}_PORT", prefix), default_port)
        .parse()
        .unwrap();

    Some(DatabaseConfig::server(
        backend,
        host,
        port,
        env_or(&format!("TEST_{}_DB", prefix), "test"),
        env_or(&format!("TEST_{}_USER", prefix), "root"),
        env_or(&format!("TEST_{}_PASSWORD", prefix), ""),
    ))
}

async fn call(service: &mut GatewayService, method: &str, params: JsonValue) -> JsonValue {
    let line = json!({"method": method, "params": params}).to_string();
    service.handle_line(&line).await
}

async fn seed_postgres(config: &DatabaseConfig) {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password);
    let mut conn = PgConnection::connect_with(&options).await.unwrap();

    (&mut conn)
        .execute(
            "DROP TABLE IF EXISTS gw_products;
             CREATE TABLE gw_products (
                 id SERIAL PRIMARY KEY,
                 sku VARCHAR(32) NOT NULL,
                 price NUMERIC(10, 2),
                 active BOOLEAN DEFAULT true,
                 attrs JSONB,
                 created_at TIMESTAMP
             );
             INSERT INTO gw_products (sku, price, active, attrs, created_at) VALUES
                 ('A-1', 19.90, true, '{\"color\": \"red\"}', '2024-05-06 07:08:09'),
                 ('B-2', 5.00, false, NULL, NULL);",
        )
        .await
        .unwrap();
    conn.close().await.unwrap();
}

async fn seed_mysql(config: &DatabaseConfig) {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password)
        .charset("utf8mb4");
    let mut conn = MySqlConnection::connect_with(&options).await.unwrap();

    for statement in [
        "DROP TABLE IF EXISTS gw_products",
        "CREATE TABLE gw_products (
             id INT AUTO_INCREMENT PRIMARY KEY,
             sku VARCHAR(32) NOT NULL,
             price DECIMAL(10, 2),
             active TINYINT(1) DEFAULT 1,
             attrs JSON,
             created_at DATETIME
         )",
        "INSERT INTO gw_products (sku, price, active, attrs, created_at) VALUES
             ('A-1', 19.90, 1, '{\"color\": \"red\"}', '2024-05-06 07:08:09'),
             ('B-2', 5.00, 0, NULL, NULL)",
    ] {
        (&mut conn).execute(statement).await.unwrap();
    }
    conn.close().await.unwrap();
}

/// Checks shared by both engines once `gw_products` is seeded.
async fn exercise_gateway(config: DatabaseConfig) {
    let mut service = GatewayService::new(ConnectionManager::new(config));

    let response = call(&mut service, "db.list_tables", json!({})).await;
    assert_eq!(response["success"], true, "response: {}", response);
    let tables = response["tables"].as_array().unwrap();
    assert!(tables.iter().any(|t| t["name"] == "gw_products"));

    let response = call(&mut service, "db.describe_table", json!({"table": "gw_products"})).await;
    assert_eq!(response["success"], true, "response: {}", response);
    assert_eq!(response["column_count"], 6);
    let columns = response["columns"].as_array().unwrap();
    assert_eq!(columns[0]["name"], "id");
    assert_eq!(columns[1]["nullable"], false);
    assert_eq!(columns[1]["max_length"], 32);
    assert_eq!(columns[2]["numeric_precision"], 10);
    assert_eq!(columns[2]["numeric_scale"], 2);

    let response = call(
        &mut service,
        "db.query",
        json!({"query": "SELECT sku, price, attrs, created_at FROM gw_products ORDER BY id"}),
    )
    .await;
    assert_eq!(response["success"], true, "response: {}", response);
    assert_eq!(
        response["query"],
        "SELECT sku, price, attrs, created_at FROM gw_products ORDER BY id LIMIT 100"
    );
    assert_eq!(response["row_count"], 2);
    let rows = response["rows"].as_array().unwrap();
    assert_eq!(rows[0]["sku"], "A-1");
    assert_eq!(rows[0]["price"], "19.90");
    assert_eq!(rows[0]["attrs"], json!({"color": "red"}));
    assert_eq!(rows[0]["created_at"], "2024-05-06T07:08:09");
    assert_eq!(rows[1]["attrs"], JsonValue::Null);

    let response = call(
        &mut service,
        "db.query",
        json!({"query": "SELECT sku FROM gw_products ORDER BY id", "limit": 1}),
    )
    .await;
    assert_eq!(response["row_count"], 1);

    let response = call(
        &mut service,
        "db.get_record",
        json!({"table": "gw_products", "id": "B-2", "id_column": "sku"}),
    )
    .await;
    assert_eq!(response["success"], true, "response: {}", response);
    assert_eq!(response["record"]["price"], "5.00");

    let response = call(
        &mut service,
        "db.get_record",
        json!({"table": "gw_products", "id": 1}),
    )
    .await;
    assert_eq!(response["success"], true, "response: {}", response);
    assert_eq!(response["record"]["sku"], "A-1");

    let response = call(
        &mut service,
        "db.get_record",
        json!({"table": "gw_products", "id": 424242}),
    )
    .await;
    assert_eq!(
        response["error"],
        "Registro 424242 não encontrado em gw_products"
    );

    let response = call(&mut service, "db.get_schema", json!({})).await;
    assert_eq!(response["success"], true);
    assert_eq!(
        response["schema"]["tables"]["gw_products"]["column_count"],
        6
    );

    service.close().await;
}

#[tokio::test]
async fn test_postgres_gateway() {
    let Some(config) = server_config("POSTGRES", DatabaseType::PostgreSQL, "5432") else {
        return;
    };
    seed_postgres(&config).await;
    exercise_gateway(config).await;
}

#[tokio::test]
async fn test_mysql_gateway() {
    let Some(config) = server_config("MYSQL", DatabaseType::MySQL, "3306") else {
        return;
    };
    seed_mysql(&config).await;
    exercise_gateway(config).await;
}

#[tokio::test]
async fn test_postgres_session_is_read_only() {
    let Some(config) = server_config("POSTGRES", DatabaseType::PostgreSQL, "5432") else {
        return;
    };
    seed_postgres(&config).await;

    let mut manager = ConnectionManager::new(config);
    let conn = manager.get_connection().await.unwrap();
    let db_gateway::db::DbConnection::Postgres(pg) = conn else {
        panic!("expected a PostgreSQL connection");
    };

    let result = pg.execute("DELETE FROM gw_products").await;
    assert!(result.is_err(), "writes must fail on a gateway session");
    manager.close().await;
}
