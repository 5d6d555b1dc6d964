use crate::config::DatabaseConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::UserRecord;
use crate::store::{Table, UserStore};
use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use postgres_types::{FromSql, Json, Type};
use serde_json::{Map, Value};
use tokio_postgres::{Client, Row};
use tracing::{error, info, warn};

/// PostgreSQL accessor.
///
/// Holds only the connection settings: every operation opens its own
/// connection, runs one statement and drops the client, which closes the
/// connection whether the statement succeeded or not.
#[derive(Clone)]
pub struct Database {
    config: tokio_postgres::Config,
    tls: MakeTlsConnector,
}

impl Database {
    /// Prepares the connection settings and the TLS connector. Does not connect.
    pub fn new(config: &DatabaseConfig) -> ApiResult<Self> {
        info!("Using PostgreSQL at {}:{}/{}", config.host, config.port, config.database);

        let pg_config = config.to_pg_config()?;

        let tls_connector = TlsConnector::builder()
            .build()
            .map_err(|e| {
                error!("Failed to create TLS connector: {}", e);
                ApiError::Database(format!("TLS connector creation failed: {}", e))
            })?;

        Ok(Database {
            config: pg_config,
            tls: MakeTlsConnector::new(tls_connector),
        })
    }

    /// Opens a fresh connection and drives it on a background task until the client is dropped.
    async fn connect(&self) -> ApiResult<Client> {
        let (client, connection) = self
            .config
            .connect(self.tls.clone())
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                ApiError::from(e)
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Database connection closed with error: {}", e);
            }
        });

        Ok(client)
    }

    /// Creates the users table if it does not exist yet.
    pub async fn migrate(&self) -> ApiResult<()> {
        info!("Running database migrations");

        let client = self.connect().await?;

        let users_table = r#"
            CREATE TABLE IF NOT EXISTS users (
                telegram_id BIGINT PRIMARY KEY,
                data JSONB NOT NULL
            )
        "#;

        client.execute(users_table, &[])
            .await
            .map_err(|e| {
                error!("Failed to create users table: {}", e);
                ApiError::from(e)
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl UserStore for Database {
    async fn upsert_user(&self, record: &UserRecord) -> ApiResult<()> {
        let client = self.connect().await?;

        let query = r#"
            INSERT INTO users (telegram_id, data)
            VALUES ($1, $2)
            ON CONFLICT (telegram_id)
            DO UPDATE SET data = EXCLUDED.data
        "#;

        client.execute(query, &[&record.telegram_id, &Json(&record.data)])
            .await
            .map_err(|e| {
                error!("Failed to upsert user {}: {}", record.telegram_id, e);
                ApiError::from(e)
            })?;

        info!("Stored data of user {}", record.telegram_id);
        Ok(())
    }

    async fn get_all_rows(&self, table: Table) -> ApiResult<Option<Vec<Value>>> {
        let Ok(client) = self.connect().await else {
            return Ok(None);
        };

        // Table names come from a closed enum, never from the request
        let query = format!("SELECT * FROM {}", table.name());

        let rows = match client.query(query.as_str(), &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read table {}: {}", table.name(), ApiError::from(e));
                return Ok(None);
            }
        };

        let rows = rows.iter().map(row_to_json).collect::<ApiResult<Vec<_>>>()?;
        info!("Read {} rows from {}", rows.len(), table.name());
        Ok(Some(rows))
    }

    async fn get_user_by_telegram_id(&self, telegram_id: i64) -> ApiResult<Option<Value>> {
        let Ok(client) = self.connect().await else {
            return Ok(None);
        };

        let query = "SELECT * FROM users WHERE telegram_id = $1";

        let rows = match client.query(query, &[&telegram_id]).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read user {}: {}", telegram_id, ApiError::from(e));
                return Ok(None);
            }
        };

        match rows.first() {
            Some(row) => row_to_json(row).map(Some),
            None => {
                info!("User with telegram_id {} not found", telegram_id);
                Ok(None)
            }
        }
    }
}

/// Converts a row into a JSON object keyed by column name.
fn row_to_json(row: &Row) -> ApiResult<Value> {
    let mut object = Map::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_to_json(row, idx, column.type_())
            .map_err(|e| e.context(format!("column '{}'", column.name())))?;
        object.insert(column.name().to_string(), value);
    }

    Ok(Value::Object(object))
}

fn column_to_json(row: &Row, idx: usize, ty: &Type) -> anyhow::Result<Value> {
    let value = if *ty == Type::BOOL {
        get::<bool>(row, idx)?.map(Value::from)
    } else if *ty == Type::INT2 {
        get::<i16>(row, idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx)?.map(Value::from)
    } else if [Type::TEXT, Type::VARCHAR, Type::NAME, Type::BPCHAR].contains(ty) {
        get::<String>(row, idx)?.map(Value::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<Value>(row, idx)?
    } else {
        anyhow::bail!("unsupported column type {}", ty);
    };

    Ok(value.unwrap_or(Value::Null))
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> anyhow::Result<Option<T>> {
    Ok(row.try_get::<_, Option<T>>(idx)?)
}
