// SQLite usage store. Dimension rows (apps, interfaces) are looked up by natural key and inserted
// when absent; fact rows are append-only, one per (process, interface) per aggregation tick.

mod schema;

use crate::models::{AppMinute, Application, Interface, MinuteBucket, Totals, UsageRow};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct UsageRepo {
    pool: SqlitePool,
}

impl UsageRepo {
    /// Connect to SQLite at `path`, creating the parent dir and DB if missing. WAL + foreign keys.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_tables(&self.pool).await
    }

    #[instrument(skip(self), fields(repo = "usage", operation = "upsert_interface"))]
    pub async fn upsert_interface(&self, name: &str, is_default: bool) -> anyhow::Result<i64> {
        let mut conn = self.pool.acquire().await?;
        upsert_interface_on(&mut conn, name, is_default, Utc::now().timestamp()).await
    }

    #[instrument(skip(self), fields(repo = "usage", operation = "upsert_app"))]
    pub async fn upsert_app(
        &self,
        process_name: &str,
        exe_path: Option<&str>,
    ) -> anyhow::Result<i64> {
        let mut conn = self.pool.acquire().await?;
        upsert_app_on(&mut conn, process_name, exe_path, Utc::now().timestamp()).await
    }

    /// Appends one usage_app_minute row per entry, stamped `bucket`. Dimension rows are upserted
    /// first inside the same transaction. Returns rows inserted.
    #[instrument(
        skip(self, minutes),
        fields(repo = "usage", operation = "record_app_minutes", rows = minutes.len())
    )]
    pub async fn record_app_minutes(
        &self,
        bucket: MinuteBucket,
        minutes: &[AppMinute],
        default_interface: Option<&str>,
    ) -> anyhow::Result<usize> {
        if minutes.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for m in minutes {
            let app_id = upsert_app_on(&mut tx, &m.process, None, now).await?;
            let is_default = default_interface == Some(m.interface.as_str());
            let interface_id = upsert_interface_on(&mut tx, &m.interface, is_default, now).await?;
            sqlx::query(
                "INSERT INTO usage_app_minute (app_id, interface_id, ts_minute, rx_bytes, tx_bytes) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(app_id)
            .bind(interface_id)
            .bind(bucket.timestamp())
            .bind(to_column(m.rx_bytes))
            .bind(to_column(m.tx_bytes))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(minutes.len())
    }

    /// Rows with `ts_minute >= start`, joined with their raw process name, in insertion order.
    #[instrument(skip(self), fields(repo = "usage", operation = "app_usage_since"))]
    pub async fn app_usage_since(&self, start: DateTime<Utc>) -> anyhow::Result<Vec<UsageRow>> {
        let rows = sqlx::query(
            "SELECT a.process_name, u.rx_bytes, u.tx_bytes
             FROM usage_app_minute u JOIN apps a ON u.app_id = a.id
             WHERE u.ts_minute >= $1 ORDER BY u.id ASC",
        )
        .bind(start.timestamp())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let process_name: String = row.try_get("process_name")?;
            let rx_bytes: i64 = row.try_get("rx_bytes")?;
            let tx_bytes: i64 = row.try_get("tx_bytes")?;
            out.push(UsageRow {
                process_name,
                rx_bytes: rx_bytes.max(0) as u64,
                tx_bytes: tx_bytes.max(0) as u64,
            });
        }
        Ok(out)
    }

    /// Grand total over rows with `ts_minute >= start`, saturating at `u64::MAX`.
    /// SQL `SUM` is avoided since it errors on i64 overflow.
    #[instrument(skip(self), fields(repo = "usage", operation = "totals_since"))]
    pub async fn totals_since(&self, start: DateTime<Utc>) -> anyhow::Result<Totals> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT rx_bytes, tx_bytes FROM usage_app_minute WHERE ts_minute >= $1",
        )
        .bind(start.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .fold(Totals::default(), |acc, (rx, tx)| Totals {
                rx_bytes: acc.rx_bytes.saturating_add(rx.max(0) as u64),
                tx_bytes: acc.tx_bytes.saturating_add(tx.max(0) as u64),
            }))
    }

    pub async fn count_app_minutes(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM usage_app_minute")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Minute timestamps of all usage_app_minute rows, oldest row first.
    pub async fn app_minute_timestamps(&self) -> anyhow::Result<Vec<i64>> {
        let ts = sqlx::query_scalar::<_, i64>("SELECT ts_minute FROM usage_app_minute ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ts)
    }

    pub async fn list_apps(&self) -> anyhow::Result<Vec<Application>> {
        let rows = sqlx::query("SELECT id, process_name, exe_path, first_seen FROM apps ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Application {
                id: row.try_get("id")?,
                process_name: row.try_get("process_name")?,
                exe_path: row.try_get("exe_path")?,
                first_seen: row.try_get("first_seen")?,
            });
        }
        Ok(out)
    }

    pub async fn list_interfaces(&self) -> anyhow::Result<Vec<Interface>> {
        let rows =
            sqlx::query("SELECT id, name, is_default, created_at FROM interfaces ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let is_default: i64 = row.try_get("is_default")?;
            out.push(Interface {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                is_default: is_default != 0,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(out)
    }
}

/// Byte counts are INTEGER (i64) columns; anything larger is stored as i64::MAX.
fn to_column(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

/// Existing rows are never updated, including their is_default flag.
async fn upsert_interface_on(
    conn: &mut SqliteConnection,
    name: &str,
    is_default: bool,
    now: i64,
) -> anyhow::Result<i64> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM interfaces WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let r = sqlx::query("INSERT INTO interfaces (name, is_default, created_at) VALUES ($1, $2, $3)")
        .bind(name)
        .bind(is_default as i64)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(r.last_insert_rowid())
}

/// Natural key is (process_name, exe_path); a NULL path only matches NULL.
async fn upsert_app_on(
    conn: &mut SqliteConnection,
    process_name: &str,
    exe_path: Option<&str>,
    now: i64,
) -> anyhow::Result<i64> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM apps WHERE process_name = $1 AND exe_path IS $2",
    )
    .bind(process_name)
    .bind(exe_path)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let r = sqlx::query("INSERT INTO apps (process_name, exe_path, first_seen) VALUES ($1, $2, $3)")
        .bind(process_name)
        .bind(exe_path)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(r.last_insert_rowid())
}
