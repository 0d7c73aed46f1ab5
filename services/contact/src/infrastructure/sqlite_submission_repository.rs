//! SQLiteお問い合わせストア
//!
//! お問い合わせ送信の保存・取得・ステータス更新を提供する。
//! - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
//! - 読み取り: deadpool-sqliteによるasync接続プール

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use super::submission_repository::{StoreError, SubmissionRepository};
use crate::domain::{ContactSubmission, ContactSubmissionInput, current_timestamp};

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::BuildError> for StoreError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        StoreError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for StoreError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// SQLiteデータベースのスキーマを定義するSQL
const SCHEMA_SQL: &str = r#"
-- WALモード設定
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

-- お問い合わせテーブル
-- AUTOINCREMENTで削除済みIDも再利用しない
CREATE TABLE IF NOT EXISTS contact_submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    service TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at INTEGER NOT NULL,        -- UNIXミリ秒
    status TEXT NOT NULL DEFAULT 'pending'
);
"#;

/// SQLiteのインメモリDBを指すパスか
///
/// インメモリDBは接続ごとに別物になるため、書き込み接続と読み取りプールで共有できない。
pub(crate) fn is_memory_path(path: &str) -> bool {
    path == ":memory:"
        || path.starts_with("file::memory:")
        || path
            .split_once('?')
            .is_some_and(|(_, query)| query.split('&').any(|kv| kv == "mode=memory"))
}

const SELECT_COLUMNS: &str =
    "SELECT id, first_name, last_name, email, service, message, created_at, status FROM contact_submissions";

/// SQLiteお問い合わせストア
///
/// - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）で採番を直列化
/// - 読み取り: deadpool-sqliteによるasync接続プール
pub struct SqliteSubmissionRepository {
    /// 書き込み専用接続
    write_conn: Arc<Mutex<Connection>>,
    /// 読み取り用async接続プール
    read_pool: Pool,
}

impl SqliteSubmissionRepository {
    /// 新しいSqliteSubmissionRepositoryを作成
    ///
    /// データベースファイルを開き、スキーマを初期化する。
    /// WALモードを有効にし、書き込み用単一接続と読み取り用プールを構成する。
    ///
    /// # Arguments
    /// * `db_path` - データベースファイルのパス
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        if is_memory_path(db_path) {
            return Err(StoreError::Build(format!(
                "インメモリDBは使用できません: {}",
                db_path
            )));
        }

        let path = db_path.to_string();
        let write_conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))??;

        // 読み取り用プールを作成（最大4接続）
        let read_pool = Config::new(db_path)
            .builder(Runtime::Tokio1)
            .map_err(|e| StoreError::Build(e.to_string()))?
            .max_size(4)
            .build()?;

        info!(db_path = %db_path, "SQLiteストアを初期化しました");

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    /// 行をContactSubmissionに変換（内部用）
    fn row_to_submission(row: &Row<'_>) -> rusqlite::Result<ContactSubmission> {
        let created_at_ms: i64 = row.get(6)?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(created_at_ms)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(6, created_at_ms))?;

        Ok(ContactSubmission {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            service: row.get(4)?,
            message: row.get(5)?,
            created_at,
            status: row.get(7)?,
        })
    }

    /// IDで1件検索（内部用）
    fn query_by_id(conn: &Connection, id: i64) -> Result<Option<ContactSubmission>, StoreError> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let submission = conn
            .query_row(&sql, [id], Self::row_to_submission)
            .optional()?;
        Ok(submission)
    }

    /// 全件を作成順に検索（内部用）
    fn query_all(conn: &Connection) -> Result<Vec<ContactSubmission>, StoreError> {
        let sql = format!("{} ORDER BY id ASC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let submissions = stmt
            .query_map([], Self::row_to_submission)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(submissions)
    }

    /// 書き込み接続上でクロージャを実行（内部用）
    async fn with_write_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Lock(format!("書き込み接続: {}", e)))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }
}

#[async_trait]
impl SubmissionRepository for SqliteSubmissionRepository {
    async fn create(&self, input: ContactSubmissionInput) -> Result<ContactSubmission, StoreError> {
        let submission = self
            .with_write_conn(move |conn| {
                let created_at = current_timestamp();
                conn.execute(
                    "INSERT INTO contact_submissions (first_name, last_name, email, service, message, created_at, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        &input.first_name,
                        &input.last_name,
                        &input.email,
                        &input.service,
                        &input.message,
                        created_at.timestamp_millis(),
                        crate::domain::DEFAULT_STATUS,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                Ok(ContactSubmission::new(id, input, created_at))
            })
            .await?;

        debug!(id = submission.id, "お問い合わせを保存しました");
        Ok(submission)
    }

    async fn get_all(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        let conn = self.read_pool.get().await?;
        conn.interact(|conn| Self::query_all(conn)).await?
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>, StoreError> {
        let conn = self.read_pool.get().await?;
        conn.interact(move |conn| Self::query_by_id(conn, id)).await?
    }

    async fn update_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Option<ContactSubmission>, StoreError> {
        let status = status.to_string();

        self.with_write_conn(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE contact_submissions SET status = ?1 WHERE id = ?2",
                params![&status, id],
            )?;
            if rows_affected == 0 {
                return Ok(None);
            }
            Self::query_by_id(conn, id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::submission_repository::contract;
    use std::fs;
    use tempfile::tempdir;

    /// テスト用の一時データベースパスを生成
    fn temp_db_path() -> (tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contact.db");
        (dir, path.to_string_lossy().to_string())
    }

    // ========================================
    // スキーマ作成のテスト
    // ========================================

    /// インメモリDBのパスは拒否されることを確認
    #[tokio::test]
    async fn test_store_rejects_memory_path() {
        for path in [":memory:", "file::memory:?cache=shared", "file:contact?mode=memory"] {
            let result = SqliteSubmissionRepository::new(path).await;
            assert!(
                matches!(result, Err(StoreError::Build(_))),
                "{path} が受け付けられた"
            );
        }
    }

    #[test]
    fn test_is_memory_path() {
        assert!(is_memory_path(":memory:"));
        assert!(!is_memory_path("./memory.db"));
        assert!(!is_memory_path("contact.db?mode=rw"));
    }

    /// ストアが正常に作成できることを確認
    #[tokio::test]
    async fn test_store_creation_succeeds() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await;
        assert!(store.is_ok(), "ストアの作成に失敗: {:?}", store.err());
        assert!(
            fs::metadata(&db_path).is_ok(),
            "データベースファイルが作成されていない"
        );
    }

    /// contact_submissionsテーブルが存在することを確認
    #[tokio::test]
    async fn test_table_exists() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();

        let conn = store.write_conn.lock().unwrap();
        let name: String = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='contact_submissions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "contact_submissions");
    }

    /// WALモードが有効になっていることを確認
    #[tokio::test]
    async fn test_wal_mode_enabled() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();

        let conn = store.write_conn.lock().unwrap();
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(
            journal_mode.to_lowercase(),
            "wal",
            "WALモードが有効になっていない: {}",
            journal_mode
        );
    }

    /// 存在しないディレクトリを指定するとエラーになることを確認
    #[tokio::test]
    async fn test_invalid_path_fails() {
        let (dir, _) = temp_db_path();
        let bad_path = dir.path().join("missing").join("contact.db");
        let result = SqliteSubmissionRepository::new(&bad_path.to_string_lossy()).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    // ========================================
    // リポジトリ契約のテスト
    // ========================================

    #[tokio::test]
    async fn test_create_then_get() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::create_then_get_returns_same_record(&store).await;
    }

    #[tokio::test]
    async fn test_get_all_order() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::get_all_preserves_creation_order(&store).await;
    }

    #[tokio::test]
    async fn test_absent_id() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::absent_id_yields_none(&store).await;
    }

    #[tokio::test]
    async fn test_update_status_idempotent() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::update_status_is_idempotent(&store).await;
    }

    #[tokio::test]
    async fn test_update_status_any_value() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::update_status_accepts_any_value(&store).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        contract::concurrent_creates_yield_distinct_ids(Arc::new(store)).await;
    }

    // ========================================
    // 永続化のテスト
    // ========================================

    /// 再オープン後もデータが残り、IDが継続することを確認
    #[tokio::test]
    async fn test_reopen_retains_data_and_continues_ids() {
        let (_dir, db_path) = temp_db_path();

        let first = {
            let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
            let created = store.create(contract::sample_input("John")).await.unwrap();
            store.update_status(created.id, "contacted").await.unwrap();
            created
        };

        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();
        let fetched = store.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, "contacted");
        assert_eq!(fetched.created_at, first.created_at);

        let second = store.create(contract::sample_input("Jane")).await.unwrap();
        assert!(second.id > first.id, "再オープン後もIDは増加し続けるべき");
    }

    /// 行が消えてもIDが再利用されないことを確認
    #[tokio::test]
    async fn test_ids_not_reused_after_row_removal() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();

        let created = store.create(contract::sample_input("John")).await.unwrap();
        {
            let conn = store.write_conn.lock().unwrap();
            conn.execute("DELETE FROM contact_submissions WHERE id = ?1", [created.id])
                .unwrap();
        }

        let next = store.create(contract::sample_input("Jane")).await.unwrap();
        assert!(next.id > created.id, "削除済みIDは再利用されないべき");
    }

    /// 作成日時がミリ秒精度で保存されることを確認
    #[tokio::test]
    async fn test_created_at_stored_as_millis() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();

        let created = store.create(contract::sample_input("John")).await.unwrap();

        let conn = store.write_conn.lock().unwrap();
        let stored: i64 = conn
            .query_row(
                "SELECT created_at FROM contact_submissions WHERE id = ?1",
                [created.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, created.created_at.timestamp_millis());
    }

    /// 読み取りプールが書き込み完了後の値を観測することを確認
    #[tokio::test]
    async fn test_read_pool_observes_completed_writes() {
        let (_dir, db_path) = temp_db_path();
        let store = SqliteSubmissionRepository::new(&db_path).await.unwrap();

        for name in ["Alice", "Bob"] {
            let created = store.create(contract::sample_input(name)).await.unwrap();
            let fetched = store.get_by_id(created.id).await.unwrap();
            assert_eq!(fetched, Some(created));
        }
        assert_eq!(store.get_all().await.unwrap().len(), 2);
    }
}
