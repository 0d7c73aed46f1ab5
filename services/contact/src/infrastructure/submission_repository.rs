/// お問い合わせ送信を保存するためのリポジトリ
///
/// 揮発性のインメモリ実装と、永続化するSQLite実装（`sqlite_submission_repository`）が
/// 同一の契約を満たす。
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ContactSubmission, ContactSubmissionInput, current_timestamp};

/// ストア操作のエラー型
#[derive(Debug, Error)]
pub enum StoreError {
    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// プール取得エラー
    #[error("プールエラー: {0}")]
    Pool(String),

    /// 接続構築エラー
    #[error("接続構築エラー: {0}")]
    Build(String),

    /// ロック取得エラー（Mutex/RwLock poisoned）
    #[error("ロック取得エラー: {0}")]
    Lock(String),
}

/// お問い合わせ送信の保存用トレイト
///
/// 1つのインスタンスを複数リクエストから同時に使えること。
/// 未検出はエラーではなく`Ok(None)`で表す。
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// 新しい送信を作成
    ///
    /// 次のIDを採番し、`createdAt`を現在時刻、`status`を"pending"にして保存する。
    ///
    /// # 戻り値
    /// * 成功時は保存済みのレコード
    /// * 永続化に失敗した場合は`Err(StoreError)`
    async fn create(&self, input: ContactSubmissionInput) -> Result<ContactSubmission, StoreError>;

    /// 全件を作成順に取得
    async fn get_all(&self) -> Result<Vec<ContactSubmission>, StoreError>;

    /// IDで1件取得
    ///
    /// # 戻り値
    /// * 見つかった場合は`Ok(Some(ContactSubmission))`
    /// * 見つからなかった場合は`Ok(None)`
    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>, StoreError>;

    /// ステータスを上書き
    ///
    /// ステータス値の妥当性は確認しない。
    ///
    /// # 戻り値
    /// * 更新後のレコード（存在しない場合は`Ok(None)`）
    async fn update_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Option<ContactSubmission>, StoreError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    /// 最後に採番したID（0は未採番）
    last_id: i64,
    /// 作成順のレコード
    submissions: Vec<ContactSubmission>,
}

/// プロセス内のみで保持するSubmissionRepository実装
///
/// 採番と挿入は同一のロック内で行う。プロセス終了で内容は失われる。
#[derive(Debug, Default)]
pub struct InMemorySubmissionRepository {
    state: RwLock<InMemoryState>,
}

impl InMemorySubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error<T>(err: std::sync::PoisonError<T>) -> StoreError {
        StoreError::Lock(err.to_string())
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn create(&self, input: ContactSubmissionInput) -> Result<ContactSubmission, StoreError> {
        let mut state = self.state.write().map_err(Self::lock_error)?;

        let id = state.last_id + 1;
        let submission = ContactSubmission::new(id, input, current_timestamp());
        state.last_id = id;
        state.submissions.push(submission.clone());

        Ok(submission)
    }

    async fn get_all(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        let state = self.state.read().map_err(Self::lock_error)?;
        Ok(state.submissions.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>, StoreError> {
        let state = self.state.read().map_err(Self::lock_error)?;
        Ok(state.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Option<ContactSubmission>, StoreError> {
        let mut state = self.state.write().map_err(Self::lock_error)?;

        Ok(state
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|submission| {
                submission.status = status.to_string();
                submission.clone()
            }))
    }
}

/// テスト用のリポジトリ実装
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 全操作が`StoreError`を返すリポジトリ
    #[derive(Debug, Default)]
    pub struct FailingSubmissionRepository {
        call_count: AtomicUsize,
    }

    impl FailingSubmissionRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn fail<T>(&self, operation: &str) -> Result<T, StoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database(format!(
                "disk I/O error during {}",
                operation
            )))
        }
    }

    #[async_trait]
    impl SubmissionRepository for FailingSubmissionRepository {
        async fn create(
            &self,
            _input: ContactSubmissionInput,
        ) -> Result<ContactSubmission, StoreError> {
            self.fail("create")
        }

        async fn get_all(&self) -> Result<Vec<ContactSubmission>, StoreError> {
            self.fail("get_all")
        }

        async fn get_by_id(&self, _id: i64) -> Result<Option<ContactSubmission>, StoreError> {
            self.fail("get_by_id")
        }

        async fn update_status(
            &self,
            _id: i64,
            _status: &str,
        ) -> Result<Option<ContactSubmission>, StoreError> {
            self.fail("update_status")
        }
    }
}
