/// お問い合わせサービス
///
/// バリデーション・保存・通知をまとめ、全エントリポイントで共有するユースケースを提供する。
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use super::notification_dispatcher::{NotificationDispatcher, NotificationHandle};
use crate::domain::{ContactSubmission, SubmissionValidator, ValidationErrors};
use crate::infrastructure::{StoreError, SubmissionRepository};

/// サービスのエラー型
#[derive(Debug, Error)]
pub enum ContactServiceError {
    /// 入力の検証に失敗
    #[error("入力が不正です: {0}")]
    Validation(#[from] ValidationErrors),

    /// ストア操作に失敗
    #[error("ストア操作に失敗しました: {0}")]
    Storage(#[from] StoreError),
}

/// 送信受付の結果
#[derive(Debug)]
pub struct SubmitOutcome {
    /// 保存されたレコード
    pub submission: ContactSubmission,
    /// 起動した通知タスク
    pub notification: NotificationHandle,
}

/// お問い合わせサービス
#[derive(Clone)]
pub struct ContactService {
    repository: Arc<dyn SubmissionRepository>,
    notifier: NotificationDispatcher,
}

impl ContactService {
    /// 新しいContactServiceを作成
    pub fn new(repository: Arc<dyn SubmissionRepository>, notifier: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// ボディ文字列を検証して保存し、通知を起動する
    ///
    /// # 処理フロー
    /// 1. ボディをJSONとして解釈し、検証
    /// 2. ストアに保存（IDと作成日時を付与）
    /// 3. 通知タスクを起動（完了は待たない）
    pub async fn submit(&self, body: Option<&str>) -> Result<SubmitOutcome, ContactServiceError> {
        let input = SubmissionValidator::validate_body(body)?;

        let submission = self.repository.create(input).await.map_err(|e| {
            error!(operation = "create", error = %e, "お問い合わせの保存に失敗");
            e
        })?;

        info!(
            submission_id = submission.id,
            service = %submission.service,
            "お問い合わせを受け付けました"
        );

        let notification = self.notifier.dispatch(submission.clone());

        Ok(SubmitOutcome {
            submission,
            notification,
        })
    }

    /// 全件を作成順に取得
    pub async fn list(&self) -> Result<Vec<ContactSubmission>, ContactServiceError> {
        self.repository.get_all().await.map_err(|e| {
            error!(operation = "get_all", error = %e, "お問い合わせ一覧の取得に失敗");
            ContactServiceError::from(e)
        })
    }

    /// IDで1件取得
    pub async fn find(&self, id: i64) -> Result<Option<ContactSubmission>, ContactServiceError> {
        self.repository.get_by_id(id).await.map_err(|e| {
            error!(operation = "get_by_id", submission_id = id, error = %e, "お問い合わせの取得に失敗");
            ContactServiceError::from(e)
        })
    }

    /// ステータス更新ボディを検証し、ステータスを上書きする
    pub async fn update_status(
        &self,
        id: i64,
        body: Option<&str>,
    ) -> Result<Option<ContactSubmission>, ContactServiceError> {
        let status = SubmissionValidator::validate_status_body(body)?;

        let updated = self
            .repository
            .update_status(id, &status)
            .await
            .map_err(|e| {
                error!(
                    operation = "update_status",
                    submission_id = id,
                    error = %e,
                    "ステータスの更新に失敗"
                );
                ContactServiceError::from(e)
            })?;

        if updated.is_some() {
            info!(submission_id = id, status = %status, "ステータスを更新しました");
        }
        Ok(updated)
    }
}
