/// お問い合わせ送信（ContactSubmission）のドメインモデル
///
/// ストアが採番・タイムスタンプ付与を行い、作成後に変更可能なのは`status`のみ。
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// 作成直後のステータス
pub const DEFAULT_STATUS: &str = "pending";

/// バリデーション済みの書き込み可能フィールド
///
/// バリデーション層の出力であり、ストアの`create`への入力。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmissionInput {
    /// 名
    pub first_name: String,
    /// 姓
    pub last_name: String,
    /// 連絡先メールアドレス
    pub email: String,
    /// 問い合わせ対象のサービス（スラッグ）
    pub service: String,
    /// 本文
    pub message: String,
}

/// 保存済みのお問い合わせ送信
///
/// JSONではcamelCaseのキー（`firstName`, `createdAt`等）で表現する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    /// ストアが採番するID（単調増加、再利用しない）
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub service: String,
    pub message: String,
    /// 作成日時（作成時に一度だけ設定）
    pub created_at: DateTime<Utc>,
    /// 対応ステータス（作成時は"pending"）
    pub status: String,
}

impl ContactSubmission {
    /// 採番済みIDと作成日時から新しいレコードを組み立てる
    ///
    /// ステータスは常に`DEFAULT_STATUS`で始まる。
    pub fn new(id: i64, input: ContactSubmissionInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            service: input.service,
            message: input.message,
            created_at,
            status: DEFAULT_STATUS.to_string(),
        }
    }

    /// 表示用の氏名（"名 姓"）
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// レコード作成用の現在時刻を取得
///
/// SQLiteにはミリ秒精度で保存するため、どのバックエンドでも同一の値を返せるよう
/// 作成時点でミリ秒に丸める。
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
