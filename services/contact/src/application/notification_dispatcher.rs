/// お問い合わせ通知ディスパッチャー
///
/// 保存済みの送信内容から通知メールを組み立てて送信する。
/// 送信失敗はログに記録するのみで、呼び出し元のリクエストは失敗させない。
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::ContactSubmission;
use crate::infrastructure::{EmailMessage, EmailSender};

/// 通知送信のタイムアウト
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// 通知メールのディスパッチャー
#[derive(Clone)]
pub struct NotificationDispatcher {
    /// メール送信クライアント（未設定ならNone）
    sender: Option<Arc<dyn EmailSender>>,
    /// 通知先
    recipient: String,
    /// 送信元
    from: String,
    /// 1通あたりのタイムアウト
    timeout: Duration,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("configured", &self.sender.is_some())
            .field("recipient", &self.recipient)
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotificationDispatcher {
    /// 新しいNotificationDispatcherを作成
    pub fn new(
        sender: Option<Arc<dyn EmailSender>>,
        recipient: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipient: recipient.into(),
            from: from.into(),
            timeout: NOTIFICATION_TIMEOUT,
        }
    }

    /// 通知無効のディスパッチャー
    pub fn disabled() -> Self {
        Self::new(None, "", "")
    }

    /// タイムアウトを変更
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// メール送信が設定されているか
    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// 通知メールを組み立てる
    pub fn build_message(
        submission: &ContactSubmission,
        recipient: &str,
        sender: &str,
    ) -> EmailMessage {
        let name = submission.full_name();
        let submitted = submission
            .created_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string();

        let text = format!(
            "New contact form submission\n\n\
             Name: {}\n\
             Email: {}\n\
             Service Interest: {}\n\
             Submitted: {}\n\n\
             Message:\n{}\n",
            name, submission.email, submission.service, submitted, submission.message
        );

        let html = format!(
            "<h2>New Contact Form Submission</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Service Interest:</strong> {}</p>\
             <p><strong>Submitted:</strong> {}</p>\
             <h3>Message:</h3>\
             <p>{}</p>",
            escape_html(&name),
            escape_html(&submission.email),
            escape_html(&submission.service),
            submitted,
            escape_html(&submission.message).replace('\n', "<br>"),
        );

        EmailMessage {
            to: recipient.to_string(),
            from: sender.to_string(),
            subject: format!("New Contact Form Submission from {}", name),
            text,
            html,
        }
    }

    /// 通知を1通送信する
    ///
    /// # 戻り値
    /// * 送信成功なら`true`
    /// * 未設定・送信失敗なら`false`（ログに記録）
    pub async fn notify(
        &self,
        submission: &ContactSubmission,
        recipient: &str,
        sender: &str,
    ) -> bool {
        let Some(email_sender) = &self.sender else {
            warn!(
                submission_id = submission.id,
                "メール送信が未設定のため通知をスキップ"
            );
            return false;
        };

        let message = Self::build_message(submission, recipient, sender);
        match email_sender.send(&message).await {
            Ok(()) => {
                info!(
                    submission_id = submission.id,
                    recipient = %recipient,
                    "通知メールを送信しました"
                );
                true
            }
            Err(e) => {
                error!(
                    submission_id = submission.id,
                    error = %e,
                    "通知メールの送信に失敗"
                );
                false
            }
        }
    }

    /// 設定済みの通知先・送信元で通知を非同期タスクとして起動する
    ///
    /// タスクはタイムアウト付きで実行され、タイムアウトは失敗として扱う。
    pub fn dispatch(&self, submission: ContactSubmission) -> NotificationHandle {
        let dispatcher = self.clone();
        let submission_id = submission.id;

        let handle = tokio::spawn(async move {
            let recipient = dispatcher.recipient.clone();
            let from = dispatcher.from.clone();
            let notify = dispatcher.notify(&submission, &recipient, &from);

            match tokio::time::timeout(dispatcher.timeout, notify).await {
                Ok(sent) => sent,
                Err(_) => {
                    warn!(
                        submission_id = submission.id,
                        timeout_ms = dispatcher.timeout.as_millis() as u64,
                        "通知メールの送信がタイムアウト"
                    );
                    false
                }
            }
        });

        NotificationHandle {
            submission_id,
            handle,
        }
    }
}

/// 起動済み通知タスクのハンドル
#[derive(Debug)]
pub struct NotificationHandle {
    submission_id: i64,
    handle: JoinHandle<bool>,
}

impl NotificationHandle {
    /// 通知タスクの完了を待つ
    ///
    /// パニック・キャンセルはログに記録して`false`を返す。
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(sent) => sent,
            Err(e) => {
                error!(
                    submission_id = self.submission_id,
                    panicked = e.is_panic(),
                    error = %e,
                    "通知タスクが異常終了"
                );
                false
            }
        }
    }

    /// 完了を待たずに切り離す
    ///
    /// 異常終了した場合のログ記録は別タスクで行う。
    pub fn detach(self) {
        tokio::spawn(async move {
            self.wait().await;
        });
    }
}

/// HTMLの特殊文字をエスケープ
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
