/// 構造化ログの初期化
///
/// LambdaとAPIサーバーで共通のJSONログ（CloudWatch向け）を設定する。
/// レベルは`RUST_LOG`で指定し、未指定時は`DEFAULT_LOG_LEVEL`。
use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG`未指定時のログレベル
pub const DEFAULT_LOG_LEVEL: &str = "info";

static LOGGING: Once = Once::new();

/// `RUST_LOG`からフィルターを作り、不正・未指定なら`fallback`を使う
fn filter_from_env(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// JSONログを初期化する
///
/// 2回目以降の呼び出しは何もしない。別のサブスクライバーが既に
/// 登録されている場合（テストなど）もそのまま使う。
///
/// ```ignore
/// contact::infrastructure::init_logging();
/// tracing::info!(submission_id = 1, "お問い合わせを受け付けました");
/// ```
pub fn init_logging() {
    LOGGING.call_once(|| {
        let json = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        let _ = tracing_subscriber::registry()
            .with(filter_from_env(DEFAULT_LOG_LEVEL))
            .with(json)
            .try_init();
    });
}

/// テスト用の読みやすいログを初期化する（debugまで出力）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_LOGGING: Once = Once::new();

    TEST_LOGGING.call_once(|| {
        let compact = tracing_subscriber::fmt::layer()
            .compact()
            .with_test_writer()
            .with_target(true);

        let _ = tracing_subscriber::registry()
            .with(filter_from_env("debug"))
            .with(compact)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        init_logging();
        init_logging();
    }

    #[test]
    fn test_filter_falls_back_to_default() {
        // RUST_LOGの有無に関わらずフィルターが構築できる
        let filter = filter_from_env(DEFAULT_LOG_LEVEL);
        assert!(!filter.to_string().is_empty());
    }

    /// お問い合わせ処理で使う構造化フィールドが記録できること
    #[test]
    fn test_structured_fields() {
        init_test_logging();

        tracing::info!(submission_id = 1, status = "contacted", "ステータス更新");
        tracing::warn!(recipient = "contact@example.com", "通知メール未設定");
        tracing::error!(operation = "create", error = "disk full", "保存に失敗");
    }
}
