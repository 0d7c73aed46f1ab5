/// お問い合わせフォーム入力のバリデーション
///
/// 生のJSONを検証し、書き込み可能な5フィールドだけを持つ
/// `ContactSubmissionInput`に正規化する。最初の失敗で止めず、
/// 問題のあるフィールドをすべて列挙して返す。
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::contact_submission::ContactSubmissionInput;

/// フィールド単位のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// リクエストボディがJSONとして解釈できない
    #[error("request body must be valid JSON")]
    InvalidJson,
    /// リクエストボディがJSONオブジェクトでない
    #[error("request body must be a JSON object")]
    NotAnObject,
    /// 必須フィールドが欠落
    #[error("{0} is required")]
    MissingField(&'static str),
    /// 文字列であるべきフィールドが文字列でない
    #[error("{0} must be a string")]
    NotAString(&'static str),
    /// 空文字（トリム後）
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    /// メールアドレス形式が不正
    #[error("email must be a valid email address")]
    InvalidEmail,
}

impl ValidationError {
    /// エラーの対象フィールド名
    ///
    /// ボディ全体の問題は"body"として扱う。
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidJson | ValidationError::NotAnObject => "body",
            ValidationError::MissingField(field)
            | ValidationError::NotAString(field)
            | ValidationError::EmptyField(field) => field,
            ValidationError::InvalidEmail => "email",
        }
    }
}

/// レスポンスに載せるフィールドエラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// フィールド名（camelCase）
    pub field: String,
    /// 理由
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        Self {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// 1件以上のバリデーションエラーの集合
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {} problem(s)", .0.len())]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// 単一のエラーから作成
    pub fn single(err: ValidationError) -> Self {
        Self(vec![err])
    }

    /// 含まれるエラー
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// 指定フィールドのエラーを含むか
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    /// レスポンス用のフィールドエラー一覧
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.0.iter().map(FieldError::from).collect()
    }
}

/// お問い合わせ入力のバリデータ
pub struct SubmissionValidator;

impl SubmissionValidator {
    /// トランスポートのボディ文字列を検証する
    ///
    /// ボディが無い/空の場合は`{}`として扱い、全必須フィールドの欠落を報告する。
    /// JSONとして解釈できない場合もバリデーション失敗として扱う。
    pub fn validate_body(body: Option<&str>) -> Result<ContactSubmissionInput, ValidationErrors> {
        let raw = parse_body(body)?;
        Self::validate(&raw)
    }

    /// 生のJSON値を検証する
    pub fn validate(raw: &Value) -> Result<ContactSubmissionInput, ValidationErrors> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationErrors::single(ValidationError::NotAnObject))?;

        let mut errors = Vec::new();
        let mut take = |field| {
            required_string(obj, field).unwrap_or_else(|err| {
                errors.push(err);
                String::new()
            })
        };

        let first_name = take("firstName");
        let last_name = take("lastName");
        let email = take("email");
        let service = take("service");
        let message = take("message");

        // emailは空でない場合のみ形式チェック（空・欠落は上で報告済み）
        if !email.is_empty() && !is_valid_email(&email) {
            errors.push(ValidationError::InvalidEmail);
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ContactSubmissionInput {
            first_name,
            last_name,
            email,
            service,
            message,
        })
    }

    /// ステータス更新ボディ（`{"status": "..."}`）を検証する
    ///
    /// 値は固定の集合と照合しない。空でない文字列であればそのまま受け付ける。
    pub fn validate_status_body(body: Option<&str>) -> Result<String, ValidationErrors> {
        let raw = parse_body(body)?;
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationErrors::single(ValidationError::NotAnObject))?;

        match obj.get("status") {
            None | Some(Value::Null) => Err(ValidationErrors::single(
                ValidationError::MissingField("status"),
            )),
            Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationErrors::single(
                ValidationError::EmptyField("status"),
            )),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ValidationErrors::single(ValidationError::NotAString(
                "status",
            ))),
        }
    }
}

/// ボディ文字列をJSONに変換（空ボディは空オブジェクト）
fn parse_body(body: Option<&str>) -> Result<Value, ValidationErrors> {
    match body.map(str::trim) {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text)
            .map_err(|_| ValidationErrors::single(ValidationError::InvalidJson)),
    }
}

/// 必須文字列フィールドを取り出し、トリムした値を返す
fn required_string(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::EmptyField(field))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(_) => Err(ValidationError::NotAString(field)),
    }
}

/// メールアドレス形式の検証
///
/// - `@`はちょうど1つ
/// - ローカル部: 英数字と`.!#$%&'*+/=?^_`{|}~-`、先頭末尾と連続のドットは不可
/// - ドメイン: ドット区切りで2ラベル以上、各ラベルは英数字とハイフン（先頭末尾のハイフン不可）
/// - TLDは2文字以上の英字
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if domain.contains('@') || local.is_empty() || local.len() > 64 || domain.len() > 253 {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c))
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..");
    if !local_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];

    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REQUIRED_FIELDS: [&str; 5] = ["firstName", "lastName", "email", "service", "message"];

    fn valid_payload() -> Value {
        json!({
            "firstName": "John",
            "lastName": "Doe",
            "email": "john.doe@example.com",
            "service": "software-development",
            "message": "I need help with my project"
        })
    }

    #[test]
    fn test_valid_submission_passes() {
        let input = SubmissionValidator::validate(&valid_payload()).unwrap();

        assert_eq!(input.first_name, "John");
        assert_eq!(input.last_name, "Doe");
        assert_eq!(input.email, "john.doe@example.com");
        assert_eq!(input.service, "software-development");
        assert_eq!(input.message, "I need help with my project");
    }

    #[test]
    fn test_extraneous_fields_are_dropped() {
        let mut payload = valid_payload();
        payload["status"] = json!("contacted");
        payload["id"] = json!(42);

        let input = SubmissionValidator::validate(&payload).unwrap();
        let json = serde_json::to_value(&input).unwrap();

        assert_eq!(json.as_object().unwrap().len(), 5);
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut payload = valid_payload();
        payload["firstName"] = json!("  John  ");

        let input = SubmissionValidator::validate(&payload).unwrap();
        assert_eq!(input.first_name, "John");
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let mut payload = valid_payload();
        payload["email"] = json!("invalid-email");

        let errors = SubmissionValidator::validate(&payload).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::InvalidEmail]);
        assert!(errors.has_field("email"));
    }

    /// 他のフィールドが壊れていても不正なメールは必ず報告される
    #[test]
    fn test_invalid_email_reported_alongside_other_errors() {
        let payload = json!({
            "firstName": "",
            "email": "invalid-email",
            "message": 12
        });

        let errors = SubmissionValidator::validate(&payload).unwrap_err();
        assert!(errors.errors().contains(&ValidationError::InvalidEmail));
        assert!(errors.errors().contains(&ValidationError::EmptyField("firstName")));
        assert!(errors.errors().contains(&ValidationError::MissingField("lastName")));
        assert!(errors.errors().contains(&ValidationError::MissingField("service")));
        assert!(errors.errors().contains(&ValidationError::NotAString("message")));
    }

    #[test]
    fn test_empty_required_fields_are_rejected() {
        let payload = json!({
            "firstName": "",
            "lastName": "   ",
            "email": "john.doe@example.com",
            "service": "software-development",
            "message": ""
        });

        let errors = SubmissionValidator::validate(&payload).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[
                ValidationError::EmptyField("firstName"),
                ValidationError::EmptyField("lastName"),
                ValidationError::EmptyField("message"),
            ]
        );
    }

    #[test]
    fn test_missing_fields_are_all_enumerated() {
        let payload = json!({
            "firstName": "John",
            "email": "john.doe@example.com"
        });

        let errors = SubmissionValidator::validate(&payload).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[
                ValidationError::MissingField("lastName"),
                ValidationError::MissingField("service"),
                ValidationError::MissingField("message"),
            ]
        );
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for field in REQUIRED_FIELDS {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);

            let errors = SubmissionValidator::validate(&payload).unwrap_err();
            assert!(errors.has_field(field), "{} should be reported", field);
        }
    }

    #[test]
    fn test_non_object_is_rejected() {
        let errors = SubmissionValidator::validate(&json!(["John"])).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::NotAnObject]);
    }

    #[test]
    fn test_validate_body_with_malformed_json() {
        let errors = SubmissionValidator::validate_body(Some("{ invalid json }")).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::InvalidJson]);
        assert!(errors.has_field("body"));
    }

    #[test]
    fn test_validate_body_empty_reports_all_missing() {
        let errors = SubmissionValidator::validate_body(None).unwrap_err();
        assert_eq!(errors.errors().len(), 5);

        let errors = SubmissionValidator::validate_body(Some("")).unwrap_err();
        assert_eq!(errors.errors().len(), 5);
    }

    #[test]
    fn test_validate_body_success() {
        let body = valid_payload().to_string();
        let input = SubmissionValidator::validate_body(Some(&body)).unwrap();
        assert_eq!(input.email, "john.doe@example.com");
    }

    #[test]
    fn test_field_errors_for_response() {
        let errors = SubmissionValidator::validate(&json!({})).unwrap_err();
        let field_errors = errors.field_errors();

        assert_eq!(field_errors.len(), 5);
        assert_eq!(field_errors[0].field, "firstName");
        assert_eq!(field_errors[0].message, "firstName is required");
    }

    // ==================== ステータス更新 ====================

    #[test]
    fn test_status_body_accepts_any_non_empty_string() {
        let status =
            SubmissionValidator::validate_status_body(Some(r#"{"status":"contacted"}"#)).unwrap();
        assert_eq!(status, "contacted");

        let status =
            SubmissionValidator::validate_status_body(Some(r#"{"status":"archived-2024"}"#))
                .unwrap();
        assert_eq!(status, "archived-2024");
    }

    #[test]
    fn test_status_body_missing_status() {
        let errors = SubmissionValidator::validate_status_body(Some("{}")).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::MissingField("status")]);
    }

    #[test]
    fn test_status_body_non_string_status() {
        let errors =
            SubmissionValidator::validate_status_body(Some(r#"{"status":1}"#)).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::NotAString("status")]);
    }

    #[test]
    fn test_status_body_empty_status() {
        let errors =
            SubmissionValidator::validate_status_body(Some(r#"{"status":"  "}"#)).unwrap_err();
        assert_eq!(errors.errors(), &[ValidationError::EmptyField("status")]);
    }

    // ==================== メール形式 ====================

    #[test]
    fn test_valid_emails() {
        for email in [
            "john.doe@example.com",
            "a@b.co",
            "first+tag@sub.example.org",
            "x_y-z@my-domain.io",
        ] {
            assert!(is_valid_email(email), "{} should be valid", email);
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "invalid-email",
            "not-an-email",
            "@example.com",
            "john@",
            "john@example",
            "john@@example.com",
            "john@exa mple.com",
            ".john@example.com",
            "john..doe@example.com",
            "john@-example.com",
            "john@example.c",
            "john@example.123",
            "john@example..com",
        ] {
            assert!(!is_valid_email(email), "{} should be invalid", email);
        }
    }
}
