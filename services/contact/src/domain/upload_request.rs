/// アップロード要求のドメインモデル
///
/// 署名付きPUT URL発行の前に、ファイル種別・サイズ・保存先フォルダを検証し、
/// 衝突しないオブジェクトキーを導出する。
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// アップロードを許可するContent-Type
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// 許可リストの表示用文字列
const ALLOWED_CONTENT_TYPES_LABEL: &str = "image/jpeg, image/png, image/gif, image/webp";

/// 最大ファイルサイズ（10MiB）
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 署名付きURLの有効期限（秒）
pub const UPLOAD_URL_EXPIRY_SECS: u64 = 300;

/// フォルダ未指定時の保存先
pub const DEFAULT_FOLDER: &str = "uploads";

/// アップロード要求の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRequestError {
    #[error("request body must be valid JSON")]
    InvalidJson,

    #[error("fileName and fileType are required")]
    MissingFields,

    #[error("Invalid file type. Allowed types: {}", ALLOWED_CONTENT_TYPES_LABEL)]
    UnsupportedFileType(String),

    #[error("File size exceeds limit of 10MB")]
    FileTooLarge(u64),

    #[error("fileSize must be a non-negative number")]
    InvalidFileSize,

    #[error("folder must be a relative path without '..' segments: {0}")]
    InvalidFolder(String),
}

/// 検証済みのアップロード要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// クライアント側の元ファイル名
    pub file_name: String,
    /// Content-Type（許可リスト内）
    pub file_type: String,
    /// 申告サイズ（バイト）
    pub file_size: Option<u64>,
    /// 保存先フォルダ（前後の`/`は除去済み）
    pub folder: String,
}

impl UploadRequest {
    /// リクエストボディ文字列から検証済み要求を作る
    pub fn from_body(body: Option<&str>) -> Result<Self, UploadRequestError> {
        let raw = match body.map(str::trim) {
            None | Some("") => Value::Object(Map::new()),
            Some(text) => serde_json::from_str(text).map_err(|_| UploadRequestError::InvalidJson)?,
        };
        Self::from_value(&raw)
    }

    /// JSON値から検証済み要求を作る
    pub fn from_value(raw: &Value) -> Result<Self, UploadRequestError> {
        let obj = raw.as_object().ok_or(UploadRequestError::MissingFields)?;

        let file_name = non_empty_string(obj.get("fileName"));
        let file_type = non_empty_string(obj.get("fileType"));
        let (Some(file_name), Some(file_type)) = (file_name, file_type) else {
            return Err(UploadRequestError::MissingFields);
        };

        if !ALLOWED_CONTENT_TYPES.contains(&file_type.as_str()) {
            return Err(UploadRequestError::UnsupportedFileType(file_type));
        }

        let file_size = parse_file_size(obj.get("fileSize"))?;
        if let Some(size) = file_size
            && size > MAX_FILE_SIZE
        {
            return Err(UploadRequestError::FileTooLarge(size));
        }

        let folder = match obj.get("folder") {
            None | Some(Value::Null) => DEFAULT_FOLDER.to_string(),
            Some(Value::String(s)) => normalize_folder(s)?,
            Some(other) => return Err(UploadRequestError::InvalidFolder(other.to_string())),
        };

        Ok(Self {
            file_name,
            file_type,
            file_size,
            folder,
        })
    }

    /// 元ファイル名の拡張子（小文字化）
    ///
    /// 拡張子が無い、または英数字以外を含む場合はNone。
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// 一意なファイル名（`{uuid}.{ext}`）を導出
    pub fn unique_file_name(&self, id: Uuid) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }

    /// オブジェクトキー（`{folder}/{unique_file_name}`）を導出
    pub fn object_key(&self, unique_file_name: &str) -> String {
        format!("{}/{}", self.folder, unique_file_name)
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn parse_file_size(value: Option<&Value>) -> Result<Option<u64>, UploadRequestError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(size) = n.as_u64() {
                return Ok(Some(size));
            }
            match n.as_f64() {
                Some(size) if size >= 0.0 && size.is_finite() => Ok(Some(size.ceil() as u64)),
                _ => Err(UploadRequestError::InvalidFileSize),
            }
        }
        Some(_) => Err(UploadRequestError::InvalidFileSize),
    }
}

/// フォルダ指定を正規化する
///
/// 前後の`/`を取り除き、空・`.`・`..`のセグメントを拒否する。
fn normalize_folder(raw: &str) -> Result<String, UploadRequestError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_FOLDER.to_string());
    }

    let valid = trimmed.split('/').all(|segment| {
        !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
    });
    if !valid {
        return Err(UploadRequestError::InvalidFolder(raw.to_string()));
    }

    Ok(trimmed.to_string())
}
