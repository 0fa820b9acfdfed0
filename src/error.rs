// src/error.rs
use std::io;

use serde_json::Error as JsonError;
use thiserror::Error;

/// クレート全体で使うエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("ファイルシステムエラー: {0}")]
    Io(String),
    #[error("見つかりません: {0}")]
    NotFound(String),
    #[error("TypeScript の解析に失敗しました: {0}")]
    Parse(String),
    #[error("(デ)シリアライズエラー: {0}")]
    Serialization(String),
    #[error("設定エラー: {0}")]
    Config(String),
    #[error("ルート '{route}' の meta が不正です: {reason}")]
    MalformedMeta { route: String, reason: String },
    #[error("ルート名が重複しています: {0}")]
    DuplicateRouteName(String),
    #[error("セッション情報を取得できません: {0}")]
    Session(String),
    #[error("ストレージエラー: {0}")]
    Storage(String),
}

impl RouterError {
    pub fn malformed(route: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::MalformedMeta {
            route: route.into(),
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for RouterError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => RouterError::NotFound(format!("{x}")),
            _ => RouterError::Io(format!("IOError: {x}")),
        }
    }
}

impl From<JsonError> for RouterError {
    fn from(src: JsonError) -> RouterError {
        RouterError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for RouterError {
    fn from(src: toml::de::Error) -> RouterError {
        RouterError::Config(format!("Toml deserialization error: {src}"))
    }
}
