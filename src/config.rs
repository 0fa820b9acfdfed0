// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::error::RouterError;

/// ナビゲーションガードが使う固定パス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSettings {
    pub login_path: String,
    pub forbidden_path: String,
    /// タブ再読み込みで経由する中継ルートの接頭辞
    pub redirect_prefix: String,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        NavigationSettings {
            login_path: "/login".to_string(),
            forbidden_path: "/403".to_string(),
            redirect_prefix: "/redirect".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabSettings {
    /// `{tabs, activeTabPath}` を保存するキー
    pub storage_key: String,
    /// 「タブ状態を記憶する」設定を保存するキー
    pub remember_key: String,
    /// ストアに設定が無いときの既定値
    pub remember_state: bool,
}

impl Default for TabSettings {
    fn default() -> Self {
        TabSettings {
            storage_key: "app-tabs-state".to_string(),
            remember_key: "app-remember-tab-state".to_string(),
            remember_state: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub navigation: NavigationSettings,
    pub tabs: TabSettings,
}

impl AppConfig {
    /// TOML ファイルから読み込む。ファイルが無ければ既定値
    pub fn load(path: &Path) -> Result<Self, RouterError> {
        tracing::debug!("設定ファイルを読み込み: {:?}", path);
        if !path.exists() {
            tracing::debug!("設定ファイルが見つからないので既定値を使用");
            return Ok(AppConfig::default());
        }
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
