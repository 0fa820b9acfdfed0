// src/model.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// バッジ表示 (文字列 / 数値どちらも許容)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Badge {
    Count(i64),
    Text(String),
}

/// ルートごとの宣言的な属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    /// 表示タイトル (翻訳キーまたはそのままの文字列)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 未指定なら認証必須
    #[serde(default = "default_true")]
    pub requires_auth: bool,
    /// いずれか 1 つを持っていれば通過 (OR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    /// いずれか 1 つを持っていれば通過 (OR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub keep_alive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// 閉じられない固定タブとして常に開く
    #[serde(default, skip_serializing_if = "is_false")]
    pub affix: bool,
    /// メニューの並び順。未指定は末尾
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_menu: Option<String>,
    /// 外部リンクとしてメニューに出す場合の URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
}

impl Default for RouteMeta {
    fn default() -> Self {
        RouteMeta {
            title: None,
            icon: None,
            requires_auth: true,
            required_permissions: None,
            required_roles: None,
            keep_alive: false,
            hidden: false,
            affix: false,
            order: None,
            badge: None,
            active_menu: None,
            external_link: None,
        }
    }
}

/// ルート定義ツリーの 1 ノード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    /// ルートのパス (親からの相対、または "/" 始まりの絶対)
    #[serde(default)]
    pub path: String,

    /// ツリー全体で一意な名前
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// グルーピング用ノードのリダイレクト先
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    /// `import('...')` で指定されたコンポーネントの specifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(default)]
    pub meta: RouteMeta,

    /// 子ルート (空ならリーフ)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        RouteNode {
            path: path.into(),
            name: Some(name.into()),
            redirect: None,
            component: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }

    /// エラーメッセージ等で使う識別子 (name が無ければ path)
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

/// ルートツリーから導出したサイドバー用メニュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 解決済みの絶対パス、または外部リンク URL
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MenuItem>>,
}

/// ルート遷移ごとにナビゲーション層から渡されるイベント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub path: String,
    pub full_path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub meta: RouteMeta,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Navigation {
    /// クエリなしのナビゲーション
    pub fn to(path: impl Into<String>, name: impl Into<String>, meta: RouteMeta) -> Self {
        let path = path.into();
        Navigation {
            full_path: path.clone(),
            path,
            name: Some(name.into()),
            meta,
            query: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }
}

/// タブバーに並ぶ 1 タブ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// fullPath (クエリ込み)
    pub id: String,
    /// ルート名。keep-alive のキャッシュキーとして使う
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub path: String,
    pub full_path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub closable: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub affix: bool,
}

impl Tab {
    /// affix / pinned のどちらかなら固定タブ
    pub fn is_fixed(&self) -> bool {
        self.affix || self.pinned
    }

    pub(crate) fn refresh_closable(&mut self) {
        self.closable = !self.is_fixed();
    }
}
