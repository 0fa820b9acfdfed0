// src/menu.rs
use serde_json::Value;
use std::path::Path;

use crate::error::RouterError;
use crate::model::{MenuItem, RouteNode};
use crate::resolver::resolve_route_path;

/// ルートツリーからメニューツリーを構築する。
///
/// - `hidden` のノード (とその子孫) は出さない
/// - パスは `base_path` を基準に解決し、`externalLink` があればそちらを優先
/// - 各階層を `order` 昇順で安定ソート (未指定は末尾)
///
/// 入力は参照のみで、毎回新しいツリーを返す。
pub fn build_menu(nodes: &[RouteNode], base_path: &str) -> Vec<MenuItem> {
    let mut visible: Vec<&RouteNode> = nodes.iter().filter(|n| !n.meta.hidden).collect();
    // Vec::sort_by_key は安定ソートなので同順位は宣言順のまま
    visible.sort_by_key(|n| (n.meta.order.is_none(), n.meta.order.unwrap_or_default()));

    visible
        .into_iter()
        .map(|node| {
            let full_path = resolve_route_path(&node.path, base_path);
            let children = if node.children.is_empty() {
                None
            } else {
                Some(build_menu(&node.children, &full_path)).filter(|c| !c.is_empty())
            };

            MenuItem {
                id: node.name.clone().unwrap_or_else(|| node.path.clone()),
                label: node
                    .meta
                    .title
                    .clone()
                    .or_else(|| node.name.clone())
                    .unwrap_or_else(|| node.path.clone()),
                icon: node.meta.icon.clone(),
                path: node.meta.external_link.clone().unwrap_or(full_path),
                badge: node.meta.badge.clone(),
                required_permissions: node.meta.required_permissions.clone(),
                required_roles: node.meta.required_roles.clone(),
                children,
            }
        })
        .collect()
}

/// 翻訳テーブル (ネストした JSON をドット区切りのキーで引く)
#[derive(Debug, Clone, Default)]
pub struct TitleCatalog {
    messages: Value,
}

impl TitleCatalog {
    pub fn new(messages: Value) -> Self {
        TitleCatalog { messages }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RouterError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(TitleCatalog::new(serde_json::from_str(&raw)?))
    }

    /// キーを翻訳する。見つからなければキーそのものを返す
    pub fn translate(&self, key: &str) -> String {
        if let Some(Value::String(s)) = self.messages.get(key) {
            return s.clone();
        }
        let mut cursor = &self.messages;
        for segment in key.split('.') {
            match cursor.get(segment) {
                Some(next) => cursor = next,
                None => return key.to_string(),
            }
        }
        match cursor {
            Value::String(s) => s.clone(),
            _ => key.to_string(),
        }
    }
}

/// ラベルを翻訳した新しいメニューツリーを返す
pub fn localize_menu(menus: &[MenuItem], catalog: &TitleCatalog) -> Vec<MenuItem> {
    menus
        .iter()
        .map(|menu| MenuItem {
            label: catalog.translate(&menu.label),
            children: menu
                .children
                .as_ref()
                .map(|children| localize_menu(children, catalog)),
            ..menu.clone()
        })
        .collect()
}
