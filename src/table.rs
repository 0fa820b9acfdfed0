// src/table.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::RouterError;
use crate::model::{RouteMeta, RouteNode};
use crate::parser::{parse_routes_in_file, ParsedRouteModule};
use crate::resolver::flatten_routes;

/// アプリケーションの静的なルート定義。起動時に一度だけ読み込み、以後は変更しない。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    /// 認証不要のルート (ログイン / エラーページ等)
    #[serde(default)]
    pub static_routes: Vec<RouteNode>,
    /// 認証済みなら常に見えるルート (レイアウトとダッシュボード等)
    #[serde(default)]
    pub basic_routes: Vec<RouteNode>,
    /// 権限によって出し分ける動的ルート
    #[serde(default)]
    pub async_routes: Vec<RouteNode>,
    /// キャッチオールなど最後に登録するルート
    #[serde(default)]
    pub not_found_routes: Vec<RouteNode>,
}

impl RouteTable {
    /// 拡張子で JSON / TypeScript を切り替えて読み込み、検証する
    pub fn load(path: &Path) -> Result<Self, RouterError> {
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => RouteTable::from_parsed(parse_routes_in_file(path)?),
            Some("json") => serde_json::from_str(&fs::read_to_string(path)?)?,
            other => {
                return Err(RouterError::Config(format!(
                    "未対応のルート定義ファイルです ({other:?}): {}",
                    path.display()
                )));
            }
        };
        table.validate()?;
        Ok(table)
    }

    /// 変数名でグループを振り分ける
    ///
    /// - `static*` → static
    /// - `basic*` / `constant*` → basic
    /// - `notFound*` → not found
    /// - それ以外 → async
    pub fn from_parsed(parsed: ParsedRouteModule) -> Self {
        let mut table = RouteTable::default();
        for (var_name, routes) in parsed.groups {
            let lower = var_name.to_lowercase();
            let target = if lower.starts_with("static") {
                &mut table.static_routes
            } else if lower.starts_with("basic") || lower.starts_with("constant") {
                &mut table.basic_routes
            } else if lower.starts_with("notfound") {
                &mut table.not_found_routes
            } else {
                &mut table.async_routes
            };
            target.extend(routes);
        }
        table
    }

    /// 複数ファイルから読み込んだテーブルを連結する
    pub fn merge(&mut self, other: RouteTable) {
        self.static_routes.extend(other.static_routes);
        self.basic_routes.extend(other.basic_routes);
        self.async_routes.extend(other.async_routes);
        self.not_found_routes.extend(other.not_found_routes);
    }

    /// 認証済みなら常に使えるルート (static + basic)
    pub fn constant_routes(&self) -> Vec<RouteNode> {
        self.static_routes
            .iter()
            .chain(self.basic_routes.iter())
            .cloned()
            .collect()
    }

    /// basic ルートの子 (メニューに常に出す部分)
    pub fn basic_children(&self) -> Vec<RouteNode> {
        self.basic_routes
            .iter()
            .flat_map(|r| r.children.iter().cloned())
            .collect()
    }

    /// 全グループを宣言順に並べたもの
    pub fn all_routes(&self) -> Vec<RouteNode> {
        self.static_routes
            .iter()
            .chain(&self.basic_routes)
            .chain(&self.async_routes)
            .chain(&self.not_found_routes)
            .cloned()
            .collect()
    }

    /// ルート名の一意性と、affix ルートが権限なしで到達できることを検証する
    pub fn validate(&self) -> Result<(), RouterError> {
        let all = self.all_routes();
        let mut seen = HashSet::new();
        let mut affix_routes: Vec<(String, &RouteNode)> = Vec::new();

        for (full_path, route) in flatten_routes(&all) {
            if let Some(name) = &route.name {
                if !seen.insert(name.clone()) {
                    return Err(RouterError::DuplicateRouteName(name.clone()));
                }
            }
            if route.meta.affix {
                affix_routes.push((full_path, route));
            }
        }

        for (full_path, route) in affix_routes {
            if is_gated(&route.meta) {
                return Err(RouterError::malformed(
                    route.label(),
                    format!("affix ルート {full_path} に権限 / ロール制限があります"),
                ));
            }
        }
        Ok(())
    }
}

fn is_gated(meta: &RouteMeta) -> bool {
    meta.required_permissions.as_ref().is_some_and(|p| !p.is_empty())
        || meta.required_roles.as_ref().is_some_and(|r| !r.is_empty())
}

/// バックエンド API から返るルート設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub id: String,
    pub name: String,
    pub path: String,
    /// `views/` 以下のコンポーネントパス (拡張子なし)
    pub component: String,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub meta: Option<RouteMeta>,
    #[serde(default)]
    pub children: Vec<RouteConfig>,
}

impl From<RouteConfig> for RouteNode {
    fn from(config: RouteConfig) -> Self {
        RouteNode {
            path: config.path,
            name: Some(config.name),
            redirect: config.redirect,
            component: Some(format!("@/views/{}.vue", config.component)),
            meta: config.meta.unwrap_or_default(),
            children: config.children.into_iter().map(RouteNode::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_groups_by_variable_name() {
        let parsed = ParsedRouteModule {
            source_file: PathBuf::from("routes.ts"),
            groups: vec![
                ("staticRoutes".into(), vec![RouteNode::new("/login", "Login")]),
                ("constantRoutes".into(), vec![RouteNode::new("/", "Root")]),
                ("asyncRoutes".into(), vec![RouteNode::new("/system", "System")]),
                ("extraRoutes".into(), vec![RouteNode::new("/extra", "Extra")]),
                ("notFoundRoute".into(), vec![RouteNode::new("/:any", "CatchAll")]),
            ],
        };
        let table = RouteTable::from_parsed(parsed);
        assert_eq!(table.static_routes.len(), 1);
        assert_eq!(table.basic_routes.len(), 1);
        assert_eq!(table.async_routes.len(), 2);
        assert_eq!(table.not_found_routes.len(), 1);
    }

    #[test]
    fn rejects_duplicate_names() {
        let table = RouteTable {
            basic_routes: vec![RouteNode::new("/", "Root")
                .with_children(vec![RouteNode::new("a", "Same"), RouteNode::new("b", "Same")])],
            ..RouteTable::default()
        };
        assert_eq!(
            table.validate(),
            Err(RouterError::DuplicateRouteName("Same".into()))
        );
    }

    #[test]
    fn rejects_gated_affix_route() {
        let table = RouteTable {
            async_routes: vec![RouteNode::new("/pinned", "Pinned").with_meta(RouteMeta {
                affix: true,
                required_roles: Some(vec!["admin".into()]),
                ..RouteMeta::default()
            })],
            ..RouteTable::default()
        };
        assert!(matches!(
            table.validate(),
            Err(RouterError::MalformedMeta { .. })
        ));
    }

    #[test]
    fn converts_backend_config() {
        let config: RouteConfig = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "System",
            "path": "/system",
            "component": "layout/index",
            "redirect": "/system/user",
            "children": [
                { "id": "2", "name": "SystemUser", "path": "user", "component": "system/user/index",
                  "meta": { "title": "menu.user", "requiredPermissions": ["system.user.view"] } }
            ]
        }))
        .unwrap();

        let node = RouteNode::from(config);
        assert_eq!(node.component.as_deref(), Some("@/views/layout/index.vue"));
        assert!(node.meta.requires_auth);
        assert_eq!(node.children[0].meta.title.as_deref(), Some("menu.user"));
    }

    #[test]
    fn json_table_defaults_requires_auth() {
        let table: RouteTable = serde_json::from_str(
            r#"{ "asyncRoutes": [ { "path": "/x", "name": "X", "meta": { "title": "x" } } ] }"#,
        )
        .unwrap();
        assert!(table.async_routes[0].meta.requires_auth);
        assert!(table.static_routes.is_empty());
    }
}
