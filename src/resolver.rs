// src/resolver.rs
use serde::Serialize;
use std::collections::HashSet;

use crate::model::RouteNode;

/// 親パス (`base_path`) を基準にしてルートの絶対パスを求める。
///
/// - 空のパス → 親パス (親も空なら "/")
/// - "/" 始まり → そのまま絶対パスとして扱う
/// - それ以外 → 親パスと結合し、連続する "/" を 1 つにまとめる
///
/// 例: `resolve_route_path("user", "/system")` → `"/system/user"`
pub fn resolve_route_path(path: &str, base_path: &str) -> String {
    if path.is_empty() {
        return if base_path.is_empty() {
            "/".to_string()
        } else {
            base_path.to_string()
        };
    }

    if path.starts_with('/') {
        return path.to_string();
    }

    let normalized_base = if base_path == "/" {
        ""
    } else {
        base_path.strip_suffix('/').unwrap_or(base_path)
    };
    let resolved = collapse_separators(&format!("{normalized_base}/{path}"));
    if resolved.starts_with('/') {
        resolved
    } else {
        format!("/{resolved}")
    }
}

fn collapse_separators(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_slash = false;
    for c in raw.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

/// ツリーを行きがけ順に平坦化し、各ノードの解決済みパスと組にして返す
pub fn flatten_routes(routes: &[RouteNode]) -> Vec<(String, &RouteNode)> {
    fn walk<'a>(routes: &'a [RouteNode], base: &str, out: &mut Vec<(String, &'a RouteNode)>) {
        for route in routes {
            let full = resolve_route_path(&route.path, base);
            out.push((full.clone(), route));
            walk(&route.children, &full, out);
        }
    }

    let mut out = Vec::new();
    walk(routes, "", &mut out);
    out
}

/// 解決済みパスでルートを検索
pub fn find_route_by_path<'a>(routes: &'a [RouteNode], path: &str) -> Option<&'a RouteNode> {
    flatten_routes(routes)
        .into_iter()
        .find(|(full, _)| full == path)
        .map(|(_, route)| route)
}

/// ルート名で検索
pub fn find_route_by_name<'a>(routes: &'a [RouteNode], name: &str) -> Option<&'a RouteNode> {
    flatten_routes(routes)
        .into_iter()
        .find(|(_, route)| route.name.as_deref() == Some(name))
        .map(|(_, route)| route)
}

/// 現在のルートツリーで有効な解決済みパスの集合
pub fn valid_route_paths(routes: &[RouteNode]) -> HashSet<String> {
    flatten_routes(routes)
        .into_iter()
        .map(|(full, _)| full)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
}

/// ルートからターゲットまでの祖先チェーンのうち、タイトルを持つものをパンくずとして返す。
/// 見つからなければ空。
pub fn breadcrumbs(routes: &[RouteNode], target: &str) -> Vec<Breadcrumb> {
    fn search(
        routes: &[RouteNode],
        base: &str,
        target: &str,
        trail: &mut Vec<Breadcrumb>,
    ) -> bool {
        for route in routes {
            let full = resolve_route_path(&route.path, base);
            let pushed = match &route.meta.title {
                Some(title) => {
                    trail.push(Breadcrumb {
                        label: title.clone(),
                        path: full.clone(),
                    });
                    true
                }
                None => false,
            };
            if full == target || search(&route.children, &full, target, trail) {
                return true;
            }
            if pushed {
                trail.pop();
            }
        }
        false
    }

    let mut trail = Vec::new();
    if search(routes, "", target, &mut trail) {
        trail
    } else {
        Vec::new()
    }
}

/// メニュー検索用のエントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub path: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// 非表示でなくタイトルを持つ全ルートを検索エントリとして列挙
pub fn search_entries(routes: &[RouteNode]) -> Vec<SearchEntry> {
    flatten_routes(routes)
        .into_iter()
        .filter(|(_, route)| !route.meta.hidden)
        .filter_map(|(path, route)| {
            route.meta.title.as_ref().map(|title| SearchEntry {
                path,
                title: title.clone(),
                icon: route.meta.icon.clone(),
            })
        })
        .collect()
}
