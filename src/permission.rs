// src/permission.rs
use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::model::{MenuItem, RouteNode};

/// 全権限を表すセンチネル
pub const ALL_PERMISSIONS: &str = "*";

/// 現在のログインセッションが持つロール / 権限コード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Session {
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Session {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_all_permission_marker(&self) -> bool {
        self.permissions.iter().any(|p| p == ALL_PERMISSIONS)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.has_all_permission_marker() || self.permissions.iter().any(|p| p == permission)
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().any(|p| self.has_permission(p.as_ref()))
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().all(|p| self.has_permission(p.as_ref()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().all(|r| self.has_role(r.as_ref()))
    }
}

fn ensure_codes(route: &RouteNode, kind: &str, codes: &[String]) -> Result<(), RouterError> {
    if codes.iter().any(|c| c.trim().is_empty()) {
        return Err(RouterError::malformed(
            route.label(),
            format!("{kind} に空のコードが含まれています"),
        ));
    }
    Ok(())
}

/// 判定関数 `keep` でツリーを刈り込む。入力は変更せず、常に新しいツリーを返す。
///
/// 子を先にフィルタし、元々子を持っていた redirect ノードの子が全滅した場合は
/// 親ごと落とす (空のメニューグループを作らない)。
fn prune<F>(nodes: &[RouteNode], keep: &F) -> Result<Vec<RouteNode>, RouterError>
where
    F: Fn(&RouteNode) -> Result<bool, RouterError>,
{
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !keep(node)? {
            tracing::debug!("ルート '{}' を除外", node.label());
            continue;
        }

        let children = prune(&node.children, keep)?;
        if !node.children.is_empty() && children.is_empty() && node.redirect.is_some() {
            tracing::debug!("子が残らなかったグループ '{}' を除外", node.label());
            continue;
        }

        out.push(RouteNode {
            path: node.path.clone(),
            name: node.name.clone(),
            redirect: node.redirect.clone(),
            component: node.component.clone(),
            meta: node.meta.clone(),
            children,
        });
    }
    Ok(out)
}

/// 権限コードでルートツリーをフィルタする。
///
/// `requiredPermissions` のいずれか 1 つを持っていれば残す (OR)。
/// 未指定 / 空リストは無条件で通過。`"*"` を持つセッションは判定自体を省略する。
pub fn filter_by_permission(
    nodes: &[RouteNode],
    permissions: &[String],
) -> Result<Vec<RouteNode>, RouterError> {
    let has_all = permissions.iter().any(|p| p == ALL_PERMISSIONS);
    prune(nodes, &|node: &RouteNode| {
        if has_all {
            return Ok(true);
        }
        match &node.meta.required_permissions {
            Some(required) if !required.is_empty() => {
                ensure_codes(node, "requiredPermissions", required)?;
                Ok(required.iter().any(|r| permissions.contains(r)))
            }
            _ => Ok(true),
        }
    })
}

/// ロールコードでルートツリーをフィルタする (OR / 未指定は通過)
pub fn filter_by_role(nodes: &[RouteNode], roles: &[String]) -> Result<Vec<RouteNode>, RouterError> {
    prune(nodes, &|node: &RouteNode| match &node.meta.required_roles {
        Some(required) if !required.is_empty() => {
            ensure_codes(node, "requiredRoles", required)?;
            Ok(required.iter().any(|r| roles.contains(r)))
        }
        _ => Ok(true),
    })
}

/// 権限フィルタ → ロールフィルタの順に適用 (両方を通過したノードだけが残る)
pub fn filter_routes(nodes: &[RouteNode], session: &Session) -> Result<Vec<RouteNode>, RouterError> {
    let accessed = filter_by_permission(nodes, &session.permissions)?;
    filter_by_role(&accessed, &session.roles)
}

/// 単一ルートの権限チェック (子は見ない)
pub fn has_route_permission(route: &RouteNode, permissions: &[String]) -> bool {
    if permissions.iter().any(|p| p == ALL_PERMISSIONS) {
        return true;
    }
    match &route.meta.required_permissions {
        Some(required) if !required.is_empty() => required.iter().any(|r| permissions.contains(r)),
        _ => true,
    }
}

/// 構築済みメニューツリーを権限コードで絞り込み、新しいツリーを返す
pub fn accessible_menus(menus: &[MenuItem], permissions: &[String]) -> Vec<MenuItem> {
    let has_all = permissions.iter().any(|p| p == ALL_PERMISSIONS);
    menus
        .iter()
        .filter(|menu| {
            has_all
                || match &menu.required_permissions {
                    Some(required) if !required.is_empty() => {
                        required.iter().any(|r| permissions.contains(r))
                    }
                    _ => true,
                }
        })
        .map(|menu| MenuItem {
            children: menu
                .children
                .as_ref()
                .map(|children| accessible_menus(children, permissions)),
            ..menu.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteMeta;

    fn gated(path: &str, name: &str, permissions: &[&str]) -> RouteNode {
        RouteNode::new(path, name).with_meta(RouteMeta {
            required_permissions: Some(permissions.iter().map(|p| p.to_string()).collect()),
            ..RouteMeta::default()
        })
    }

    fn role_gated(path: &str, name: &str, roles: &[&str]) -> RouteNode {
        RouteNode::new(path, name).with_meta(RouteMeta {
            required_roles: Some(roles.iter().map(|r| r.to_string()).collect()),
            ..RouteMeta::default()
        })
    }

    fn codes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn tree() -> Vec<RouteNode> {
        vec![
            RouteNode::new("/system", "System")
                .with_redirect("/system/user")
                .with_children(vec![
                    gated("user", "SystemUser", &["user.view", "user.edit"]),
                    gated("admin", "SystemAdmin", &["admin.only"]),
                ]),
            RouteNode::new("/open", "Open"),
        ]
    }

    #[test]
    fn any_required_permission_is_enough() {
        let out = filter_by_permission(&tree(), &codes(&["user.view"])).unwrap();
        let names: Vec<_> = out[0].children.iter().map(|c| c.label()).collect();
        assert_eq!(names, vec!["SystemUser"]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn wildcard_is_identity() {
        let routes = tree();
        let out = filter_by_permission(&routes, &codes(&["*"])).unwrap();
        assert_eq!(out, routes);
    }

    #[test]
    fn empty_redirect_group_is_dropped() {
        let out = filter_by_permission(&tree(), &codes(&["nothing"])).unwrap();
        let names: Vec<_> = out.iter().map(|c| c.label()).collect();
        assert_eq!(names, vec!["Open"]);
    }

    #[test]
    fn grouping_without_redirect_survives_empty() {
        let routes = vec![RouteNode::new("/group", "Group")
            .with_children(vec![gated("x", "X", &["x"])])];
        let out = filter_by_permission(&routes, &codes(&[])).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].children.is_empty());
    }

    #[test]
    fn empty_requirement_list_is_implicit_allow() {
        let routes = vec![gated("/free", "Free", &[])];
        assert_eq!(filter_by_permission(&routes, &codes(&[])).unwrap().len(), 1);
    }

    #[test]
    fn blank_codes_are_malformed() {
        let routes = vec![gated("/bad", "Bad", &["  "])];
        let err = filter_by_permission(&routes, &codes(&["x"])).unwrap_err();
        assert!(matches!(err, RouterError::MalformedMeta { .. }));
    }

    #[test]
    fn both_gates_must_pass() {
        let mut node = gated("/both", "Both", &["p"]);
        node.meta.required_roles = Some(codes(&["admin"]));
        let routes = vec![node, role_gated("/editor", "Editor", &["editor"])];

        let admin = Session::new(["admin"], ["p"]);
        let names: Vec<_> = filter_routes(&routes, &admin)
            .unwrap()
            .iter()
            .map(|r| r.label().to_string())
            .collect();
        assert_eq!(names, vec!["Both"]);

        let no_perm = Session::new(["admin", "editor"], Vec::<String>::new());
        let names: Vec<_> = filter_routes(&routes, &no_perm)
            .unwrap()
            .iter()
            .map(|r| r.label().to_string())
            .collect();
        assert_eq!(names, vec!["Editor"]);
    }

    #[test]
    fn source_tree_is_not_modified() {
        let routes = tree();
        let before = routes.clone();
        let _ = filter_by_permission(&routes, &codes(&[])).unwrap();
        assert_eq!(routes, before);
    }

    #[test]
    fn session_checks() {
        let session = Session::new(["admin"], ["user.view"]);
        assert!(session.has_permission("user.view"));
        assert!(!session.has_all_permissions(&["user.view", "user.edit"]));
        assert!(session.has_any_permission(&["user.view", "user.edit"]));
        assert!(session.has_all_roles(&["admin"]));
        assert!(!session.has_any_role(&["editor"]));

        let root = Session::new(Vec::<String>::new(), ["*"]);
        assert!(root.has_all_permissions(&["anything", "else"]));
    }

    #[test]
    fn menu_filter_keeps_ungated_items() {
        let menus = vec![MenuItem {
            id: "System".into(),
            label: "System".into(),
            icon: None,
            path: "/system".into(),
            badge: None,
            required_permissions: None,
            required_roles: None,
            children: Some(vec![MenuItem {
                id: "SystemUser".into(),
                label: "User".into(),
                icon: None,
                path: "/system/user".into(),
                badge: None,
                required_permissions: Some(codes(&["user.view"])),
                required_roles: None,
                children: None,
            }]),
        }];

        let filtered = accessible_menus(&menus, &codes(&["other"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].children.as_ref().map(Vec::len), Some(0));
        assert_eq!(accessible_menus(&menus, &codes(&["*"])), menus);
    }
}
