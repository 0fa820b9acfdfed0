#![allow(dead_code)]

use admin_router_core::{RouteMeta, RouteNode, RouteTable};

pub fn meta(title: &str) -> RouteMeta {
    RouteMeta {
        title: Some(title.to_string()),
        ..RouteMeta::default()
    }
}

pub fn codes(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 管理画面の典型的な構成 (ログイン / ダッシュボード / システム管理)
pub fn admin_table() -> RouteTable {
    RouteTable {
        static_routes: vec![RouteNode::new("/login", "Login").with_meta(RouteMeta {
            requires_auth: false,
            hidden: true,
            ..meta("login.title")
        })],
        basic_routes: vec![RouteNode::new("/", "Root")
            .with_redirect("/dashboard")
            .with_meta(meta("Dashboard"))
            .with_children(vec![
                RouteNode::new("dashboard", "Dashboard").with_meta(RouteMeta {
                    affix: true,
                    order: Some(1),
                    icon: Some("DashboardOutlined".into()),
                    ..meta("menu.dashboard")
                }),
                RouteNode::new("profile", "Profile").with_meta(RouteMeta {
                    hidden: true,
                    ..meta("menu.profile")
                }),
            ])],
        async_routes: vec![
            RouteNode::new("/system", "System")
                .with_redirect("/system/user")
                .with_meta(RouteMeta {
                    order: Some(2),
                    ..meta("menu.system")
                })
                .with_children(vec![
                    RouteNode::new("user", "SystemUser").with_meta(RouteMeta {
                        required_permissions: Some(codes(&["system.user.view"])),
                        ..meta("menu.user")
                    }),
                    RouteNode::new("role", "SystemRole").with_meta(RouteMeta {
                        required_permissions: Some(codes(&["system.role.view"])),
                        ..meta("menu.role")
                    }),
                ]),
            RouteNode::new("/reports", "Reports")
                .with_meta(RouteMeta {
                    required_roles: Some(codes(&["auditor"])),
                    ..meta("menu.reports")
                })
                .with_children(vec![RouteNode::new("daily", "ReportsDaily")
                    .with_meta(meta("menu.daily"))]),
        ],
        not_found_routes: Vec::new(),
    }
}
