mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use test_log::test;

use admin_router_core::{
    AppConfig, GuardOutcome, MemoryStorage, Navigation, NavigationGuard, RouteStore, RouteTable,
    RouterError, Session, TabStore,
};
use common::{admin_table, codes, meta};

#[test(tokio::test)]
async fn concurrent_generation_runs_once() {
    let store = RouteStore::new(Arc::new(admin_table()));
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let resolve = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, RouterError>(Session::new(["admin"], ["*"]))
    };

    let (first, second) = tokio::join!(
        store.generate_routes_with(resolve()),
        store.generate_routes_with(resolve())
    );

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(first.unwrap(), second.unwrap());
    assert!(store.is_generated());
}

#[test(tokio::test)]
async fn malformed_meta_keeps_store_retryable() {
    let mut table = admin_table();
    table.async_routes[0].children[0].meta.required_permissions = Some(codes(&[""]));
    let store = RouteStore::new(Arc::new(table));

    let err = store
        .generate_routes(&Session::new(["admin"], ["system.role.view"]))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::MalformedMeta { .. }));
    assert!(!store.is_generated());
    assert!(store.routes().is_empty());
}

#[test(tokio::test)]
async fn role_gate_applies_after_permission_gate() {
    let store = RouteStore::new(Arc::new(admin_table()));
    let routes = store
        .generate_routes(&Session::new(["viewer"], ["system.user.view"]))
        .await
        .unwrap();

    let names: Vec<_> = routes.iter().map(|r| r.label().to_string()).collect();
    assert_eq!(names, vec!["System"]);
    assert_eq!(routes[0].children.len(), 1);

    let paths: Vec<_> = store.menu_tree().into_iter().map(|m| m.path).collect();
    assert_eq!(paths, vec!["/dashboard", "/system"]);
    assert!(store.valid_paths().contains("/system/user"));
    assert!(!store.valid_paths().contains("/reports/daily"));
}

#[test(tokio::test)]
async fn guard_walks_login_generation_and_permission_checks() {
    let store = RouteStore::new(Arc::new(admin_table()));
    let mut tabs = TabStore::new(MemoryStorage::new(), &AppConfig::default());
    let guard = NavigationGuard::new(AppConfig::default().navigation);

    let mut role_meta = meta("menu.role");
    role_meta.required_permissions = Some(codes(&["system.role.view"]));
    let to_role = Navigation::to("/system/role", "SystemRole", role_meta);

    // 未ログイン
    match guard.before_each(&to_role, None, &store, &mut tabs).await {
        GuardOutcome::Redirect { path, query } => {
            assert_eq!(path, "/login");
            assert_eq!(query.get("redirect").map(String::as_str), Some("/system/role"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // 初回はルート生成してやり直し
    let session = Session::new(["admin"], ["system.user.view"]);
    let outcome = guard
        .before_each(&to_role, Some(&session), &store, &mut tabs)
        .await;
    assert!(matches!(outcome, GuardOutcome::Replay { .. }));

    // 権限不足
    let outcome = guard
        .before_each(&to_role, Some(&session), &store, &mut tabs)
        .await;
    assert_eq!(
        outcome,
        GuardOutcome::Redirect {
            path: "/403".into(),
            query: Default::default()
        }
    );
    assert!(tabs.tabs().is_empty());

    // 許可されたルートはタブに追加される
    let mut user_meta = meta("menu.user");
    user_meta.required_permissions = Some(codes(&["system.user.view"]));
    let to_user = Navigation::to("/system/user", "SystemUser", user_meta);
    let outcome = guard
        .before_each(&to_user, Some(&session), &store, &mut tabs)
        .await;
    assert_eq!(outcome, GuardOutcome::Proceed);
    guard.after_each(&to_user, &mut tabs);
    assert_eq!(tabs.active_tab_path(), Some("/system/user"));
}

#[test(tokio::test)]
async fn guard_sends_failed_generation_to_forbidden_and_retries() {
    let mut broken = admin_table();
    broken.async_routes[0].children[1].meta.required_permissions = Some(codes(&[""]));
    let store = RouteStore::new(Arc::new(broken));
    let mut tabs = TabStore::new(MemoryStorage::new(), &AppConfig::default());
    let guard = NavigationGuard::new(AppConfig::default().navigation);

    let session = Session::new(["admin"], ["system.user.view"]);
    let to_user = Navigation::to("/system/user", "SystemUser", meta("menu.user"));

    let outcome = guard
        .before_each(&to_user, Some(&session), &store, &mut tabs)
        .await;
    assert_eq!(
        outcome,
        GuardOutcome::Redirect {
            path: "/403".into(),
            query: Default::default()
        }
    );
    assert!(!store.is_generated());
    assert!(tabs.tabs().is_empty());

    // 定義を直したストアでは次の遷移で生成してやり直しになる
    let fixed = RouteStore::new(Arc::new(admin_table()));
    let outcome = guard
        .before_each(&to_user, Some(&session), &fixed, &mut tabs)
        .await;
    match outcome {
        GuardOutcome::Replay { routes } => {
            assert_eq!(routes[0].name.as_deref(), Some("System"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(fixed.is_generated());
    assert_eq!(
        guard
            .before_each(&to_user, Some(&session), &fixed, &mut tabs)
            .await,
        GuardOutcome::Proceed
    );
}

#[test(tokio::test)]
async fn loads_typescript_route_module() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("routes.ts");
    fs::write(
        &path,
        r#"
export const staticRoutes = [
  { path: '/login', name: 'Login', meta: { title: 'login.title', requiresAuth: false, hidden: true } }
]
export const basicRoutes = [
  {
    path: '/',
    name: 'Root',
    redirect: '/dashboard',
    children: [
      { path: 'dashboard', name: 'Dashboard', meta: { title: 'menu.dashboard', affix: true, order: 1 } }
    ]
  }
]
export const asyncRoutes = [
  {
    path: '/demos',
    name: 'Demos',
    redirect: '/demos/table',
    meta: { title: 'menu.demos', order: 3 },
    children: [
      { path: 'table', name: 'DemosTable', meta: { title: 'menu.table' } },
      { path: 'vite', name: 'DemosVite', meta: { title: 'menu.vite', externalLink: 'https://vite.dev' } }
    ]
  }
]
"#,
    )
    .unwrap();

    let table = RouteTable::load(&path).unwrap();
    assert_eq!(table.static_routes.len(), 1);
    assert_eq!(table.basic_routes.len(), 1);

    let store = RouteStore::new(Arc::new(table));
    store
        .generate_routes(&Session::new(Vec::<String>::new(), Vec::<String>::new()))
        .await
        .unwrap();
    let menu = store.menu_tree();
    let demos = menu[1].children.as_ref().unwrap();
    assert_eq!(demos[0].path, "/demos/table");
    assert_eq!(demos[1].path, "https://vite.dev");
}

#[test]
fn unknown_route_file_extension_is_rejected() {
    let err = RouteTable::load(std::path::Path::new("routes.yaml")).unwrap_err();
    assert!(matches!(err, RouterError::Config(_)));
}
