// src/main.rs

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use admin_router_core::menu::{localize_menu, TitleCatalog};
use admin_router_core::parser::parse_routes_in_file;
use admin_router_core::resolver::find_route_by_path;
use admin_router_core::tabs::PersistedTabs;
use admin_router_core::{
    AppConfig, FileStorage, GuardOutcome, Navigation, NavigationGuard, RouteStore, RouteTable,
    Session, TabStore,
};

/// CLI 引数定義
#[derive(Parser, Debug)]
#[command(
    name = "admin-router",
    version = "0.1.0",
    about = "管理画面のルート定義から権限別メニューとタブ状態を生成する CLI ツール"
)]
struct Cli {
    /// 設定ファイル (TOML)。無ければ既定値
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// プロジェクト内の routes.ts を探してルートテーブルを JSON 出力
    Scan {
        /// 例: `--project-root C:/path/to/admin-project`
        #[arg(short = 'r', long = "project-root", value_name = "DIR")]
        project_root: PathBuf,
    },
    /// セッションの権限でメニューを生成して JSON 出力
    Menu {
        #[command(flatten)]
        session: SessionArgs,
        /// 翻訳テーブル (JSON)。指定するとラベルを翻訳する
        #[arg(short = 'm', long = "messages", value_name = "FILE")]
        messages: Option<PathBuf>,
    },
    /// 保存済みタブ状態を復元し、指定パスへ順に遷移した結果を保存・出力
    Tabs {
        #[command(flatten)]
        session: SessionArgs,
        /// タブ状態を保存する JSON ファイル
        #[arg(short = 's', long = "storage", value_name = "FILE")]
        storage: PathBuf,
        /// 遷移するパス (複数可)
        #[arg(long = "visit", value_name = "PATH")]
        visits: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// ルート定義ファイル (.json / .ts)
    #[arg(short = 'f', long = "routes", value_name = "FILE")]
    routes: PathBuf,
    /// 権限コード (複数可, "*" で全権限)
    #[arg(short = 'p', long = "permission", value_name = "CODE")]
    permissions: Vec<String>,
    /// ロールコード (複数可)
    #[arg(long = "role", value_name = "CODE")]
    roles: Vec<String>,
}

impl SessionArgs {
    fn session(&self) -> Session {
        Session::new(self.roles.clone(), self.permissions.clone())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1) CLI 引数と設定ファイル
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;

    match cli.command {
        Command::Scan { project_root } => {
            let table = scan_project(&project_root)?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Command::Menu { session, messages } => {
            let store = RouteStore::new(Arc::new(RouteTable::load(&session.routes)?));
            runtime.block_on(store.generate_routes(&session.session()))?;

            let mut menu = store.menu_tree();
            if let Some(messages) = messages {
                menu = localize_menu(&menu, &TitleCatalog::from_json_file(&messages)?);
            }
            println!("{}", serde_json::to_string_pretty(&menu)?);
        }
        Command::Tabs {
            session,
            storage,
            visits,
        } => {
            let store = RouteStore::new(Arc::new(RouteTable::load(&session.routes)?));
            let current = session.session();
            runtime.block_on(store.generate_routes(&current))?;

            let mut tabs = TabStore::new(FileStorage::open(&storage)?, &config);
            let all_routes = store.all_routes();
            tabs.initialize(&all_routes);

            let guard = NavigationGuard::new(config.navigation.clone());
            for path in visits {
                let Some(route) = find_route_by_path(&all_routes, &path) else {
                    tracing::warn!("ルートが見つからないのでスキップ: {path}");
                    continue;
                };
                let nav = Navigation::to(
                    path.clone(),
                    route.name.clone().unwrap_or_else(|| path.clone()),
                    route.meta.clone(),
                );
                match runtime.block_on(guard.before_each(&nav, Some(&current), &store, &mut tabs)) {
                    GuardOutcome::Proceed => guard.after_each(&nav, &mut tabs),
                    other => tracing::warn!("{path} への遷移は中断: {other:?}"),
                }
            }

            let state = PersistedTabs {
                tabs: tabs.tabs().to_vec(),
                active_tab_path: tabs.active_tab_path().unwrap_or_default().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

/// WalkDir で全ファイルを再帰的に探索し、routes.ts / *.routes.ts を解析してマージする
fn scan_project(project_root: &Path) -> Result<RouteTable, Box<dyn std::error::Error>> {
    let project_dir = project_root.canonicalize()?; // 絶対化

    let mut routing_paths: Vec<PathBuf> = WalkDir::new(&project_dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|fname| fname == "routes.ts" || fname.ends_with(".routes.ts"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    // ルーティングファイルが見つからなければエラー
    if routing_paths.is_empty() {
        return Err(format!("ルーティングファイルが見つかりませんでした: {:?}", project_dir).into());
    }
    routing_paths.sort();

    let mut table = RouteTable::default();
    for routing_path in routing_paths {
        tracing::info!("解析中: {:?}", routing_path);
        table.merge(RouteTable::from_parsed(parse_routes_in_file(&routing_path)?));
    }
    table.validate()?;
    Ok(table)
}
