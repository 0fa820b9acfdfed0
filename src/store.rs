// src/store.rs
use parking_lot::RwLock;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::RouterError;
use crate::menu::build_menu;
use crate::model::{MenuItem, RouteNode};
use crate::permission::{accessible_menus, filter_routes, Session};
use crate::resolver::valid_route_paths;
use crate::table::RouteTable;

/// 1 セッション分の生成結果
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRoutes {
    /// 権限で絞り込んだ動的ルート (ナビゲーション層に登録する)
    pub routes: Vec<RouteNode>,
    /// basic ルートの子 + 動的ルートから作ったメニュー
    pub menu: Vec<MenuItem>,
}

/// ルートの有効化状態を持つストア。
///
/// 未生成 → 生成済み の一方向で、`reset` でのみ未生成に戻る。
/// 生成は single-flight で、並行に呼ばれても実際の生成は 1 回だけ行われ、
/// 後続の呼び出しは同じ結果を受け取る。
#[derive(Debug)]
pub struct RouteStore {
    table: Arc<RouteTable>,
    generated: RwLock<Option<Arc<GeneratedRoutes>>>,
    in_flight: Mutex<()>,
}

impl RouteStore {
    pub fn new(table: Arc<RouteTable>) -> Self {
        RouteStore {
            table,
            generated: RwLock::new(None),
            in_flight: Mutex::new(()),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn is_generated(&self) -> bool {
        self.generated.read().is_some()
    }

    fn snapshot(&self) -> Option<Arc<GeneratedRoutes>> {
        self.generated.read().clone()
    }

    /// ロール / 権限が手元にある場合の生成
    pub async fn generate_routes(&self, session: &Session) -> Result<Vec<RouteNode>, RouterError> {
        let session = session.clone();
        self.generate_routes_with(async move { Ok(session) }).await
    }

    /// セッション情報を非同期に解決してから生成する。
    ///
    /// 生成済みなら `session` は待たずに既存の結果を返す。
    /// フィルタが失敗した場合は未生成のまま戻るので、次のナビゲーションで再試行できる。
    pub async fn generate_routes_with<F>(&self, session: F) -> Result<Vec<RouteNode>, RouterError>
    where
        F: Future<Output = Result<Session, RouterError>>,
    {
        if let Some(done) = self.snapshot() {
            return Ok(done.routes.clone());
        }

        let _guard = self.in_flight.lock().await;
        // 待っている間に別の呼び出しが生成を終えているかもしれない
        if let Some(done) = self.snapshot() {
            tracing::debug!("実行中だった生成の結果を共有");
            return Ok(done.routes.clone());
        }

        let session = session.await?;
        let generated = self.build(&session)?;
        tracing::info!(
            "動的ルートを生成: {} 件 (メニュー {} 件)",
            generated.routes.len(),
            generated.menu.len()
        );

        let routes = generated.routes.clone();
        *self.generated.write() = Some(Arc::new(generated));
        Ok(routes)
    }

    fn build(&self, session: &Session) -> Result<GeneratedRoutes, RouterError> {
        // filter_routes は入力を借用して新しいツリーを返すので、静的テーブルは汚れない
        let accessed = filter_routes(&self.table.async_routes, session)?;

        let mut menu_source = self.table.basic_children();
        menu_source.extend(accessed.iter().cloned());

        Ok(GeneratedRoutes {
            menu: build_menu(&menu_source, ""),
            routes: accessed,
        })
    }

    /// 生成済みの動的ルート (コピー)。未生成なら空
    pub fn routes(&self) -> Vec<RouteNode> {
        self.snapshot()
            .map(|g| g.routes.clone())
            .unwrap_or_default()
    }

    /// 生成済みのメニュー (コピー)。未生成なら空
    pub fn menu_tree(&self) -> Vec<MenuItem> {
        self.snapshot().map(|g| g.menu.clone()).unwrap_or_default()
    }

    pub fn accessible_menus(&self, permissions: &[String]) -> Vec<MenuItem> {
        self.snapshot()
            .map(|g| accessible_menus(&g.menu, permissions))
            .unwrap_or_default()
    }

    /// static + basic + 生成済み動的ルート (affix の初期化や復元時の検証に使う)
    pub fn all_routes(&self) -> Vec<RouteNode> {
        let mut routes = self.table.constant_routes();
        routes.extend(self.routes());
        routes
    }

    /// 現時点で有効な解決済みパス
    pub fn valid_paths(&self) -> HashSet<String> {
        valid_route_paths(&self.all_routes())
    }

    /// ログアウト時に未生成へ戻す
    pub fn reset(&self) {
        tracing::debug!("ルート生成状態をリセット");
        *self.generated.write() = None;
    }
}
