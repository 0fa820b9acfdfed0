// src/tabs.rs
//! 開いているタブの一覧とアクティブタブを管理するストア。
//!
//! 変更のたびに `{tabs, activeTabPath}` をキー・バリューストアへ書き出し
//! (「タブ状態を記憶する」が有効な場合のみ)、次回起動時に現在のルートツリーと
//! 突き合わせて復元する。
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AppConfig;
use crate::model::{Navigation, RouteNode, Tab};
use crate::resolver::flatten_routes;
use crate::storage::KeyValueStore;

/// ストアに保存する形式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTabs {
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub active_tab_path: String,
}

/// ストレージラッパーの `{ value, expire }` 形式 (expire はミリ秒の UNIX 時刻)
#[derive(Debug, Deserialize)]
struct WrappedValue {
    value: PersistedTabs,
    #[serde(default)]
    expire: Option<u64>,
}

/// タブ再読み込みの受付票。
///
/// ナビゲーション層は `redirect_path` に遷移してから元のパスに戻り、
/// ビューが作り直されたら `acknowledge_remount` に渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub id: u64,
    /// keep-alive から一時的に外したキャッシュキー
    pub name: String,
    pub path: String,
    pub redirect_path: String,
}

#[derive(Debug)]
pub struct TabStore<S: KeyValueStore> {
    storage: S,
    storage_key: String,
    remember_key: String,
    redirect_prefix: String,
    remember: bool,
    tabs: Vec<Tab>,
    active_tab_path: Option<String>,
    /// 再読み込み中のキャッシュキー → 最新の受付票 ID
    excluded: HashMap<String, u64>,
    next_ticket: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// 保存済みの文字列を読み取る。壊れていれば None (呼び出し側には投げない)
fn decode_persisted(raw: &str) -> Option<PersistedTabs> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("保存済みタブ状態を解析できないので無視: {e}");
            return None;
        }
    };

    let wrapped = value.get("value").is_some();
    let decoded = if wrapped {
        serde_json::from_value::<WrappedValue>(value).map(|w| match w.expire {
            Some(expire) if now_millis() > expire => {
                tracing::debug!("保存済みタブ状態は期限切れ");
                None
            }
            _ => Some(w.value),
        })
    } else {
        serde_json::from_value::<PersistedTabs>(value).map(Some)
    };

    decoded.unwrap_or_else(|e| {
        tracing::warn!("保存済みタブ状態の形式が不正なので無視: {e}");
        None
    })
}

impl<S: KeyValueStore> TabStore<S> {
    pub fn new(storage: S, config: &AppConfig) -> Self {
        // 保存値が "false" のときだけ無効。未保存なら設定ファイルの既定値
        let remember = match storage.get(&config.tabs.remember_key) {
            Some(saved) => saved != "false",
            None => config.tabs.remember_state,
        };
        TabStore {
            storage,
            storage_key: config.tabs.storage_key.clone(),
            remember_key: config.tabs.remember_key.clone(),
            redirect_prefix: config.navigation.redirect_prefix.clone(),
            remember,
            tabs: Vec::new(),
            active_tab_path: None,
            excluded: HashMap::new(),
            next_ticket: 1,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_tab_path(&self) -> Option<&str> {
        self.active_tab_path.as_deref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        let active = self.active_tab_path.as_deref()?;
        self.tabs.iter().find(|t| t.path == active)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn remember_tab_state(&self) -> bool {
        self.remember
    }

    /// 「タブ状態を記憶する」を切り替える。有効にしたら現在の状態をすぐ保存する
    pub fn set_remember_tab_state(&mut self, enabled: bool) {
        self.remember = enabled;
        if let Err(e) = self.storage.set(&self.remember_key, enabled.to_string()) {
            tracing::warn!("タブ記憶設定を保存できません: {e}");
        }
        if enabled {
            self.persist();
        }
    }

    /// keep-alive の include に渡すキャッシュキー。再読み込み中のものは除く
    pub fn cached_tabs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tabs
            .iter()
            .filter(|t| !self.excluded.contains_key(&t.name))
            .filter(|t| seen.insert(t.name.clone()))
            .map(|t| t.name.clone())
            .collect()
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.path == path)
    }

    /// 閉じられたタブの再読み込みは完了通知が来ないので、残っているタブの分だけ残す
    fn forget_closed_refreshes(&mut self) {
        let tabs = &self.tabs;
        self.excluded
            .retain(|name, _| tabs.iter().any(|t| &t.name == name));
    }

    fn persist(&mut self) {
        if !self.remember {
            return;
        }
        let state = PersistedTabs {
            tabs: self.tabs.clone(),
            active_tab_path: self.active_tab_path.clone().unwrap_or_default(),
        };
        let json = match serde_json::to_string(&state) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("タブ状態をシリアライズできません: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.storage_key, json) {
            tracing::warn!("タブ状態を保存できません: {e}");
        }
    }

    /// アクティブタブが消えていたら `preferred`、無ければ先頭のタブに付け替える
    fn heal_active(&mut self, preferred: Option<&str>) {
        let alive = |path: &str| self.tabs.iter().any(|t| t.path == path);
        if self.active_tab_path.as_deref().is_some_and(alive) {
            return;
        }
        self.active_tab_path = preferred
            .filter(|p| alive(*p))
            .map(str::to_string)
            .or_else(|| self.tabs.first().map(|t| t.path.clone()));
    }

    /// ナビゲーションのたびに呼ぶ。同じパスのタブがあれば表示情報を更新し、無ければ追加する
    pub fn add_or_update_tab(&mut self, nav: &Navigation) {
        if nav.meta.hidden {
            return;
        }

        let name = nav.name.clone().unwrap_or_else(|| nav.path.clone());
        let title = nav.meta.title.clone().unwrap_or_else(|| name.clone());

        match self.position(&nav.path) {
            Some(index) => {
                let tab = &mut self.tabs[index];
                tab.id = nav.full_path.clone();
                tab.name = name;
                tab.title = title;
                tab.icon = nav.meta.icon.clone();
                tab.full_path = nav.full_path.clone();
                tab.query = nav.query.clone();
                tab.params = nav.params.clone();
            }
            None => {
                tracing::debug!("タブを追加: {}", nav.full_path);
                self.tabs.push(Tab {
                    id: nav.full_path.clone(),
                    name,
                    title,
                    icon: nav.meta.icon.clone(),
                    path: nav.path.clone(),
                    full_path: nav.full_path.clone(),
                    query: nav.query.clone(),
                    params: nav.params.clone(),
                    closable: !nav.meta.affix,
                    pinned: false,
                    affix: nav.meta.affix,
                });
            }
        }

        self.active_tab_path = Some(nav.path.clone());
        self.persist();
    }

    /// 既存タブだけをアクティブにできる
    pub fn set_active(&mut self, path: &str) {
        if self.position(path).is_none() {
            return;
        }
        self.active_tab_path = Some(path.to_string());
        self.persist();
    }

    /// 固定タブ (affix / pinned) と存在しないパスは何もしない
    pub fn close_tab(&mut self, path: &str) {
        let Some(index) = self.position(path) else {
            return;
        };
        if self.tabs[index].is_fixed() {
            return;
        }

        self.tabs.remove(index);
        self.forget_closed_refreshes();

        if self.active_tab_path.as_deref() == Some(path) {
            // 同じ位置に詰めてきたタブ → 1 つ前 → なし
            let next = self
                .tabs
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.tabs.get(i)));
            self.active_tab_path = next.map(|t| t.path.clone());
        }
        self.persist();
    }

    fn retain_indexed<F>(&mut self, keep: F)
    where
        F: Fn(usize, &Tab) -> bool,
    {
        let mut index = 0;
        self.tabs.retain(|tab| {
            let keep_it = tab.is_fixed() || keep(index, tab);
            index += 1;
            keep_it
        });
        self.forget_closed_refreshes();
    }

    /// 指定タブと固定タブ以外を閉じる
    pub fn close_others(&mut self, path: &str) {
        self.retain_indexed(|_, tab| tab.path == path);
        self.heal_active(Some(path));
        self.persist();
    }

    /// 固定タブ以外をすべて閉じる
    pub fn close_all(&mut self) {
        self.retain_indexed(|_, _| false);
        self.heal_active(None);
        self.persist();
    }

    /// 指定タブより左の (固定でない) タブを閉じる
    pub fn close_left(&mut self, path: &str) {
        let Some(target) = self.position(path) else {
            return;
        };
        self.retain_indexed(|i, _| i >= target);
        self.heal_active(None);
        self.persist();
    }

    /// 指定タブより右の (固定でない) タブを閉じる
    pub fn close_right(&mut self, path: &str) {
        let Some(target) = self.position(path) else {
            return;
        };
        self.retain_indexed(|i, _| i <= target);
        self.heal_active(None);
        self.persist();
    }

    /// ピン留めを切り替える。affix タブは対象外
    pub fn toggle_pin(&mut self, path: &str) {
        let Some(index) = self.position(path) else {
            return;
        };
        let tab = &mut self.tabs[index];
        if tab.affix {
            return;
        }
        tab.pinned = !tab.pinned;
        tab.refresh_closable();
        self.persist();
    }

    /// ビューを作り直すための受付票を発行し、キャッシュキーを keep-alive から外す。
    ///
    /// 完了前にもう一度呼ばれた場合は新しい受付票だけが有効になる。
    pub fn refresh(&mut self, path: &str) -> Option<RefreshTicket> {
        let tab = self.tabs.iter().find(|t| t.path == path)?;
        let ticket = RefreshTicket {
            id: self.next_ticket,
            name: tab.name.clone(),
            path: tab.path.clone(),
            redirect_path: format!(
                "{}/{}",
                self.redirect_prefix.trim_end_matches('/'),
                tab.full_path.trim_start_matches('/')
            ),
        };
        self.next_ticket += 1;
        self.excluded.insert(ticket.name.clone(), ticket.id);
        tracing::debug!("タブを再読み込み: {} (ticket {})", ticket.path, ticket.id);
        Some(ticket)
    }

    /// ビューの再生成完了を受け取り、キャッシュキーを戻す。
    /// 古い受付票なら何もせず false
    pub fn acknowledge_remount(&mut self, ticket: &RefreshTicket) -> bool {
        if self.excluded.get(&ticket.name) == Some(&ticket.id) {
            self.excluded.remove(&ticket.name);
            true
        } else {
            tracing::debug!("古い再読み込み受付票を無視: {}", ticket.id);
            false
        }
    }

    /// 保存済みの状態を読み込み、現在のルートツリーに存在するタブだけを残す。
    /// 残ったタブの数を返す。
    pub fn restore(&mut self, routes: &[RouteNode]) -> usize {
        if !self.remember {
            return 0;
        }
        let Some(raw) = self.storage.get(&self.storage_key) else {
            return 0;
        };
        let Some(persisted) = decode_persisted(&raw) else {
            return 0;
        };

        let mut live: HashMap<String, &RouteNode> = HashMap::new();
        for (full_path, route) in flatten_routes(routes) {
            live.entry(full_path).or_insert(route);
        }

        let mut seen = HashSet::new();
        let mut survivors = Vec::new();
        for mut tab in persisted.tabs {
            let Some(route) = live.get(&tab.path) else {
                tracing::debug!("存在しないルートのタブを破棄: {}", tab.path);
                continue;
            };
            if !seen.insert(tab.path.clone()) {
                continue;
            }
            tab.affix = route.meta.affix;
            if tab.affix {
                tab.pinned = false;
            }
            tab.refresh_closable();
            survivors.push(tab);
        }

        if survivors.is_empty() {
            return 0;
        }

        let count = survivors.len();
        self.tabs = survivors;
        self.active_tab_path = None;
        self.heal_active(Some(persisted.active_tab_path.as_str()));
        self.persist();
        count
    }

    /// タブが 1 つも無いとき、ルートツリーの affix ルートを固定タブとして並べる
    pub fn init_affix_tabs(&mut self, routes: &[RouteNode]) {
        if !self.tabs.is_empty() {
            return;
        }

        for (full_path, route) in flatten_routes(routes) {
            if !route.meta.affix || self.position(&full_path).is_some() {
                continue;
            }
            let name = route.name.clone().unwrap_or_else(|| full_path.clone());
            self.tabs.push(Tab {
                id: full_path.clone(),
                title: route.meta.title.clone().unwrap_or_else(|| name.clone()),
                name,
                icon: route.meta.icon.clone(),
                path: full_path.clone(),
                full_path,
                query: Default::default(),
                params: Default::default(),
                closable: false,
                pinned: false,
                affix: true,
            });
        }

        self.heal_active(None);
        self.persist();
    }

    /// 起動時の初期化: 復元 → 何も残らなければ affix タブで埋める
    pub fn initialize(&mut self, routes: &[RouteNode]) {
        if self.restore(routes) == 0 {
            self.init_affix_tabs(routes);
        }
    }
}
