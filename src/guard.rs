// src/guard.rs
use std::collections::BTreeMap;

use crate::config::NavigationSettings;
use crate::model::{Navigation, RouteNode};
use crate::permission::Session;
use crate::storage::KeyValueStore;
use crate::store::RouteStore;
use crate::tabs::TabStore;

/// ナビゲーション前チェックの結果
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// そのまま遷移してよい
    Proceed,
    /// 別のパスへ遷移し直す
    Redirect {
        path: String,
        query: BTreeMap<String, String>,
    },
    /// ルートを生成したので、これらを登録してから同じ遷移をやり直す
    Replay { routes: Vec<RouteNode> },
}

impl GuardOutcome {
    fn redirect(path: &str) -> Self {
        GuardOutcome::Redirect {
            path: path.to_string(),
            query: BTreeMap::new(),
        }
    }
}

/// ルート遷移ごとに認証・ルート生成・権限チェック・タブ追加を行う
#[derive(Debug, Clone, Default)]
pub struct NavigationGuard {
    settings: NavigationSettings,
}

impl NavigationGuard {
    pub fn new(settings: NavigationSettings) -> Self {
        NavigationGuard { settings }
    }

    pub async fn before_each<S: KeyValueStore>(
        &self,
        to: &Navigation,
        session: Option<&Session>,
        routes: &RouteStore,
        tabs: &mut TabStore<S>,
    ) -> GuardOutcome {
        if to.meta.requires_auth {
            // 1) 未ログインならログイン画面へ (戻り先をクエリに付ける)
            let Some(session) = session else {
                tracing::debug!("未ログインのためログインへ: {}", to.full_path);
                let mut query = BTreeMap::new();
                query.insert("redirect".to_string(), to.full_path.clone());
                return GuardOutcome::Redirect {
                    path: self.settings.login_path.clone(),
                    query,
                };
            };

            // 2) 初回だけ動的ルートを生成して、登録後にやり直してもらう
            if !routes.is_generated() {
                return match routes.generate_routes(session).await {
                    Ok(generated) => GuardOutcome::Replay { routes: generated },
                    Err(e) => {
                        tracing::error!("ルート生成に失敗: {e}");
                        GuardOutcome::redirect(&self.settings.forbidden_path)
                    }
                };
            }

            // 3) ルート単位の権限 / ロール (OR)
            if let Some(required) = &to.meta.required_permissions {
                if !required.is_empty() && !session.has_any_permission(required.as_slice()) {
                    return GuardOutcome::redirect(&self.settings.forbidden_path);
                }
            }
            if let Some(required) = &to.meta.required_roles {
                if !required.is_empty() && !session.has_any_role(required.as_slice()) {
                    return GuardOutcome::redirect(&self.settings.forbidden_path);
                }
            }
        }

        // 4) 名前付き・要認証・非表示でないルートはタブに載せる
        if to.name.is_some() && to.meta.requires_auth && !to.meta.hidden {
            tabs.add_or_update_tab(to);
        }

        GuardOutcome::Proceed
    }

    /// 遷移完了後: アクティブタブを合わせる
    pub fn after_each<S: KeyValueStore>(&self, to: &Navigation, tabs: &mut TabStore<S>) {
        tabs.set_active(&to.path);
    }
}
