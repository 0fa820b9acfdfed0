// src/lib.rs
//! 管理画面向けのルート権限フィルタ・メニュー生成・タブ状態管理。

pub mod config;
pub mod error;
pub mod guard;
pub mod menu;
pub mod model;
pub mod parser;
pub mod permission;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod table;
pub mod tabs;

pub use config::AppConfig;
pub use error::RouterError;
pub use guard::{GuardOutcome, NavigationGuard};
pub use model::{Badge, MenuItem, Navigation, RouteMeta, RouteNode, Tab};
pub use permission::Session;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use store::RouteStore;
pub use table::RouteTable;
pub use tabs::{RefreshTicket, TabStore};
