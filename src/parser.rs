// src/parser.rs
use swc_common::{sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::*;
use swc_ecma_parser::{lexer::Lexer, Parser as SwcParser, StringInput, Syntax, TsConfig};
use swc_ecma_visit::{Visit, VisitWith};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RouterError;
use crate::model::{Badge, RouteMeta, RouteNode};

/// TypeScript のルート定義モジュールから取り出した変数ごとのルート群
#[derive(Debug, Default)]
pub struct ParsedRouteModule {
    /// 解析したファイル
    pub source_file: PathBuf,
    /// (変数名, ルート) を宣言順に保持
    pub groups: Vec<(String, Vec<RouteNode>)>,
}

/// AST をトラバースしてルート定義を抽出するための Visitor
struct RouteVisitor {
    /// 変数名とそのルート定義のマッピング (スプレッド展開用)
    route_variables: HashMap<String, Vec<RouteNode>>,
    groups: Vec<(String, Vec<RouteNode>)>,
    /// 他のルート配列から参照された変数名 (トップレベルのグループから外す)
    referenced: RefCell<HashSet<String>>,
    /// 最初に発生したエラー (Visit は Result を返せないため保持しておく)
    error: Option<RouterError>,
}

/// `(expr)` / `expr as T` / `expr satisfies T` / `expr as const` を剥がす
fn unwrap_ts(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(ParenExpr { expr, .. }) => unwrap_ts(expr),
        Expr::TsAs(TsAsExpr { expr, .. }) => unwrap_ts(expr),
        Expr::TsSatisfies(TsSatisfiesExpr { expr, .. }) => unwrap_ts(expr),
        Expr::TsConstAssertion(TsConstAssertion { expr, .. }) => unwrap_ts(expr),
        other => other,
    }
}

fn string_value(expr: &Expr) -> Option<String> {
    match unwrap_ts(expr) {
        Expr::Lit(Lit::Str(Str { value, .. })) => Some(value.to_string()),
        // 埋め込み式のないテンプレートリテラルだけ文字列として扱う
        Expr::Tpl(Tpl { exprs, quasis, .. }) if exprs.is_empty() => quasis.first().map(|q| {
            q.cooked
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| q.raw.to_string())
        }),
        _ => None,
    }
}

fn bool_value(expr: &Expr) -> Option<bool> {
    match unwrap_ts(expr) {
        Expr::Lit(Lit::Bool(Bool { value, .. })) => Some(*value),
        _ => None,
    }
}

fn number_value(expr: &Expr) -> Option<f64> {
    match unwrap_ts(expr) {
        Expr::Lit(Lit::Num(Number { value, .. })) => Some(*value),
        Expr::Unary(UnaryExpr {
            op: UnaryOp::Minus,
            arg,
            ..
        }) => number_value(arg).map(|n| -n),
        _ => None,
    }
}

/// 整数リテラルだけを受け付ける。小数は丸めずに不正扱い
fn integer_value(route: &str, field: &str, expr: &Expr) -> Result<Option<i64>, RouterError> {
    match number_value(expr) {
        Some(n) if n.fract() != 0.0 => Err(RouterError::malformed(
            route,
            format!("{field} は整数である必要があります ({n})"),
        )),
        Some(n) => Ok(Some(n as i64)),
        None => Ok(None),
    }
}

fn prop_key(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(Str { value, .. }) => Some(value.to_string()),
        _ => None,
    }
}

/// `{ key: value, ... }` の KeyValue プロパティだけを列挙する
fn key_values(obj_lit: &ObjectLit) -> Vec<(String, &Expr)> {
    let mut out = Vec::new();
    for prop in &obj_lit.props {
        if let PropOrSpread::Prop(boxed_prop) = prop {
            if let Prop::KeyValue(KeyValueProp { key, value }) = &**boxed_prop {
                if let Some(name) = prop_key(key) {
                    out.push((name, &**value));
                }
            }
        }
    }
    out
}

fn string_list(route: &str, field: &str, expr: &Expr) -> Result<Vec<String>, RouterError> {
    let Expr::Array(arr_lit) = unwrap_ts(expr) else {
        return Err(RouterError::malformed(route, format!("{field} は文字列配列である必要があります")));
    };
    let mut out = Vec::new();
    for elem in arr_lit.elems.iter().flatten() {
        match string_value(&elem.expr) {
            Some(s) => out.push(s),
            None => {
                return Err(RouterError::malformed(
                    route,
                    format!("{field} に文字列以外の要素があります"),
                ));
            }
        }
    }
    Ok(out)
}

/// `component: () => import("...")` から specifier を取り出す
fn component_specifier(expr: &Expr) -> Option<String> {
    match unwrap_ts(expr) {
        Expr::Arrow(ArrowExpr { body, .. }) => match &**body {
            BlockStmtOrExpr::Expr(body_expr) => match unwrap_ts(body_expr) {
                Expr::Call(CallExpr {
                    callee: Callee::Import(_),
                    args,
                    ..
                }) => args.first().and_then(|arg| string_value(&arg.expr)),
                _ => None,
            },
            _ => None,
        },
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        other => string_value(other),
    }
}

fn parse_meta(route: &str, obj_lit: &ObjectLit) -> Result<RouteMeta, RouterError> {
    let mut meta = RouteMeta::default();
    for (key, value) in key_values(obj_lit) {
        match key.as_str() {
            "title" => meta.title = string_value(value),
            "icon" => meta.icon = string_value(value),
            "requiresAuth" => meta.requires_auth = bool_value(value).unwrap_or(true),
            "requiredPermissions" => {
                meta.required_permissions = Some(string_list(route, &key, value)?)
            }
            "requiredRoles" => meta.required_roles = Some(string_list(route, &key, value)?),
            "keepAlive" => meta.keep_alive = bool_value(value).unwrap_or(false),
            "hidden" => meta.hidden = bool_value(value).unwrap_or(false),
            "affix" => meta.affix = bool_value(value).unwrap_or(false),
            "order" => meta.order = integer_value(route, &key, value)?,
            "badge" => {
                meta.badge = match integer_value(route, &key, value)? {
                    Some(count) => Some(Badge::Count(count)),
                    None => string_value(value).map(Badge::Text),
                }
            }
            "activeMenu" => meta.active_menu = string_value(value),
            "externalLink" => meta.external_link = string_value(value),
            other => tracing::trace!("未対応の meta キーを無視: {other}"),
        }
    }
    Ok(meta)
}

impl RouteVisitor {
    fn new() -> Self {
        RouteVisitor {
            route_variables: HashMap::new(),
            groups: Vec::new(),
            referenced: RefCell::new(HashSet::new()),
            error: None,
        }
    }

    /// ObjectLit (例: `{ path: "home", meta: {...}, children: [...] }`) を受け取り
    /// RouteNode を構築して返す
    fn parse_route_object(&self, obj_lit: &ObjectLit) -> Result<RouteNode, RouterError> {
        let props = key_values(obj_lit);
        let name = props
            .iter()
            .find(|(k, _)| k == "name")
            .and_then(|(_, v)| string_value(v));
        let mut node = RouteNode {
            path: String::new(),
            name,
            redirect: None,
            component: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        };
        let label = node.name.clone().unwrap_or_default();

        for (key, value) in props {
            match key.as_str() {
                "path" => node.path = string_value(value).unwrap_or_default(),
                "redirect" => node.redirect = string_value(value),
                "component" => node.component = component_specifier(value),
                "meta" => {
                    if let Expr::Object(meta_obj) = unwrap_ts(value) {
                        node.meta = parse_meta(&label, meta_obj)?;
                    }
                }
                "children" => node.children = self.parse_route_list(value)?,
                _ => {}
            }
        }

        Ok(node)
    }

    /// 配列リテラル / 単一オブジェクト / 既知変数参照からルート列を作る
    fn parse_route_list(&self, expr: &Expr) -> Result<Vec<RouteNode>, RouterError> {
        match unwrap_ts(expr) {
            Expr::Array(arr_lit) => {
                let mut routes = Vec::new();
                for expr_and_spread in arr_lit.elems.iter().flatten() {
                    match unwrap_ts(&expr_and_spread.expr) {
                        Expr::Object(obj_lit) => routes.push(self.parse_route_object(obj_lit)?),
                        Expr::Ident(ident) => {
                            // `...otherRoutes` または `notFoundRoute` のような参照
                            let var_name = ident.sym.to_string();
                            match self.route_variables.get(&var_name) {
                                Some(known) => {
                                    routes.extend(known.iter().cloned());
                                    self.referenced.borrow_mut().insert(var_name);
                                }
                                None => tracing::warn!("変数 '{var_name}' の定義が見つかりません"),
                            }
                        }
                        other => tracing::debug!("ルート要素として扱えない式をスキップ: {other:?}"),
                    }
                }
                Ok(routes)
            }
            Expr::Object(obj_lit) => Ok(vec![self.parse_route_object(obj_lit)?]),
            Expr::Ident(ident) => {
                let var_name = ident.sym.to_string();
                let routes = self.route_variables.get(&var_name).cloned().unwrap_or_default();
                self.referenced.borrow_mut().insert(var_name);
                Ok(routes)
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl Visit for RouteVisitor {
    /// 変数宣言をキャッチして、名前に route を含む配列 / オブジェクトを記録する
    fn visit_var_decl(&mut self, var_decl: &VarDecl) {
        if self.error.is_some() {
            return;
        }

        for declarator in &var_decl.decls {
            let Pat::Ident(BindingIdent { id, .. }) = &declarator.name else {
                continue;
            };
            let var_name = id.sym.to_string();
            if !var_name.to_lowercase().contains("route") {
                continue;
            }
            let Some(init_expr) = &declarator.init else {
                continue;
            };
            if !matches!(unwrap_ts(init_expr), Expr::Array(_) | Expr::Object(_)) {
                continue;
            }

            match self.parse_route_list(init_expr) {
                Ok(routes) => {
                    tracing::debug!("変数 '{}' に {} 個のルート定義", var_name, routes.len());
                    self.route_variables.insert(var_name.clone(), routes.clone());
                    self.groups.push((var_name, routes));
                }
                Err(e) => {
                    self.error = Some(e);
                    return;
                }
            }
        }

        // 子ノードも訪問
        var_decl.visit_children_with(self);
    }
}

/// ソース文字列を解析する (テストや標準入力用)
pub fn parse_routes_source(src: String, file_path: &Path) -> Result<ParsedRouteModule, RouterError> {
    let cm: Lrc<SourceMap> = Default::default();

    let fm = cm.new_source_file(FileName::Real(file_path.to_path_buf()), src);

    // TypeScript構文でパースする設定
    let syntax = Syntax::Typescript(TsConfig {
        tsx: false,
        decorators: true,
        dts: false,
        no_early_errors: true,
        disallow_ambiguous_jsx_like: true,
    });

    let lexer = Lexer::new(
        syntax,
        Default::default(), // es version
        StringInput::from(&*fm),
        None,
    );

    let mut parser = SwcParser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| RouterError::Parse(format!("{}: {:?}", file_path.display(), e)))?;

    let mut visitor = RouteVisitor::new();
    visitor.visit_module(&module);

    if let Some(e) = visitor.error {
        return Err(e);
    }

    let referenced = visitor.referenced.into_inner();
    let groups: Vec<(String, Vec<RouteNode>)> = visitor
        .groups
        .into_iter()
        .filter(|(name, _)| !referenced.contains(name))
        .collect();

    tracing::debug!(
        "{:?}: {} 個のルート変数を検出",
        file_path,
        groups.len()
    );

    Ok(ParsedRouteModule {
        source_file: file_path.to_path_buf(),
        groups,
    })
}

/// ファイルを読み込んで解析する
pub fn parse_routes_in_file(file_path: &Path) -> Result<ParsedRouteModule, RouterError> {
    tracing::debug!("ファイル解析開始: {:?}", file_path);
    let src = fs::read_to_string(file_path)?;
    parse_routes_source(src, file_path)
}
