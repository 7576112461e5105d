// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表
//!
//! 为每个 HTTP 方法维护一棵前缀树，另用 `"{METHOD}-{pattern}"` 作为键保存处理器。
//! 树结构与处理器存储彼此独立：命中节点的 `pattern` 是找回处理器的唯一依据。

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    context::{Context, HandlerFunc},
    param::HttpRequestMethod,
    trie::{parse_pattern, Node},
};

#[derive(Default)]
pub struct Router {
    roots: HashMap<HttpRequestMethod, Node>,
    handlers: HashMap<String, HandlerFunc>,
}

fn handler_key(method: HttpRequestMethod, pattern: &str) -> String {
    format!("{}-{}", method, pattern)
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册路由。同一方法下重复注册相同模式时，后注册的处理器生效。
    pub fn add_route(&mut self, method: HttpRequestMethod, pattern: &str, handler: HandlerFunc) {
        info!("[Route] {:>4} - {}", method, pattern);
        let parts = parse_pattern(pattern);
        self.roots
            .entry(method)
            .or_default()
            .insert(pattern, &parts, 0);
        self.handlers.insert(handler_key(method, pattern), handler);
    }

    /// 查找路由并提取参数。
    ///
    /// 参数按命中节点的模式重新切分后逐位对齐请求路径：`:name` 绑定对应分段，
    /// `*name` 绑定剩余分段以 `/` 连接的结果。
    pub fn get_route(
        &self,
        method: HttpRequestMethod,
        path: &str,
    ) -> Option<(&Node, HashMap<String, String>)> {
        let search_parts = parse_pattern(path);
        let root = self.roots.get(&method)?;
        let node = root.search(&search_parts, 0)?;
        debug!("[Route] getRoute: {:?} -> {}", search_parts, node.pattern());

        let mut params = HashMap::new();
        for (index, part) in parse_pattern(node.pattern()).iter().enumerate() {
            if let Some(name) = part.strip_prefix(':') {
                if let Some(value) = search_parts.get(index) {
                    params.insert(name.to_string(), value.clone());
                }
            }
            if let Some(name) = part.strip_prefix('*') {
                if !name.is_empty() {
                    let rest = search_parts.get(index..).unwrap_or_default();
                    params.insert(name.to_string(), rest.join("/"));
                }
                break;
            }
        }
        Some((node, params))
    }

    /// 某个方法下已注册的全部模式
    pub fn routes(&self, method: HttpRequestMethod) -> Vec<&str> {
        let mut nodes = Vec::new();
        if let Some(root) = self.roots.get(&method) {
            root.travel(&mut nodes);
        }
        nodes.into_iter().map(|n| n.pattern()).collect()
    }

    /// 解析路由，把命中的处理器（或 404 处理器）追加到处理器链末尾，然后启动处理器链。
    pub fn handle(&self, c: &mut Context) {
        match self.get_route(c.method(), c.path()) {
            Some((node, params)) => {
                c.set_params(params);
                let key = handler_key(c.method(), node.pattern());
                match self.handlers.get(&key) {
                    Some(handler) => c.push_handler(Arc::clone(handler)),
                    None => warn!("{} 没有对应的处理器", key),
                }
            }
            None => c.push_handler(Arc::new(not_found)),
        }
        c.next();
    }
}

fn not_found(c: &mut Context) {
    let body = format!("404 NOT FOUND: {}\n", c.path());
    c.string(404, body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    fn noop() -> HandlerFunc {
        Arc::new(|_: &mut Context| {})
    }

    fn new_test_router() -> Router {
        let mut r = Router::new();
        r.add_route(HttpRequestMethod::Get, "/", noop());
        r.add_route(HttpRequestMethod::Get, "/hello/:name", noop());
        r.add_route(HttpRequestMethod::Get, "/hello/b/c", noop());
        r.add_route(HttpRequestMethod::Get, "/hi/:name", noop());
        r.add_route(HttpRequestMethod::Get, "/assets/*filepath", noop());
        r
    }

    #[test]
    fn test_get_route_param() {
        let r = new_test_router();
        let (node, params) = r.get_route(HttpRequestMethod::Get, "/hello/ko").unwrap();

        assert_eq!(node.pattern(), "/hello/:name");
        assert_eq!(params["name"], "ko");
    }

    #[test]
    fn test_get_route_user_id() {
        let mut r = Router::new();
        r.add_route(HttpRequestMethod::Get, "/user/:id", noop());
        let (_, params) = r.get_route(HttpRequestMethod::Get, "/user/42").unwrap();
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn test_get_route_wildcard() {
        let r = new_test_router();
        let (node, params) = r
            .get_route(HttpRequestMethod::Get, "/assets/img/a.png")
            .unwrap();

        assert_eq!(node.pattern(), "/assets/*filepath");
        assert_eq!(params["filepath"], "img/a.png");
    }

    #[test]
    fn test_anonymous_wildcard_binds_nothing() {
        let mut r = Router::new();
        r.add_route(HttpRequestMethod::Get, "/files/*", noop());
        let (_, params) = r.get_route(HttpRequestMethod::Get, "/files/a/b").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_get_route_miss() {
        let r = new_test_router();
        assert!(r.get_route(HttpRequestMethod::Get, "/nothing/here").is_none());
        assert!(r.get_route(HttpRequestMethod::Post, "/").is_none());
    }

    #[test]
    fn test_methods_have_separate_trees() {
        let mut r = Router::new();
        r.add_route(HttpRequestMethod::Post, "/login", noop());
        assert!(r.get_route(HttpRequestMethod::Get, "/login").is_none());
        assert!(r.get_route(HttpRequestMethod::Post, "/login").is_some());
    }

    #[test]
    fn test_routes_listing() {
        let r = new_test_router();
        let routes = r.routes(HttpRequestMethod::Get);
        assert!(routes.contains(&"/"));
        assert!(routes.contains(&"/hi/:name"));
        assert!(r.routes(HttpRequestMethod::Delete).is_empty());
    }

    #[test]
    fn test_handle_runs_matched_handler() {
        let mut r = Router::new();
        r.add_route(
            HttpRequestMethod::Get,
            "/hello/:name",
            Arc::new(|c: &mut Context| {
                let text = format!("hello {}", c.param("name"));
                c.string(200, text);
            }),
        );

        let mut c = Context::new(Request::new(HttpRequestMethod::Get, "/hello/ko"));
        r.handle(&mut c);

        let response = c.into_response();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body(), bytes::Bytes::from("hello ko"));
    }

    #[test]
    fn test_handle_not_found() {
        let r = new_test_router();
        let mut c = Context::new(Request::new(HttpRequestMethod::Get, "/missing/page"));
        r.handle(&mut c);

        let response = c.into_response();
        assert_eq!(response.status_code(), 404);
        assert_eq!(
            response.body(),
            bytes::Bytes::from("404 NOT FOUND: /missing/page\n")
        );
    }

    #[test]
    fn test_duplicate_registration_overwrites_handler() {
        let mut r = Router::new();
        r.add_route(
            HttpRequestMethod::Get,
            "/v",
            Arc::new(|c: &mut Context| c.string(200, "first")),
        );
        r.add_route(
            HttpRequestMethod::Get,
            "/v",
            Arc::new(|c: &mut Context| c.string(200, "second")),
        );

        let mut c = Context::new(Request::new(HttpRequestMethod::Get, "/v"));
        r.handle(&mut c);
        assert_eq!(c.into_response().body(), bytes::Bytes::from("second"));
    }
}
