// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文
//!
//! 每个请求创建一个 `Context`，它持有解析后的请求、路由参数、正在构建的响应，
//! 以及本次请求的处理器序列和游标。
//!
//! ## 执行模型
//! 游标初始为 -1。[`Context::next`] 每调用一次，游标前进一格并执行该位置的处理器。
//! 游标保存在上下文而不是调用栈上，所以处理器在函数体中途调用 `next()` 时，
//! 后续处理器会先全部执行完，然后才回到该处理器剩余的代码：
//!
//! ```text
//! A 前置 -> B 前置 -> H -> B 后置 -> A 后置
//! ```
//!
//! 没有调用 `next()` 就返回的处理器会提前结束整条链；[`Context::fail`] 把游标
//! 直接移到末尾并写出错误响应，之后的 `next()` 都不会再执行任何处理器。

use std::collections::HashMap;
use std::sync::Arc;

use log::error;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tera::Tera;

use crate::{param::HttpRequestMethod, request::Request, response::Response};

/// 处理器与中间件共用的函数类型
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// 把闭包包装成 [`HandlerFunc`]，省去参数类型标注
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// JSON 响应使用的开放式键值容器
pub type H = Map<String, Value>;

pub struct Context {
    request: Request,
    path: String,
    method: HttpRequestMethod,
    params: HashMap<String, String>,
    status_code: u16,
    response: Response,
    handlers: Vec<HandlerFunc>,
    index: isize,
    templates: Option<Arc<Tera>>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            path: request.path().to_string(),
            method: request.method(),
            request,
            params: HashMap::new(),
            status_code: 200,
            response: Response::new(),
            handlers: Vec::new(),
            index: -1,
            templates: None,
        }
    }

    pub(crate) fn with_handlers(mut self, handlers: Vec<HandlerFunc>) -> Self {
        self.handlers = handlers;
        self
    }

    pub(crate) fn with_templates(mut self, templates: Option<Arc<Tera>>) -> Self {
        self.templates = templates;
        self
    }

    pub(crate) fn push_handler(&mut self, handler: HandlerFunc) {
        self.handlers.push(handler);
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// 推进游标并执行下一个处理器。
    ///
    /// 可重入：处理器内部调用 `next()` 推进的是同一个游标，不会开启新的链。
    pub fn next(&mut self) {
        self.index += 1;
        if let Some(handler) = self.current_handler() {
            handler(self);
        }
    }

    fn current_handler(&self) -> Option<HandlerFunc> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.handlers.get(i))
            .cloned()
    }

    /// 游标是否已经越过最后一个处理器
    pub fn is_drained(&self) -> bool {
        self.index >= self.handlers.len() as isize
    }

    /// 终止处理器链并写出 `{"message": message}`，不可恢复。
    pub fn fail(&mut self, code: u16, message: &str) {
        self.index = self.handlers.len() as isize;
        self.json(code, &json!({ "message": message }));
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

// --- 请求访问器 ---

impl Context {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// 路由参数，未绑定时返回空串
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    /// 查询参数，不存在时返回空串
    pub fn query(&self, key: &str) -> String {
        self.request.query_value(key).unwrap_or_default()
    }

    /// 表单字段，不存在或请求体不是表单时返回空串
    pub fn post_form(&self, key: &str) -> String {
        self.request.form_value(key).unwrap_or_default()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.header(key)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }
}

// --- 响应写出 ---

impl Context {
    pub fn status(&mut self, code: u16) {
        self.status_code = code;
        self.response.set_code(code);
    }

    pub fn set_header(&mut self, key: &str, value: &str) {
        self.response.set_header(key, value);
    }

    pub fn string(&mut self, code: u16, text: impl AsRef<str>) {
        self.set_header("Content-Type", "text/plain");
        self.status(code);
        self.response.write(text.as_ref().as_bytes());
    }

    /// 序列化失败时转为 500 的 `fail`
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, data: &T) {
        match serde_json::to_vec(data) {
            Ok(body) => {
                self.set_header("Content-Type", "application/json");
                self.status(code);
                self.response.write(&body);
            }
            Err(e) => {
                error!("JSON序列化失败：{}", e);
                self.fail(500, &e.to_string());
            }
        }
    }

    /// 使用 `Engine::load_html_glob` 载入的模板渲染 HTML。
    ///
    /// 未载入模板、模板不存在或渲染失败都会转为 500 的 `fail`。
    pub fn html<T: Serialize + ?Sized>(&mut self, code: u16, name: &str, data: &T) {
        let rendered = match &self.templates {
            Some(templates) => tera::Context::from_serialize(data)
                .and_then(|context| templates.render(name, &context))
                .map_err(|e| e.to_string()),
            None => Err("html templates are not loaded".to_string()),
        };
        match rendered {
            Ok(html) => {
                self.set_header("Content-Type", "text/html");
                self.status(code);
                self.response.write(html.as_bytes());
            }
            Err(e) => {
                error!("模板{}渲染失败：{}", name, e);
                self.fail(500, &e);
            }
        }
    }

    pub fn data(&mut self, code: u16, data: &[u8]) {
        self.status(code);
        self.response.write(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn context(path: &str) -> Context {
        Context::new(Request::new(HttpRequestMethod::Get, path))
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str, calls_next: bool) -> HandlerFunc {
        let log = Arc::clone(log);
        Arc::new(move |c: &mut Context| {
            log.lock().unwrap().push(format!("{}-pre", name));
            if calls_next {
                c.next();
                log.lock().unwrap().push(format!("{}-post", name));
            }
        })
    }

    fn body(c: Context) -> String {
        String::from_utf8(c.into_response().body().to_vec()).unwrap()
    }

    #[test]
    fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut c = context("/").with_handlers(vec![
            recorder(&log, "A", true),
            recorder(&log, "B", true),
            recorder(&log, "H", false),
        ]);
        c.next();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A-pre", "B-pre", "H-pre", "B-post", "A-post"]
        );
    }

    #[test]
    fn test_handler_without_next_ends_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut c = context("/").with_handlers(vec![
            recorder(&log, "A", false),
            recorder(&log, "B", true),
            recorder(&log, "H", false),
        ]);
        c.next();

        assert_eq!(*log.lock().unwrap(), vec!["A-pre"]);
    }

    #[test]
    fn test_fail_stops_following_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing: HandlerFunc = Arc::new(|c: &mut Context| {
            c.fail(500, "boom");
            c.next();
        });
        let mut c = context("/").with_handlers(vec![
            recorder(&log, "A", true),
            failing,
            recorder(&log, "H", false),
        ]);
        c.next();

        assert_eq!(*log.lock().unwrap(), vec!["A-pre", "A-post"]);
        assert!(c.is_drained());
        assert_eq!(c.status_code(), 500);
        assert_eq!(body(c), r#"{"message":"boom"}"#);
    }

    #[test]
    fn test_next_on_empty_chain_is_noop() {
        let mut c = context("/");
        c.next();
        c.next();
        assert!(c.is_drained());
        assert_eq!(c.status_code(), 200);
    }

    #[test]
    fn test_string_response() {
        let mut c = context("/hello");
        c.string(201, format!("hello {}", "ko"));
        let response = c.into_response();

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.body(), bytes::Bytes::from("hello ko"));
    }

    #[test]
    fn test_json_response_with_h() {
        let mut c = context("/");
        let mut payload = H::new();
        payload.insert("name".to_string(), Value::from("ko"));
        payload.insert("stars".to_string(), Value::from(3));
        c.json(200, &payload);

        let response = c.into_response();
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        let parsed: Value = serde_json::from_slice(&response.body()).unwrap();
        assert_eq!(parsed, json!({"name": "ko", "stars": 3}));
    }

    #[test]
    fn test_json_serialization_failure_becomes_500() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "map keys must be strings");

        let mut c = context("/");
        c.json(200, &bad);

        assert_eq!(c.status_code(), 500);
        let parsed: Value = serde_json::from_str(&body(c)).unwrap();
        assert!(parsed["message"].is_string());
    }

    #[test]
    fn test_html_without_templates_fails() {
        let mut c = context("/");
        c.html(200, "index.html", &json!({}));

        assert_eq!(c.status_code(), 500);
        assert_eq!(body(c), r#"{"message":"html templates are not loaded"}"#);
    }

    #[test]
    fn test_html_renders_template() {
        let mut tera = Tera::default();
        tera.add_raw_template("hello.html", "<p>{{ name }}</p>").unwrap();

        let mut c = context("/").with_templates(Some(Arc::new(tera)));
        c.html(200, "hello.html", &json!({ "name": "ko" }));

        let response = c.into_response();
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.body(), bytes::Bytes::from("<p>ko</p>"));
    }

    #[test]
    fn test_data_response() {
        let mut c = context("/");
        c.data(200, &[0, 1, 2]);
        assert_eq!(c.into_response().body().as_ref(), &[0, 1, 2]);
    }

    #[test]
    fn test_param_and_query() {
        let mut c = context("/user/42?lang=zh");
        let mut params = HashMap::new();
        params.insert("id".to_string(), "42".to_string());
        c.set_params(params);

        assert_eq!(c.path(), "/user/42");
        assert_eq!(c.param("id"), "42");
        assert_eq!(c.param("missing"), "");
        assert_eq!(c.query("lang"), "zh");
        assert_eq!(c.query("missing"), "");
    }
}
