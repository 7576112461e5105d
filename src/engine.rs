// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Engine 与路由分组
//!
//! `Engine` 是唯一的注册状态持有者：路由表、按创建顺序排列的分组列表以及 HTML 模板。
//! 它本身就是前缀为空的根分组。注册阶段通过 `&mut Engine` 修改；开始服务后放进
//! `Arc` 共享，只读访问。
//!
//! 请求到来时，[`Engine::handle`] 扫描所有分组，凡前缀是请求路径字符串前缀的分组，
//! 按创建顺序拼接它们的中间件，再交给路由表追加最终处理器并启动处理器链。

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use tera::Tera;

use crate::{
    config::Config,
    context::{Context, HandlerFunc},
    exception::Exception,
    middleware::{logger, recovery},
    param::HttpRequestMethod,
    request::Request,
    response::Response,
    router::Router,
    static_files::static_handler,
};

/// 静态文件缓存的默认容量
pub const DEFAULT_STATIC_CACHE_SIZE: usize = 16;

/// 分组在 Engine 分组列表中的位置，可用于稍后重新取得该分组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupId(usize);

struct GroupData {
    prefix: String,
    middlewares: Vec<HandlerFunc>,
    parent: Option<GroupId>,
}

pub struct Engine {
    router: Router,
    groups: Vec<GroupData>,
    templates: Option<Arc<Tera>>,
    static_cache_size: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: vec![GroupData {
                prefix: String::new(),
                middlewares: Vec::new(),
                parent: None,
            }],
            templates: None,
            static_cache_size: DEFAULT_STATIC_CACHE_SIZE,
        }
    }

    /// 预先挂载 `logger()` 与 `recovery()` 的 Engine
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.use_middleware(logger()).use_middleware(recovery());
        engine
    }

    /// 按配置设置静态文件缓存容量，并在配置了模板路径时载入模板
    pub fn configure(&mut self, config: &Config) -> Result<(), Exception> {
        self.static_cache_size = config.static_cache_size();
        if let Some(glob) = config.template_glob() {
            self.load_html_glob(glob)?;
        }
        Ok(())
    }

    pub fn set_static_cache_size(&mut self, size: usize) {
        self.static_cache_size = size;
    }

    /// 按 glob 载入全部 HTML 模板，例如 `templates/**/*.html`
    pub fn load_html_glob(&mut self, pattern: &str) -> Result<(), Exception> {
        if !pattern.contains('*') {
            return Err(Exception::TemplateError(format!(
                "模板路径必须包含通配符：{}",
                pattern
            )));
        }
        let tera = Tera::new(pattern).map_err(|e| Exception::TemplateError(e.to_string()))?;
        info!("已载入模板：{:?}", tera.get_template_names().collect::<Vec<_>>());
        self.templates = Some(Arc::new(tera));
        Ok(())
    }

    /// 使用调用方自行构造的模板集合（可预先注册过滤器与函数）
    pub fn set_html_templates(&mut self, tera: Tera) {
        self.templates = Some(Arc::new(tera));
    }

    /// 根分组
    pub fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup {
            engine: self,
            id: GroupId(0),
        }
    }

    /// 在根分组下创建子分组
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        self.root().into_group(prefix, Vec::new())
    }

    pub fn group_with(&mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> RouterGroup<'_> {
        self.root().into_group(prefix, middlewares)
    }

    /// 重新取得一个已创建的分组
    pub fn group_by_id(&mut self, id: GroupId) -> Option<RouterGroup<'_>> {
        if id.0 < self.groups.len() {
            Some(RouterGroup { engine: self, id })
        } else {
            None
        }
    }

    pub fn use_middleware(&mut self, middleware: HandlerFunc) -> &mut Self {
        self.root().use_middleware(middleware);
        self
    }

    pub fn use_middlewares(&mut self, middlewares: Vec<HandlerFunc>) -> &mut Self {
        self.root().use_middlewares(middlewares);
        self
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().get(pattern, handler);
        self
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().post(pattern, handler);
        self
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().put(pattern, handler);
        self
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().delete(pattern, handler);
        self
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().options(pattern, handler);
        self
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().patch(pattern, handler);
        self
    }

    pub fn serve_static(&mut self, relative_path: &str, root: impl Into<PathBuf>) -> &mut Self {
        self.root().serve_static(relative_path, root);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// 分发一个请求并返回最终响应。
    pub fn handle(&self, request: Request) -> Response {
        let middlewares: Vec<HandlerFunc> = self
            .groups
            .iter()
            .filter(|group| request.path().starts_with(group.prefix.as_str()))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect();
        debug!(
            "[{}] {} 命中{}个中间件",
            request.method(),
            request.path(),
            middlewares.len()
        );

        let mut c = Context::new(request)
            .with_handlers(middlewares)
            .with_templates(self.templates.clone());
        self.router.handle(&mut c);
        c.into_response()
    }
}

/// 指向 Engine 中某个分组的可变句柄。
///
/// 句柄借用 Engine，所以同一时刻只能操作一个分组；需要稍后再次操作时保存 [`GroupId`]。
pub struct RouterGroup<'a> {
    engine: &'a mut Engine,
    id: GroupId,
}

impl<'a> RouterGroup<'a> {
    fn data(&self) -> &GroupData {
        &self.engine.groups[self.id.0]
    }

    fn data_mut(&mut self) -> &mut GroupData {
        &mut self.engine.groups[self.id.0]
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn prefix(&self) -> &str {
        &self.data().prefix
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.data().parent
    }

    fn push_group(&mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> GroupId {
        let group = GroupData {
            prefix: format!("{}{}", self.prefix(), prefix),
            middlewares,
            parent: Some(self.id),
        };
        debug!("[Group] {}", group.prefix);
        self.engine.groups.push(group);
        GroupId(self.engine.groups.len() - 1)
    }

    fn into_group(mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> RouterGroup<'a> {
        let id = self.push_group(prefix, middlewares);
        RouterGroup {
            engine: self.engine,
            id,
        }
    }

    /// 创建子分组，前缀为当前前缀与 `prefix` 的拼接。当前分组保持不变。
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        self.group_with(prefix, Vec::new())
    }

    pub fn group_with(&mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> RouterGroup<'_> {
        let id = self.push_group(prefix, middlewares);
        RouterGroup {
            engine: &mut *self.engine,
            id,
        }
    }

    /// 追加中间件，对之后的所有请求生效
    pub fn use_middleware(&mut self, middleware: HandlerFunc) -> &mut Self {
        self.data_mut().middlewares.push(middleware);
        self
    }

    pub fn use_middlewares(&mut self, middlewares: Vec<HandlerFunc>) -> &mut Self {
        self.data_mut().middlewares.extend(middlewares);
        self
    }

    fn add_route(&mut self, method: HttpRequestMethod, comp: &str, handler: HandlerFunc) {
        let pattern = format!("{}{}", self.prefix(), comp);
        self.engine.router.add_route(method, &pattern, handler);
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Get, pattern, Arc::new(handler));
        self
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Post, pattern, Arc::new(handler));
        self
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Put, pattern, Arc::new(handler));
        self
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Delete, pattern, Arc::new(handler));
        self
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Options, pattern, Arc::new(handler));
        self
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(HttpRequestMethod::Patch, pattern, Arc::new(handler));
        self
    }

    /// 把磁盘目录 `root` 暴露在 `relative_path/*filepath` 之下（仅 GET）
    pub fn serve_static(&mut self, relative_path: &str, root: impl Into<PathBuf>) -> &mut Self {
        let handler = static_handler(root, self.engine.static_cache_size);
        let pattern = format!("{}/*filepath", relative_path.trim_end_matches('/'));
        self.add_route(HttpRequestMethod::Get, &pattern, handler);
        self
    }
}
