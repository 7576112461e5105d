// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # ko
//!
//! 一个小型 Web 框架：前缀树路由（`:param` 与 `*wildcard`）、按前缀生效的分组中间件、
//! 洋葱模型的处理器链，以及 JSON、字符串、HTML 模板与静态文件响应。
//!
//! ```no_run
//! use ko::{handler, Engine, Config};
//!
//! let mut engine = Engine::with_defaults();
//! engine.get("/hello/:name", |c| {
//!     let text = format!("hello {}", c.param("name"));
//!     c.string(200, text);
//! });
//! engine
//!     .group("/v1")
//!     .use_middleware(handler(|c| c.next()))
//!     .get("/ping", |c| c.string(200, "pong"));
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(ko::run(engine, &Config::new())).unwrap();
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod exception;
pub mod middleware;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;
pub mod trie;

pub use config::Config;
pub use context::{handler, Context, HandlerFunc, H};
pub use engine::{Engine, GroupId, RouterGroup};
pub use exception::Exception;
pub use middleware::{logger, recovery};
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use router::Router;
pub use server::{run, serve, serve_with_shutdown};
pub use static_files::{static_handler, FileCache};
