// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务
//!
//! 读取 `config/` 下的日志与运行配置，注册一组演示路由后开始监听，Ctrl-C 停机。

use std::error::Error;
use std::time::Instant;

use log::info;
use serde_json::json;
use tokio::runtime::Builder;

use ko::{handler, logger, Config, Context, Engine, H};

fn only_for_v2() -> ko::HandlerFunc {
    handler(|c: &mut Context| {
        let start_time = Instant::now();
        c.next();
        info!(
            "[{}] {} in {}us for group v2",
            c.status_code(),
            c.request().target(),
            start_time.elapsed().as_micros()
        );
    })
}

fn register_routes(engine: &mut Engine, config: &Config) {
    engine.get("/", |c| c.html(200, "index.html", &json!({ "title": "ko" })));
    engine.get("/panic", |c| {
        let names = ["ko"];
        let index = c.query("i").parse::<usize>().unwrap_or(100);
        c.string(200, names[index]);
    });

    engine
        .group("/v1")
        .get("/hello", |c| {
            let text = format!("hello {}, you're at {}\n", c.query("name"), c.path());
            c.string(200, text);
        })
        .post("/login", |c| {
            let mut payload = H::new();
            payload.insert("username".to_string(), c.post_form("username").into());
            payload.insert("password".to_string(), c.post_form("password").into());
            c.json(200, &payload);
        });

    engine
        .group_with("/v2", vec![only_for_v2()])
        .get("/hello/:name", |c| {
            let text = format!("hello {}, you're at {}\n", c.param("name"), c.path());
            c.string(200, text);
        })
        .get("/assets/*filepath", |c| {
            let filepath = c.param("filepath").to_string();
            c.json(200, &json!({ "filepath": filepath }));
        });

    engine.serve_static("/static", config.static_root());
}

fn main() -> Result<(), Box<dyn Error>> {
    log4rs::init_file("config/log4rs.yaml", Default::default())?;

    let config = Config::from_toml("config/development.toml")?;
    info!("配置文件已载入");

    let mut engine = Engine::new();
    engine.use_middleware(logger()).use_middleware(ko::recovery());
    engine.configure(&config)?;
    register_routes(&mut engine, &config);

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;
    runtime.block_on(ko::run(engine, &config))?;
    info!("服务端已停止");
    Ok(())
}
