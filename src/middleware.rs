// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 内置中间件：请求日志与 panic 恢复。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use log::{error, info};

use crate::context::{handler, HandlerFunc};

/// 记录每个请求的状态码、目标、耗时与 User-Agent
pub fn logger() -> HandlerFunc {
    handler(|c| {
        let start_time = Instant::now();
        c.next();
        info!(
            "[{}] {} {} in {}us ({})",
            c.status_code(),
            c.method(),
            c.request().target(),
            start_time.elapsed().as_micros(),
            c.request().user_agent()
        );
    })
}

/// 捕获后续处理器中的 panic，转为 500 响应
pub fn recovery() -> HandlerFunc {
    handler(|c| {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| c.next())) {
            error!(
                "处理{}时发生panic：{}",
                c.path(),
                panic_message(payload.as_ref())
            );
            c.fail(500, "Internal Server Error");
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
