// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了框架在配置加载、模板加载以及请求解析过程中可能出现的异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了协议解析错误、配置错误以及模板错误。
//! - **语义映射**：请求解析类的变体可以直接映射为 HTTP 响应状态码，见 [`Exception::status_code`]。
//! - 处理器内部的业务错误不经过这里，而是由 `Context::fail` 直接写出响应。

use std::error::Error;
use std::fmt;

/// 框架处理过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行缺少方法、目标或版本。
    MalformedRequestLine,
    /// 客户端使用了框架不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本（仅支持 HTTP/1.0 与 HTTP/1.1）。
    UnsupportedHttpVersion,
    /// 请求报文超过了配置的最大长度。
    RequestTooLarge,
    /// 配置文件无法读取或解析，附带底层错误描述。
    ConfigError(String),
    /// 模板目录加载失败或尚未加载模板。
    TemplateError(String),
}

use Exception::*;

impl Exception {
    /// 请求解析阶段的异常对应的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | MalformedRequestLine | UnsupportedHttpVersion => 400,
            UnSupportedRequestMethod => 405,
            RequestTooLarge => 413,
            ConfigError(_) | TemplateError(_) => 500,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            RequestTooLarge => write!(f, "Request exceeds the configured size limit"),
            ConfigError(e) => write!(f, "Config error: {}", e),
            TemplateError(e) => write!(f, "Template error: {}", e),
        }
    }
}

impl Error for Exception {}
