// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 网络层
//!
//! 基于 Tokio 的 TCP 服务：每个连接一个任务，读取一个完整请求，交给 [`Engine`]
//! 分发，写回响应后关闭连接（`Connection: close`）。
//!
//! 处理器链是同步的，放到阻塞线程池执行，不占用异步工作线程。

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{
    config::Config,
    engine::Engine,
    exception::Exception,
    param::HEADER_TERMINATOR,
    request::{find_subsequence, Request},
    response::Response,
};

const READ_CHUNK_SIZE: usize = 1024;

/// 单次读取的结果
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// 头部与 `Content-Length` 指定长度的请求体都已读完
    Complete(Bytes),
    /// 对端在发送任何数据之前关闭了连接
    Closed,
    /// 请求超过了允许的最大长度
    TooLarge,
}

/// 按配置绑定地址并持续服务，直到收到 Ctrl-C。
pub async fn run(engine: Engine, config: &Config) -> io::Result<()> {
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, config.port());
    let listener = TcpListener::bind(socket).await.map_err(|e| {
        error!("无法绑定端口：{}，错误：{}", config.port(), e);
        e
    })?;
    info!("服务端将在{}上监听Socket连接", socket);

    serve_with_shutdown(
        Arc::new(engine),
        listener,
        config.max_request_size(),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听停机信号：{}", e);
            }
        },
    )
    .await
}

/// 在已绑定的监听器上持续接受连接
pub async fn serve(
    engine: Arc<Engine>,
    listener: TcpListener,
    max_request_size: usize,
) -> io::Result<()> {
    serve_with_shutdown(engine, listener, max_request_size, std::future::pending()).await
}

/// 与 [`serve`] 相同，`shutdown` 完成后停止接受新连接；已接受的连接会继续处理完。
pub async fn serve_with_shutdown<F>(
    engine: Arc<Engine>,
    listener: TcpListener,
    max_request_size: usize,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut id: u128 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("主循环接收到停机指令，正在退出...");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("接受连接失败：{}", e);
                        continue;
                    }
                };
                debug!("[ID{}]TCP连接已建立：{}", id, addr);

                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    handle_connection(stream, id, engine, max_request_size).await;
                });
                id += 1;
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    id: u128,
    engine: Arc<Engine>,
    max_request_size: usize,
) {
    let start_time = Instant::now();

    let response = match read_request(&mut stream, max_request_size).await {
        Ok(ReadOutcome::Complete(buffer)) => {
            debug!("[ID{}]HTTP请求接收完毕，共{}字节", id, buffer.len());
            dispatch(&buffer, id, engine).await
        }
        Ok(ReadOutcome::Closed) => return,
        Ok(ReadOutcome::TooLarge) => {
            warn!("[ID{}]{}", id, Exception::RequestTooLarge);
            Response::from_status_code(Exception::RequestTooLarge.status_code())
        }
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    if let Err(e) = write_response(&mut stream, &response).await {
        error!("[ID{}]发送响应失败: {}", id, e);
    }
}

async fn dispatch(buffer: &[u8], id: u128, engine: Arc<Engine>) -> Response {
    let request = match Request::try_from(buffer, id) {
        Ok(request) => request,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            return Response::from_status_code(e.status_code());
        }
    };

    match tokio::task::spawn_blocking(move || engine.handle(request)).await {
        Ok(response) => response,
        Err(e) => {
            error!("[ID{}]处理器链异常退出: {}", id, e);
            Response::from_status_code(500)
        }
    }
}

async fn write_response(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    stream.write_all(&response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// 读取一个请求：先读到头部结束，再按 `Content-Length` 读完请求体。
pub(crate) async fn read_request<R>(reader: &mut R, max_request_size: usize) -> io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);

    loop {
        match find_subsequence(&buffer, HEADER_TERMINATOR) {
            Some(head_end) => {
                let expected = (head_end + HEADER_TERMINATOR.len())
                    .checked_add(content_length(&buffer[..head_end]))
                    .filter(|expected| *expected <= max_request_size);
                let expected = match expected {
                    Some(expected) => expected,
                    None => return Ok(ReadOutcome::TooLarge),
                };
                if buffer.len() >= expected {
                    buffer.truncate(expected);
                    return Ok(ReadOutcome::Complete(buffer.freeze()));
                }
            }
            None if buffer.len() > max_request_size => return Ok(ReadOutcome::TooLarge),
            None => {}
        }

        buffer.reserve(READ_CHUNK_SIZE);
        if reader.read_buf(&mut buffer).await? == 0 {
            // 对端提前关闭，剩余内容交给解析器判断
            return Ok(if buffer.is_empty() {
                ReadOutcome::Closed
            } else {
                ReadOutcome::Complete(buffer.freeze())
            });
        }
    }
}

/// 从原始头部中取出 `Content-Length`，缺失或无法解析时为 0
fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
