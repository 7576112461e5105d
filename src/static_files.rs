use std::fs;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use bytes::Bytes;
use log::{debug, error, warn};
use lru::LruCache;

use crate::{
    context::{Context, HandlerFunc},
    param::{mime_for, DEFAULT_MIME},
};

/// 超过该大小的文件每次都从磁盘读取，不进入缓存
pub const MAX_CACHED_FILE_SIZE: u64 = 1048576; // 1MB

#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    modified_time: SystemTime,
}

/// 静态文件的 LRU 缓存，以磁盘路径为键，按修改时间判断是否失效
pub struct FileCache {
    cache: LruCache<PathBuf, CacheEntry>,
}

impl FileCache {
    /// 容量为 0 时按 1 处理
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn push(&mut self, path: &Path, content: Bytes, modified_time: SystemTime) {
        let entry = CacheEntry {
            content,
            modified_time,
        };
        self.cache.put(path.to_path_buf(), entry);
    }

    pub fn should_cache(file_size: u64) -> bool {
        file_size <= MAX_CACHED_FILE_SIZE
    }

    /// 查询有效缓存，修改时间不一致视为未命中
    pub fn find(&mut self, path: &Path, current_modified_time: SystemTime) -> Option<Bytes> {
        self.cache
            .get(path)
            .filter(|entry| entry.modified_time == current_modified_time)
            .map(|entry| entry.content.clone())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// 把通配符绑定的相对路径映射到 `root` 之下。
///
/// 只接受普通路径分段，`..`、绝对路径和盘符都视为不存在。
fn resolve(root: &Path, file: &str) -> Option<PathBuf> {
    let relative = Path::new(file);
    if file.is_empty()
        || !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn lock(cache: &Mutex<FileCache>) -> MutexGuard<'_, FileCache> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("静态文件缓存锁被污染，恢复并继续");
            poisoned.into_inner()
        }
    }
}

/// 构造挂在 `*filepath` 路由上的静态文件处理器。
///
/// 文件不存在时只写 404 状态码，不写响应体。
pub fn static_handler(root: impl Into<PathBuf>, cache_size: usize) -> HandlerFunc {
    let root = root.into();
    let cache = Arc::new(Mutex::new(FileCache::from_capacity(cache_size)));

    Arc::new(move |c: &mut Context| {
        let file = c.param("filepath").to_string();
        let path = match resolve(&root, &file) {
            Some(path) => path,
            None => {
                warn!("拒绝访问静态路径：{}", file);
                c.status(404);
                return;
            }
        };

        let metadata = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                debug!("静态文件不存在：{}", path.display());
                c.status(404);
                return;
            }
        };
        let modified_time = metadata.modified().ok();

        let cached = modified_time.and_then(|time| lock(&cache).find(&path, time));
        let content = match cached {
            Some(bytes) => {
                debug!("缓存命中：{}", path.display());
                bytes
            }
            None => match fs::read(&path) {
                Ok(data) => {
                    let bytes = Bytes::from(data);
                    if let Some(time) = modified_time {
                        if FileCache::should_cache(metadata.len()) {
                            lock(&cache).push(&path, bytes.clone(), time);
                        }
                    }
                    bytes
                }
                Err(e) => {
                    error!("无法读取文件{}: {}", path.display(), e);
                    c.fail(500, "failed to read file");
                    return;
                }
            },
        };

        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(DEFAULT_MIME, mime_for);
        c.set_header("Content-Type", mime);
        c.data(200, &content);
    })
}
