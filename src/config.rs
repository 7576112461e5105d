use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::warn;
use std::fs;

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    port: u16,
    local: bool,
    worker_threads: usize,
    #[serde(default = "default_static_cache_size")]
    static_cache_size: usize,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
    #[serde(default = "default_static_root")]
    static_root: String,
    #[serde(default)]
    template_glob: Option<String>,
}

fn default_static_cache_size() -> usize {
    16
}

fn default_max_request_size() -> usize {
    1048576 // 1MB
}

fn default_static_root() -> String {
    "static".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7878,
            local: true,
            worker_threads: num_cpus::get(),
            static_cache_size: default_static_cache_size(),
            max_request_size: default_max_request_size(),
            static_root: default_static_root(),
            template_glob: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let str_val = fs::read_to_string(filename)
            .map_err(|e| Exception::ConfigError(format!("{}: {}", filename, e)))?;
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Result<Self, Exception> {
        let mut raw_config: Config =
            toml::from_str(str_val).map_err(|e| Exception::ConfigError(e.to_string()))?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.static_cache_size == 0 {
            warn!("static_cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为16。");
            raw_config.static_cache_size = default_static_cache_size();
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn static_cache_size(&self) -> usize {
        self.static_cache_size
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    pub fn static_root(&self) -> &str {
        &self.static_root
    }

    pub fn template_glob(&self) -> Option<&str> {
        self.template_glob.as_deref()
    }
}
