// Configuration loading, validation, and default generation
use serde::Deserialize;
use std::fs;

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub listen_host: String,
    pub cache_dir: String,
    pub buffer_size: usize,
    pub origin_port: u16,
    pub origin_timeout: u64,
    pub max_header_size: usize,
    pub max_body_size: usize,
    pub max_connections: usize,
    pub worker_threads: usize,
    pub shutdown_timeout: u64,
    pub log_level: String,
    pub logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_host: "127.0.0.1".to_string(),
            cache_dir: "cache".to_string(),
            buffer_size: 4096,
            origin_port: 80,
            origin_timeout: 5,
            max_header_size: crate::http::MAX_HEADER_SIZE,
            max_body_size: crate::http::MAX_BODY_SIZE,
            max_connections: 10_000,
            worker_threads: 0,
            shutdown_timeout: 15,
            log_level: "info".to_string(),
            logging: true,
        }
    }
}

impl Config {
    /// Clamp out-of-range values back to workable defaults. A broken config
    /// file never aborts the proxy, only the CLI port argument does.
    pub fn validate(&mut self) {
        if self.listen_host.is_empty() {
            crate::log::warn("listen_host is empty, using 127.0.0.1");
            self.listen_host = "127.0.0.1".to_string();
        }
        if self.cache_dir.is_empty() {
            crate::log::warn("cache_dir is empty, using 'cache'");
            self.cache_dir = "cache".to_string();
        }
        if self.buffer_size < 512 {
            crate::log::warn(&format!("buffer_size too small ({}), using 512", self.buffer_size));
            self.buffer_size = 512;
        }
        if self.origin_port == 0 {
            crate::log::warn("origin_port is 0, using 80");
            self.origin_port = 80;
        }
        if self.origin_timeout == 0 {
            crate::log::warn("origin_timeout is 0, using 5");
            self.origin_timeout = 5;
        }
        if self.max_header_size == 0 {
            self.max_header_size = crate::http::MAX_HEADER_SIZE;
        }
        if self.max_body_size == 0 {
            self.max_body_size = crate::http::MAX_BODY_SIZE;
        }
        if self.max_connections == 0 {
            self.max_connections = 10_000;
        }
        if self.shutdown_timeout == 0 {
            self.shutdown_timeout = 15;
        }
        if self.max_connections > 100_000 {
            crate::log::warn(&format!("max_connections very high ({}), may exhaust file descriptors", self.max_connections));
        }
    }
}

fn atomic_write(path: &str, content: &str) -> std::io::Result<()> {
    let tmp = format!("{path}.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_config() -> Config {
    let p = path();
    let mut cfg = match fs::read_to_string(&p) {
        Ok(txt) => match toml::from_str(&txt) {
            Ok(c) => {
                crate::log::info(&format!("Loaded {p}"));
                c
            }
            Err(e) => {
                crate::log::error(&format!("Parse error {p}: {e}"));
                crate::log::warn("Using defaults");
                Config::default()
            }
        },
        Err(_) => {
            let cfg = Config::default();
            if atomic_write(&p, &generate_config(&cfg)).is_ok() {
                crate::log::info(&format!("Generated {p}"));
            } else {
                crate::log::warn(&format!("No config at '{p}', using defaults"));
            }
            cfg
        }
    };
    cfg.validate();
    cfg
}

fn generate_config(cfg: &Config) -> String {
    let mut doc = toml::Table::new();
    doc.insert("listen_host".into(), toml::Value::String(cfg.listen_host.clone()));
    doc.insert("cache_dir".into(), toml::Value::String(cfg.cache_dir.clone()));
    doc.insert("buffer_size".into(), toml::Value::Integer(cfg.buffer_size as i64));
    doc.insert("origin_port".into(), toml::Value::Integer(cfg.origin_port as i64));
    doc.insert("origin_timeout".into(), toml::Value::Integer(cfg.origin_timeout as i64));
    doc.insert("max_header_size".into(), toml::Value::Integer(cfg.max_header_size as i64));
    doc.insert("max_body_size".into(), toml::Value::Integer(cfg.max_body_size as i64));
    doc.insert("max_connections".into(), toml::Value::Integer(cfg.max_connections as i64));
    doc.insert("worker_threads".into(), toml::Value::Integer(cfg.worker_threads as i64));
    doc.insert("shutdown_timeout".into(), toml::Value::Integer(cfg.shutdown_timeout as i64));
    doc.insert("log_level".into(), toml::Value::String(cfg.log_level.clone()));
    doc.insert("logging".into(), toml::Value::Boolean(cfg.logging));
    match toml::to_string_pretty(&doc) {
        Ok(s) => s,
        Err(e) => {
            crate::log::error(&format!("Config serialization failed: {e}"));
            String::new()
        }
    }
}

fn path() -> String {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "config.toml".to_string())
}
