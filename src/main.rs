mod cache;
mod colors;
mod config;
mod error;
mod http;
mod log;
mod metrics;
mod proxy;
mod server;

fn main() {
    let port = match port_from_args() {
        Some(p) => p,
        None => {
            eprintln!("Usage: webproxy <port>");
            std::process::exit(1);
        }
    };

    metrics::init();
    let c = config::load_config();
    log::init(c.logging, &c.log_level);
    log::separator();

    let store = match cache::CacheStore::open(&c.cache_dir) {
        Ok(s) => s,
        Err(e) => {
            log::error(&format!("Cannot create cache directory '{}': {e}", c.cache_dir));
            std::process::exit(1);
        }
    };
    log::info(&format!("Cache root: {}", store.root().display()));

    let engine = proxy::ProxyEngine::new(store, &c);
    if let Err(e) = server::Server::new(c, port, engine).run() {
        log::error(&format!("Server failed: {e}"));
        std::process::exit(1);
    }
}

/// The single positional argument is the listening port. `--config <path>`
/// is consumed by the config loader and skipped here.
fn port_from_args() -> Option<u16> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            i += 2;
            continue;
        }
        positional.push(args[i].as_str());
        i += 1;
    }
    match positional[..] {
        [port] => port.parse().ok(),
        _ => None,
    }
}
