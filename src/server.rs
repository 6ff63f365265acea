// Plain TCP listener with a worker thread pool and graceful shutdown
use std::io::Write;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::http::{HttpResponse, Status};
use crate::proxy::ProxyEngine;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static ACTIVE_CONNS: AtomicUsize = AtomicUsize::new(0);

struct ThreadPool {
    sender: Option<mpsc::SyncSender<TcpStream>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    fn new(size: usize, engine: Arc<ProxyEngine>) -> Self {
        let (tx, rx) = mpsc::sync_channel::<TcpStream>(size * 2);
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(size);

        for _ in 0..size {
            let rx = Arc::clone(&rx);
            let engine = Arc::clone(&engine);
            workers.push(thread::spawn(move || {
                loop {
                    let stream = {
                        let lock = match rx.lock() {
                            Ok(g) => g,
                            Err(_) => break,
                        };
                        lock.recv()
                    };
                    match stream {
                        Ok(s) => {
                            let _guard = ConnGuard::new();
                            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handle_client(s, &engine);
                            }));
                            if result.is_err() {
                                crate::log::error("Panic in handler (recovered)");
                            }
                        }
                        Err(_) => break,
                    }
                }
            }));
        }

        ThreadPool { sender: Some(tx), workers }
    }

    fn dispatch(&self, stream: TcpStream) -> Result<(), TcpStream> {
        match &self.sender {
            Some(tx) => tx.try_send(stream).map_err(|e| match e {
                mpsc::TrySendError::Full(s) | mpsc::TrySendError::Disconnected(s) => s,
            }),
            None => Err(stream),
        }
    }

    fn shutdown(&mut self) {
        self.sender.take();
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}

struct ConnGuard;

impl ConnGuard {
    fn new() -> Self {
        ACTIVE_CONNS.fetch_add(1, Ordering::AcqRel);
        ConnGuard
    }
}

impl Drop for ConnGuard {
    fn drop(&mut self) {
        ACTIVE_CONNS.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct Server {
    cfg: Config,
    port: u16,
    engine: Arc<ProxyEngine>,
}

impl Server {
    pub fn new(cfg: Config, port: u16, engine: ProxyEngine) -> Self {
        Server { cfg, port, engine: Arc::new(engine) }
    }

    pub fn run(&self) -> std::io::Result<()> {
        let num_workers = if self.cfg.worker_threads > 0 {
            self.cfg.worker_threads
        } else {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 2
        };

        let addr = format!("{}:{}", self.cfg.listen_host, self.port);
        let listener = TcpListener::bind(&addr)?;
        listener.set_nonblocking(true)?;

        crate::log::info(&format!("Listening on {addr} (http)"));
        crate::log::info(&format!("Workers: {num_workers} | Max connections: {}", self.cfg.max_connections));
        crate::log::separator();

        install_shutdown_handler();
        let mut pool = ThreadPool::new(num_workers, Arc::clone(&self.engine));
        let max_conns = self.cfg.max_connections;

        loop {
            if SHUTDOWN.load(Ordering::Acquire) { break; }

            match listener.accept() {
                Ok((stream, _)) => {
                    if ACTIVE_CONNS.load(Ordering::Acquire) >= max_conns {
                        reject_overloaded(stream);
                        continue;
                    }
                    if let Err(s) = pool.dispatch(stream) {
                        reject_overloaded(s);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock
                           || e.kind() == std::io::ErrorKind::TimedOut => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    if !SHUTDOWN.load(Ordering::Acquire) {
                        crate::log::error(&format!("Accept error: {e}"));
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }

        crate::log::info("Shutting down...");
        let timeout_secs = self.cfg.shutdown_timeout;
        let deadline = std::time::Instant::now() + Duration::from_secs(timeout_secs);
        let mut last_logged = 0usize;
        loop {
            let active = ACTIVE_CONNS.load(Ordering::Acquire);
            if active == 0 {
                crate::log::info("All connections drained");
                break;
            }
            if std::time::Instant::now() > deadline {
                crate::log::warn(&format!("Forcing shutdown with {active} active connections (timeout {timeout_secs}s)"));
                break;
            }
            if active != last_logged {
                crate::log::info(&format!("Waiting for {active} connection(s) to finish..."));
                last_logged = active;
            }
            thread::sleep(Duration::from_millis(100));
        }
        pool.shutdown();
        crate::log::info(&crate::metrics::summary());
        crate::log::info("Server stopped.");
        Ok(())
    }
}

fn handle_client(mut s: TcpStream, engine: &ProxyEngine) {
    crate::metrics::inc_connections();
    // No client read timeout: the read ends when data arrives or the peer
    // closes. Only the outbound origin connection is timeout-bounded.
    let _ = s.set_nodelay(true);
    let ip = s.peer_addr().map(|a| a.ip().to_string()).unwrap_or_else(|_| "?".into());
    engine.serve(&mut s, &ip);
    let _ = s.shutdown(Shutdown::Both);
    crate::log::separator();
}

fn reject_overloaded(mut s: TcpStream) {
    crate::metrics::inc_requests();
    crate::metrics::inc_requests_err();
    let resp = HttpResponse::new(Status::InternalError).with_body(b"server overloaded".to_vec());
    let _ = s.write_all(&resp.to_bytes());
    let _ = s.shutdown(Shutdown::Both);
}

fn install_shutdown_handler() {
    #[cfg(unix)]
    {
        extern "C" fn sig_handler(_sig: libc::c_int) {
            SHUTDOWN.store(true, Ordering::Release);
        }

        unsafe {
            libc::signal(libc::SIGTERM, sig_handler as libc::sighandler_t);
            libc::signal(libc::SIGINT, sig_handler as libc::sighandler_t);
        }
    }

    #[cfg(windows)]
    {
        extern "system" fn ctrl_handler(_ctrl_type: u32) -> i32 {
            SHUTDOWN.store(true, Ordering::Release);
            1
        }
        extern "system" {
            fn SetConsoleCtrlHandler(
                handler: extern "system" fn(u32) -> i32,
                add: i32,
            ) -> i32;
        }
        unsafe { SetConsoleCtrlHandler(ctrl_handler, 1); }
    }
}
