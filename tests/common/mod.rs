//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use intercept_kernel::config::schema::HostSettings;
use intercept_kernel::lifecycle::startup;
use intercept_kernel::{HttpServer, Kernel, Shutdown};

/// Path the kernel fetches its configuration from in these tests.
pub const CONFIG_PATH: &str = "/kernel.config.json";

/// Start a programmable mock upstream. The handler sees `(method, path)` and
/// returns `(status, body)`.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut reader = BufReader::new(read);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        let mut parts = request_line.split_whitespace();
                        let method = parts.next().unwrap_or("").to_string();
                        let path = parts.next().unwrap_or("").to_string();

                        let mut content_length = 0usize;
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).await.unwrap_or(0) == 0 || line == "\r\n" {
                                break;
                            }
                            if let Some((name, value)) = line.split_once(':') {
                                if name.eq_ignore_ascii_case("content-length") {
                                    content_length = value.trim().parse().unwrap_or(0);
                                }
                            }
                        }
                        let mut body = vec![0u8; content_length];
                        let _ = reader.read_exact(&mut body).await;

                        let (status, body) = f(&method, &path);
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = write.write_all(response.as_bytes()).await;
                        let _ = write.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Counts requests per path on a mock upstream.
#[derive(Clone, Default)]
pub struct HitCounter {
    hits: Arc<dashmap::DashMap<String, Arc<AtomicUsize>>>,
}

impl HitCounter {
    pub fn record(&self, path: &str) {
        self.hits
            .entry(path.to_string())
            .or_default()
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> usize {
        self.hits.get(path).map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

/// An address nothing listens on.
pub async fn dead_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Write a kernel configuration to a fresh temporary file.
pub fn write_config_file(json: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kernel-config-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, json).unwrap();
    path
}

/// Host settings pointing at `origin`, with the config served by the origin.
pub fn settings_for(origin: SocketAddr) -> HostSettings {
    let mut settings = HostSettings::default();
    settings.upstream.origin = format!("http://{}", origin);
    settings.upstream.timeout_secs = 2;
    settings.kernel.config_resource = CONFIG_PATH.to_string();
    settings
}

/// A kernel served on an ephemeral port. Dropping it stops the server.
pub struct TestKernel {
    pub addr: SocketAddr,
    pub kernel: Arc<Kernel>,
    shutdown: Shutdown,
    _watcher: Option<notify::RecommendedWatcher>,
}

impl TestKernel {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestKernel {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the kernel from `settings` and serve it.
pub async fn start_kernel(settings: HostSettings) -> TestKernel {
    let startup::Runtime { kernel, server, watcher } = startup::build(&settings).await.unwrap();
    let (addr, shutdown) = serve(server).await;
    TestKernel {
        addr,
        kernel,
        shutdown,
        _watcher: watcher,
    }
}

/// Serve `server` on an ephemeral port until the returned handle fires.
pub async fn serve(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    tokio::spawn(async move {
        let _ = server.run(listener, stopped).await;
    });
    (addr, shutdown)
}

/// Poll `check` until it holds or the deadline passes.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
