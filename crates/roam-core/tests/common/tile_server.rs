//! Minimal HTTP/1.1 server that serves slippy-map tiles for integration tests.
//!
//! Answers every GET with a small static tile body. Selected paths can be
//! made to fail with 500, and responses can be delayed to exercise timeouts.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TILE_BODY: &[u8] = b"\x89PNG-tile-stub";

#[derive(Debug, Clone, Default)]
pub struct TileServerOptions {
    /// Request paths answered with 500 instead of a tile.
    pub fail_paths: HashSet<String>,
    /// Delay before answering any request.
    pub delay: Option<Duration>,
}

/// Handle to a running server.
pub struct TileServer {
    base_url: String,
    requests: Arc<AtomicUsize>,
}

impl TileServer {
    /// URL template for the engine config, e.g. `http://127.0.0.1:PORT/{z}/{x}/{y}.png`.
    pub fn template(&self) -> String {
        format!("{}/{{z}}/{{x}}/{{y}}.png", self.base_url)
    }

    /// Total requests received so far (including failed ones).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

pub fn start() -> TileServer {
    start_with_options(TileServerOptions::default())
}

/// Starts a server in a background thread. The server runs until the
/// process exits.
pub fn start_with_options(opts: TileServerOptions) -> TileServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let opts = Arc::clone(&opts);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &opts, &counter));
        }
    });
    TileServer {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(mut stream: std::net::TcpStream, opts: &TileServerOptions, requests: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = match parse_path(request) {
        Some(path) => path,
        None => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
            return;
        }
    };
    requests.fetch_add(1, Ordering::Relaxed);

    if let Some(delay) = opts.delay {
        thread::sleep(delay);
    }

    if opts.fail_paths.contains(&path) {
        let _ =
            stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\r\n",
        TILE_BODY.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(TILE_BODY);
}

/// Returns the path of a GET request line ("GET /12/3491/1585.png HTTP/1.1").
fn parse_path(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    parts.next().map(|p| p.to_string())
}
