use super::content::WebContent;
use super::dispatch::{self, Reply};
use crate::error::WebError;
use crate::RecordService;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_http::{Header, Request, Response};
use tracing::{debug, error, info, warn};

/// How often idle workers check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Largest request body accepted; bigger ones get 413.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Running HTTP server: a listener plus a fixed pool of worker threads.
pub struct Server {
    addr: SocketAddr,
    http: Arc<tiny_http::Server>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Server {
    /// Binds `addr` and starts `workers` request threads (at least one).
    pub fn start(
        addr: &str,
        service: Arc<RecordService>,
        content: Arc<WebContent>,
        workers: usize,
    ) -> Result<Self, WebError> {
        let http = tiny_http::Server::http(addr).map_err(|e| WebError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let bound = http.server_addr().to_ip().ok_or_else(|| WebError::Bind {
            addr: addr.to_string(),
            reason: "unable to determine bound address".into(),
        })?;
        let http = Arc::new(http);
        let running = Arc::new(AtomicBool::new(true));

        let workers = (0..workers.max(1))
            .map(|n| {
                let http = http.clone();
                let running = running.clone();
                let service = service.clone();
                let content = content.clone();
                thread::Builder::new()
                    .name(format!("shelf-worker-{n}"))
                    .spawn(move || worker_loop(&http, &running, &service, &content))
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(addr = %bound, workers = workers.len(), "listening");
        Ok(Self {
            addr: bound,
            http,
            running,
            workers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops taking requests and waits up to `timeout` for in-flight ones.
    ///
    /// Requests the listener queued before the workers noticed are still
    /// answered. The socket closes once the last worker exits. Returns false
    /// when workers were still busy at the deadline; they are left to finish
    /// on their own.
    pub fn shutdown(self, timeout: Duration) -> bool {
        self.running.store(false, Ordering::SeqCst);
        for _ in &self.workers {
            self.http.unblock();
        }

        let (done_tx, done_rx) = mpsc::channel();
        let workers = self.workers;
        thread::spawn(move || {
            for worker in workers {
                if worker.join().is_err() {
                    error!("worker thread panicked");
                }
            }
            let _ = done_tx.send(());
        });

        match done_rx.recv_timeout(timeout) {
            Ok(()) => {
                info!("server stopped");
                true
            }
            Err(_) => {
                warn!(timeout = ?timeout, "shutdown timed out with requests in flight");
                false
            }
        }
    }
}

fn worker_loop(
    http: &tiny_http::Server,
    running: &AtomicBool,
    service: &RecordService,
    content: &WebContent,
) {
    while running.load(Ordering::SeqCst) {
        match http.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => serve(request, service, content),
            Ok(None) => {}
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    warn!(error = %e, "failed to receive request");
                }
            }
        }
    }
    while let Ok(Some(request)) = http.try_recv() {
        serve(request, service, content);
    }
    debug!("worker exiting");
}

fn serve(mut request: Request, service: &RecordService, content: &WebContent) {
    let started = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_string();

    let declared = request.body_length();
    let reply = match read_body(request.as_reader(), declared, MAX_BODY_BYTES) {
        Ok(body) => dispatch::handle(service, content, &method, &url, &body),
        Err(reply) => reply,
    };

    let status = reply.status;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status >= 500 {
        error!(%method, url = %url, status, elapsed_ms, "request failed");
    } else if status >= 400 {
        warn!(%method, url = %url, status, elapsed_ms, "request rejected");
    } else {
        info!(%method, url = %url, status, elapsed_ms, "request served");
    }

    if let Err(e) = request.respond(to_response(reply)) {
        warn!(error = %e, url = %url, "failed to send response");
    }
}

/// Reads at most `limit` bytes of body. Longer bodies, declared or actual,
/// become a 413 reply.
fn read_body(reader: impl Read, declared: Option<usize>, limit: u64) -> Result<Vec<u8>, Reply> {
    let too_large = || Reply {
        status: 413,
        content_type: "text/plain; charset=utf-8",
        body: b"request body too large".to_vec(),
    };
    if declared.is_some_and(|len| len as u64 > limit) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    match reader.take(limit + 1).read_to_end(&mut body) {
        Ok(_) if body.len() as u64 > limit => Err(too_large()),
        Ok(_) => Ok(body),
        Err(e) => {
            debug!(error = %e, "unreadable request body");
            Err(Reply {
                status: 400,
                content_type: "text/plain; charset=utf-8",
                body: b"malformed request body".to_vec(),
            })
        }
    }
}

fn to_response(reply: Reply) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_data(reply.body).with_status_code(reply.status);
    match Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn body_within_limit_is_read() {
        let body = read_body(Cursor::new(b"name=Orwell".to_vec()), Some(11), 16).unwrap();
        assert_eq!(body, b"name=Orwell");
    }

    #[test]
    fn declared_length_over_limit_is_rejected_unread() {
        let reply = read_body(Broken, Some(17), 16).unwrap_err();
        assert_eq!(reply.status, 413);
    }

    #[test]
    fn undeclared_body_over_limit_is_rejected() {
        let reply = read_body(Cursor::new(vec![b'a'; 17]), None, 16).unwrap_err();
        assert_eq!(reply.status, 413);
        assert_eq!(read_body(Cursor::new(vec![b'a'; 16]), None, 16).unwrap().len(), 16);
    }

    #[test]
    fn unreadable_body_is_a_bad_request() {
        assert_eq!(read_body(Broken, None, 16).unwrap_err().status, 400);
    }
}
