//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use command_relay::auth::{MemoryCredentialStore, TokenRefresher};
use command_relay::protocol::RawResponse;
use command_relay::{AppError, Transport, TransportFault};

/// One scripted transport reaction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this raw body (enveloped or legacy).
    Reply(Value),
    /// Fail at the transport level.
    Fault(TransportFault),
    /// Wait, then react.
    Delayed(Duration, Box<Step>),
}

impl Step {
    pub fn ok(data: Value) -> Self {
        Step::Reply(json!({ "success": true, "data": data }))
    }

    pub fn fail(code: &str, message: &str) -> Self {
        Step::Reply(json!({
            "success": false,
            "error": { "code": code, "message": message }
        }))
    }

    pub fn network(message: &str) -> Self {
        Step::Fault(TransportFault::network(message))
    }

    pub fn hang() -> Self {
        Step::Delayed(Duration::from_secs(3600), Box::new(Step::ok(Value::Null)))
    }

    pub fn after(self, delay: Duration) -> Self {
        Step::Delayed(delay, Box::new(self))
    }
}

type Responder = Box<dyn Fn(&str, &Value) -> Step + Send + Sync>;

/// Transport whose reactions are decided by the test.
pub struct ScriptedTransport {
    responder: Responder,
    calls: AtomicU32,
    seen: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    /// React with `f(command, args)` on every call.
    pub fn responding<F>(f: F) -> Arc<Self>
    where
        F: Fn(&str, &Value) -> Step + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(f),
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Same reaction every time.
    pub fn always(step: Step) -> Arc<Self> {
        Self::responding(move |_, _| step.clone())
    }

    /// Play `steps` in order, then repeat `fallback`.
    pub fn sequence(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(steps));
        Self::responding(move |_, _| queue.lock().unwrap().pop_front().unwrap_or_else(|| fallback.clone()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(&self, command: &str, args: Value) -> Result<RawResponse, TransportFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut step = (self.responder)(command, &args);
        self.seen.lock().unwrap().push((command.to_string(), args));

        loop {
            match step {
                Step::Delayed(delay, next) => {
                    tokio::time::sleep(delay).await;
                    step = *next;
                }
                Step::Reply(value) => return Ok(RawResponse::from_value(value)),
                Step::Fault(fault) => return Err(fault),
            }
        }
    }
}

/// Refresher that counts cycles and optionally installs a new access token.
pub struct CountingRefresher {
    calls: AtomicU32,
    delay: Duration,
    succeed: bool,
    store: Option<(Arc<MemoryCredentialStore>, String)>,
}

impl CountingRefresher {
    pub fn succeeding(store: Arc<MemoryCredentialStore>, new_token: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay,
            succeed: true,
            store: Some((store, new_token.to_string())),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            succeed: false,
            store: None,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh_access_token(&self) -> Result<bool, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if let Some((store, token)) = &self.store {
            store.set_access_token(token.clone());
        }
        Ok(self.succeed)
    }
}

/// A request captured by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Start a mock HTTP backend on an ephemeral port.
///
/// Every request is answered with `f(request)` as `(status, body)`.
pub async fn start_mock_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&CapturedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(&request);
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();
    Some(CapturedRequest { method, path, body })
}
