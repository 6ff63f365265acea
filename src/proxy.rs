// Per-connection proxy engine: parse, cache lookup, origin fetch, respond
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::ProxyError;
use crate::http::{self, FrameLimits, HttpRequest, HttpResponse, OriginReply, ReadResult, Status, SUPPORTED_VERSION};

pub struct ProxyEngine {
    cache: CacheStore,
    origin_port: u16,
    origin_timeout: Duration,
    buffer_size: usize,
    limits: FrameLimits,
}

impl ProxyEngine {
    pub fn new(cache: CacheStore, cfg: &Config) -> Self {
        ProxyEngine {
            cache,
            origin_port: cfg.origin_port,
            origin_timeout: Duration::from_secs(cfg.origin_timeout),
            buffer_size: cfg.buffer_size,
            limits: FrameLimits {
                max_header: cfg.max_header_size,
                max_body: cfg.max_body_size,
            },
        }
    }

    /// Drive one client connection end to end. Every failure past the first
    /// byte is answered with a well-formed 500; the caller closes the socket.
    pub fn serve(&self, client: &mut (impl Read + Write), peer: &str) {
        let started = Instant::now();

        let raw = match http::read_http_message(client, self.buffer_size, self.limits) {
            ReadResult::Ok(d) => d,
            ReadResult::Closed => return,
            ReadResult::Error(e) => {
                crate::log::warn(&format!("client read failed: {e}"));
                crate::metrics::inc_requests();
                crate::metrics::inc_requests_err();
                let resp = error_response("failed to read request");
                let _ = http::write_message(client, &resp.to_bytes());
                return;
            }
        };
        crate::metrics::add_bytes_in(raw.len() as u64);
        crate::metrics::inc_requests();
        crate::log::debug(&format!("{} byte request from {peer}", raw.len()));

        let outcome = match HttpRequest::parse(&raw) {
            Some(req) => {
                crate::log::request(&req.method, &req.uri, peer);
                self.process(&req)
            }
            None => Err(ProxyError::MalformedRequest("bad request line or headers")),
        };

        let resp = match outcome {
            Ok(resp) => {
                crate::metrics::inc_requests_ok();
                resp
            }
            Err(e) => {
                crate::log::warn(&e.to_string());
                crate::metrics::inc_requests_err();
                error_response(&e.to_string())
            }
        };

        let ms = started.elapsed().as_millis();
        crate::metrics::record_latency(ms as u64);
        let hit = resp.get_header("X-Cache") == Some("HIT");
        crate::log::response(resp.status.code(), ms, hit);

        let out = resp.to_bytes();
        crate::metrics::add_bytes_out(out.len() as u64);
        if http::write_message(client, &out).is_err() {
            crate::log::warn("failed to write response to client");
        }
    }

    /// The decision chain: version check, method dispatch, cache lookup,
    /// origin fetch, cache-write policy.
    fn process(&self, req: &HttpRequest) -> Result<HttpResponse, ProxyError> {
        if req.version > SUPPORTED_VERSION {
            return Err(ProxyError::UnsupportedVersion(req.version));
        }
        if req.method != "GET" {
            return Err(ProxyError::UnsupportedMethod(req.method.clone()));
        }
        let (host, path) = req
            .target()
            .ok_or(ProxyError::MalformedRequest("request target must name a host"))?;

        if self.cache.contains(&host, &path) {
            crate::metrics::inc_cache_hits();
            let payload = self.cache.read(&host, &path).map_err(ProxyError::CacheIo)?;
            let mut resp = HttpResponse::new(Status::Ok).with_body(payload);
            resp.set_header("X-Cache", "HIT");
            return Ok(resp);
        }

        crate::metrics::inc_cache_misses();
        let reply = self.fetch_origin(req, &host, &path)?;
        match Status::from_code(reply.code) {
            Some(Status::Ok) => {
                self.cache
                    .write(&host, &path, &reply.body)
                    .map_err(ProxyError::CacheIo)?;
                let mut headers = reply.headers;
                headers.push(("X-Cache".to_string(), "MISS".to_string()));
                Ok(HttpResponse::passthrough(Status::Ok, headers, reply.body))
            }
            // Recognized non-200 statuses pass through untouched and uncached
            Some(status) => Ok(HttpResponse::passthrough(status, reply.headers, reply.body)),
            // Anything else is normalized to 500, keeping the origin's payload
            None => Ok(HttpResponse::new(Status::InternalError).with_body(reply.body)),
        }
    }

    /// Forward the request to (host, origin_port) over a fresh connection and
    /// frame the reply the same way client messages are framed.
    fn fetch_origin(&self, req: &HttpRequest, host: &str, path: &str) -> Result<OriginReply, ProxyError> {
        let mut outbound = HttpRequest {
            method: req.method.clone(),
            uri: path.to_string(),
            version: SUPPORTED_VERSION,
            headers: vec![
                ("Host".to_string(), host.to_string()),
                ("Connection".to_string(), "close".to_string()),
            ],
            body: Vec::new(),
        };
        for (k, v) in &req.headers {
            if k.eq_ignore_ascii_case("Host") || k.eq_ignore_ascii_case("Connection") {
                continue;
            }
            outbound.headers.push((k.clone(), v.clone()));
        }

        crate::log::debug(&format!("origin fetch {host}:{}{path}", self.origin_port));
        let addr = (host, self.origin_port)
            .to_socket_addrs()
            .map_err(ProxyError::OriginUnreachable)?
            .next()
            .ok_or_else(|| {
                ProxyError::OriginUnreachable(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address for {host}"),
                ))
            })?;
        let mut origin =
            TcpStream::connect_timeout(&addr, self.origin_timeout).map_err(ProxyError::OriginUnreachable)?;
        let _ = origin.set_read_timeout(Some(self.origin_timeout));
        let _ = origin.set_write_timeout(Some(self.origin_timeout));
        let _ = origin.set_nodelay(true);

        http::write_message(&mut origin, &outbound.to_bytes()).map_err(ProxyError::OriginUnreachable)?;
        crate::metrics::inc_origin_fetches();

        let raw = match http::read_http_message(&mut origin, self.buffer_size, self.limits) {
            ReadResult::Ok(d) => d,
            ReadResult::Closed => {
                return Err(ProxyError::OriginUnreachable(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "origin closed without responding",
                )))
            }
            ReadResult::Error(e) => return Err(ProxyError::OriginUnreachable(io::Error::other(e))),
        };
        OriginReply::parse(&raw).ok_or(ProxyError::OriginMalformedResponse)
    }
}

fn error_response(detail: &str) -> HttpResponse {
    HttpResponse::new(Status::InternalError).with_body(detail.as_bytes().to_vec())
}
