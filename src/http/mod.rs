// HTTP/1.1 message framing and wire-format parsing
mod request;
mod response;
pub use request::HttpRequest;
pub use response::{HttpResponse, OriginReply, Status};
use std::fmt;
use std::io::{Read, Write};

pub const MAX_HEADER_SIZE: usize = 65_536;
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Size ceilings enforced while framing a message. The constants above are
/// the defaults; the proxy engine carries the operator-configured values.
#[derive(Clone, Copy)]
pub struct FrameLimits {
    pub max_header: usize,
    pub max_body: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        FrameLimits { max_header: MAX_HEADER_SIZE, max_body: MAX_BODY_SIZE }
    }
}

/// The single protocol version this proxy speaks.
pub const SUPPORTED_VERSION: Version = Version { major: 1, minor: 1 };

/// Numeric HTTP version, ordered so that 1.0 < 1.1 < 2.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    /// Parse a version token such as "HTTP/1.1". The protocol marker is
    /// matched case-insensitively, the numeric suffix must be digits.digits.
    pub fn parse(token: &str) -> Option<Version> {
        let marker = token.get(..5)?;
        if !marker.eq_ignore_ascii_case("HTTP/") {
            return None;
        }
        let (major, minor) = token[5..].split_once('.')?;
        Some(Version {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

pub fn find_hdr_end(d: &[u8]) -> Option<usize> {
    if d.len() < 4 { return None; }
    for i in 0..=(d.len() - 4) {
        if &d[i..i + 4] == b"\r\n\r\n" { return Some(i); }
    }
    None
}

pub fn get_hdr<'a>(h: &'a [(String, String)], n: &str) -> Option<&'a str> {
    for (k, v) in h {
        if k.eq_ignore_ascii_case(n) { return Some(v.as_str()); }
    }
    None
}

fn raw_hdr<'a>(t: &'a str, n: &str) -> Option<&'a str> {
    for l in t.lines() {
        if let Some((k, v)) = l.split_once(':') {
            if k.trim().eq_ignore_ascii_case(n) { return Some(v.trim()); }
        }
    }
    None
}

pub enum ReadResult {
    Ok(Vec<u8>),
    /// The peer closed (or went idle) before sending a single byte.
    Closed,
    Error(String),
}

/// Read one HTTP message off a stream: accumulate until the blank line that
/// ends the header block, then until Content-Length bytes of payload have
/// arrived. A message with no Content-Length ends at the header block plus
/// whatever payload was already buffered. The peer closing the stream (or
/// idling past its read timeout) before the declared length is reached ends
/// the body early rather than failing; origins that close without honoring
/// their own Content-Length are common enough to tolerate.
pub fn read_http_message(r: &mut impl Read, buf_size: usize, limits: FrameLimits) -> ReadResult {
    let mut d = Vec::with_capacity(buf_size);
    let mut b = vec![0u8; buf_size];
    let (mut hdr_done, mut body_start, mut content_len) = (false, 0usize, None::<usize>);

    loop {
        match r.read(&mut b) {
            Ok(0) => break,
            Ok(n) => {
                d.extend_from_slice(&b[..n]);

                if !hdr_done {
                    if d.len() > limits.max_header {
                        return ReadResult::Error("headers too large".into());
                    }
                    if let Some(p) = find_hdr_end(&d) {
                        hdr_done = true;
                        body_start = p + 4;
                        let hdr_text = match std::str::from_utf8(&d[..p]) {
                            Ok(t) => t,
                            Err(_) => return ReadResult::Error("invalid header encoding".into()),
                        };
                        content_len = raw_hdr(hdr_text, "Content-Length")
                            .and_then(|v| v.parse::<usize>().ok());
                        match content_len {
                            Some(cl) if cl > limits.max_body => {
                                return ReadResult::Error("body too large".into());
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                }

                if hdr_done {
                    if let Some(cl) = content_len {
                        if d.len() - body_start >= cl { break; }
                    }
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut
                       || e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return ReadResult::Error(e.to_string()),
        }
    }

    if d.is_empty() {
        ReadResult::Closed
    } else {
        ReadResult::Ok(d)
    }
}

/// Write a serialized message in full; short writes are retried by write_all.
pub fn write_message(w: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    w.write_all(bytes)?;
    w.flush()
}
