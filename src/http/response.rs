// HTTP response construction, serialization, and origin-reply parsing
use super::{find_hdr_end, get_hdr, Version, SUPPORTED_VERSION};

/// The fixed set of statuses this proxy will put on a response it sends to a
/// client. Anything an origin returns outside this set is normalized to
/// InternalError before it reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    InternalError,
}

impl Status {
    pub fn from_code(code: u16) -> Option<Status> {
        match code {
            200 => Some(Status::Ok),
            404 => Some(Status::NotFound),
            500 => Some(Status::InternalError),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::InternalError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::InternalError => "Internal Error",
        }
    }
}

#[derive(Clone)]
pub struct HttpResponse {
    pub version: Version,
    pub status: Status,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with the baseline headers every proxy-built reply carries.
    pub fn new(status: Status) -> Self {
        HttpResponse {
            version: SUPPORTED_VERSION,
            status,
            headers: vec![
                ("Connection".to_string(), "close".to_string()),
                ("X-Cache".to_string(), "MISS".to_string()),
            ],
            body: Vec::new(),
        }
    }

    /// A response whose headers come from elsewhere (the origin), so no
    /// baseline headers are injected.
    pub fn passthrough(status: Status, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        HttpResponse { version: SUPPORTED_VERSION, status, headers, body }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.set_header("Content-Length", &body.len().to_string());
        self.body = body;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut o = format!("{} {} {}\r\n", self.version, self.status.code(), self.status.reason());
        for (k, v) in &self.headers {
            o.push_str(k);
            o.push_str(": ");
            o.push_str(v);
            o.push_str("\r\n");
        }
        o.push_str("\r\n");
        let mut b = o.into_bytes();
        b.extend_from_slice(&self.body);
        b
    }

    pub fn get_header(&self, n: &str) -> Option<&str> {
        get_hdr(&self.headers, n)
    }

    pub fn set_header(&mut self, n: &str, val: &str) {
        for (k, v) in self.headers.iter_mut() {
            if k.eq_ignore_ascii_case(n) {
                *v = val.to_string();
                return;
            }
        }
        self.headers.push((n.to_string(), val.to_string()));
    }
}

/// An origin's response as it came off the wire. Unlike HttpResponse the
/// status code is unrestricted; the proxy engine decides what becomes of it.
#[derive(Clone)]
pub struct OriginReply {
    pub code: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OriginReply {
    pub fn parse(r: &[u8]) -> Option<Self> {
        let e = find_hdr_end(r)?;
        let t = std::str::from_utf8(&r[..e]).ok()?;
        let mut l = t.lines();
        let sl = l.next()?;
        let (v, rest) = sl.split_once(' ')?;
        Version::parse(v)?;
        let (cs, reason) = rest.split_once(' ').unwrap_or((rest, ""));
        let code: u16 = cs.parse().ok()?;
        let mut h = Vec::new();
        for ln in l {
            if ln.is_empty() { break; }
            if let Some((k, val)) = ln.split_once(':') {
                h.push((k.trim().to_string(), val.trim().to_string()));
            }
        }
        let s = e + 4;
        let b = if s < r.len() { r[s..].to_vec() } else { Vec::new() };
        Some(OriginReply { code, reason: reason.to_string(), headers: h, body: b })
    }
}
