// HTTP request parsing and serialization
use super::{find_hdr_end, get_hdr, Version};

#[derive(Clone)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parse a raw HTTP request. Returns None for malformed input: a request
    /// line that is not exactly three space-separated tokens, or a version
    /// token without a numeric HTTP/x.y marker.
    pub fn parse(r: &[u8]) -> Option<Self> {
        let e = find_hdr_end(r)?;
        let t = std::str::from_utf8(&r[..e]).ok()?;
        let mut l = t.lines();
        let rl = l.next()?;
        let mut p = rl.split(' ');
        let m = p.next()?.to_string();
        let uri = p.next()?.to_string();
        let v = Version::parse(p.next()?)?;

        if p.next().is_some() { return None; }
        if m.is_empty() || uri.is_empty() { return None; }
        if uri.bytes().any(|b| b < 0x20 || b == 0x7F) { return None; }

        let mut h = Vec::new();
        for ln in l {
            if ln.is_empty() { break; }
            if let Some((k, val)) = ln.split_once(':') {
                h.push((k.trim().to_string(), val.trim().to_string()));
            }
        }
        let s = e + 4;
        let cl: Option<usize> = get_hdr(&h, "Content-Length").and_then(|v| v.parse().ok());
        let b = match cl {
            Some(len) if s < r.len() => r[s..r.len().min(s + len)].to_vec(),
            _ => Vec::new(),
        };
        Some(HttpRequest { method: m, uri, version: v, headers: h, body: b })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut o = format!("{} {} {}\r\n", self.method, self.uri, self.version);
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

    /// Split the request target into (host, path) for cache keying and the
    /// outbound connection. The scheme is optional, an empty path becomes "/",
    /// a query string stays part of the path, and a :port suffix on the host
    /// is dropped (the outbound port is the proxy's own concern).
    pub fn target(&self) -> Option<(String, String)> {
        let rest = match self.uri.split_once("://") {
            Some((_, r)) => r,
            None => self.uri.as_str(),
        };
        let (host, path) = match rest.find(['/', '?']) {
            Some(i) if rest.as_bytes()[i] == b'/' => (&rest[..i], rest[i..].to_string()),
            Some(i) => (&rest[..i], format!("/{}", &rest[i..])),
            None => (rest, "/".to_string()),
        };
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() { return None; }
        Some((host.to_string(), path))
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
