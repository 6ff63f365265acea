// Per-connection failure kinds, all answered with a 500 at the serve boundary
use crate::http::Version;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),
    #[error("unsupported HTTP version {0}")]
    UnsupportedVersion(Version),
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
    #[error("origin unreachable: {0}")]
    OriginUnreachable(#[source] std::io::Error),
    #[error("origin sent a malformed response")]
    OriginMalformedResponse,
    #[error("cache I/O failure: {0}")]
    CacheIo(#[source] std::io::Error),
}
