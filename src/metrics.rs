// Lock-free metrics using atomic counters
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

static REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REQUESTS_OK: AtomicU64 = AtomicU64::new(0);
static REQUESTS_ERR: AtomicU64 = AtomicU64::new(0);
static CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static ORIGIN_FETCHES: AtomicU64 = AtomicU64::new(0);
static BYTES_IN: AtomicU64 = AtomicU64::new(0);
static BYTES_OUT: AtomicU64 = AtomicU64::new(0);
static CONNECTIONS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LATENCY_SUM_MS: AtomicU64 = AtomicU64::new(0);
static LATENCY_MAX_MS: AtomicU64 = AtomicU64::new(0);

pub fn init() {
    START_TIME.get_or_init(Instant::now);
}

#[inline]
pub fn inc_requests() { REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_requests_ok() { REQUESTS_OK.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_requests_err() { REQUESTS_ERR.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_cache_hits() { CACHE_HITS.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_cache_misses() { CACHE_MISSES.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_origin_fetches() { ORIGIN_FETCHES.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn add_bytes_in(n: u64) { BYTES_IN.fetch_add(n, Ordering::Relaxed); }

#[inline]
pub fn add_bytes_out(n: u64) { BYTES_OUT.fetch_add(n, Ordering::Relaxed); }

#[inline]
pub fn inc_connections() { CONNECTIONS_TOTAL.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn record_latency(ms: u64) {
    LATENCY_SUM_MS.fetch_add(ms, Ordering::Relaxed);
    let mut current = LATENCY_MAX_MS.load(Ordering::Relaxed);
    while ms > current {
        match LATENCY_MAX_MS.compare_exchange_weak(current, ms, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(c) => current = c,
        }
    }
}

/// Snapshot of (total, ok, err). Total is loaded last: every path bumps it
/// before bumping ok or err, so the ok/err just read are already in it.
#[cfg(test)]
pub fn request_counts() -> (u64, u64, u64) {
    let err = REQUESTS_ERR.load(Ordering::Relaxed);
    let ok = REQUESTS_OK.load(Ordering::Relaxed);
    let total = REQUESTS_TOTAL.load(Ordering::Relaxed);
    (total, ok, err)
}

/// One-line counter summary, logged at shutdown.
pub fn summary() -> String {
    let total = REQUESTS_TOTAL.load(Ordering::Relaxed);
    let ok = REQUESTS_OK.load(Ordering::Relaxed);
    let err = REQUESTS_ERR.load(Ordering::Relaxed);
    let hits = CACHE_HITS.load(Ordering::Relaxed);
    let misses = CACHE_MISSES.load(Ordering::Relaxed);
    let fetches = ORIGIN_FETCHES.load(Ordering::Relaxed);
    let conns = CONNECTIONS_TOTAL.load(Ordering::Relaxed);
    let b_in = BYTES_IN.load(Ordering::Relaxed);
    let b_out = BYTES_OUT.load(Ordering::Relaxed);
    let lat_sum = LATENCY_SUM_MS.load(Ordering::Relaxed);
    let lat_max = LATENCY_MAX_MS.load(Ordering::Relaxed);
    let avg_lat = if total > 0 { lat_sum / total } else { 0 };
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    format!(
        "uptime {uptime}s | connections {conns} | requests {total} (ok {ok}, err {err}) | \
         cache {hits} hit / {misses} miss | origin fetches {fetches} | \
         bytes {b_in} in / {b_out} out | latency avg {avg_lat}ms max {lat_max}ms"
    )
}
