// Console logging with timestamps and a global level filter
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::SystemTime;

use crate::colors::*;

static ENABLED: AtomicBool = AtomicBool::new(true);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

#[derive(Clone, Copy, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    fn from_name(name: &str) -> Level {
        match name.to_lowercase().as_str() {
            "debug" => Level::Debug,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }
}

pub fn init(enabled: bool, level: &str) {
    ENABLED.store(enabled, Ordering::Relaxed);
    LOG_LEVEL.store(Level::from_name(level) as u8, Ordering::Relaxed);
}

fn emits(level: Level) -> bool {
    ENABLED.load(Ordering::Relaxed) && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    let millis = now.subsec_millis();
    let (year, month, day) = days_to_ymd(secs / 86400);
    let clock = secs % 86400;
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{millis:03}",
        clock / 3600,
        (clock % 3600) / 60,
        clock % 60
    )
}

/// Convert days since epoch to (year, month, day)
fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    let mut y = 1970;
    let mut remaining = days;
    loop {
        let days_in_year = if is_leap(y) { 366 } else { 365 };
        if remaining < days_in_year { break; }
        remaining -= days_in_year;
        y += 1;
    }
    let leap = is_leap(y);
    let months: [u64; 12] = [31, if leap {29} else {28}, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut mo = 0;
    for &dm in &months {
        if remaining < dm { break; }
        remaining -= dm;
        mo += 1;
    }
    (y, mo + 1, remaining + 1)
}

fn is_leap(y: u64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

pub fn debug(msg: &str) {
    if !emits(Level::Debug) { return; }
    let ts = timestamp();
    let _ = writeln!(io::stdout(), "{DIM}{ts}{RESET} {DIM}DBG{RESET} {msg}");
    let _ = io::stdout().flush();
}

pub fn info(msg: &str) {
    if !emits(Level::Info) { return; }
    let ts = timestamp();
    let _ = writeln!(io::stdout(), "{DIM}{ts}{RESET} {BOLD}{CYAN}{msg}{RESET}");
    let _ = io::stdout().flush();
}

pub fn warn(msg: &str) {
    if !emits(Level::Warn) { return; }
    let ts = timestamp();
    let _ = writeln!(io::stderr(), "{DIM}{ts}{RESET} {YELLOW}⚠ {msg}{RESET}");
    let _ = io::stderr().flush();
}

pub fn error(msg: &str) {
    if !ENABLED.load(Ordering::Relaxed) { return; }
    let ts = timestamp();
    let _ = writeln!(io::stderr(), "{DIM}{ts}{RESET} {RED}✗ {msg}{RESET}");
    let _ = io::stderr().flush();
}

pub fn request(method: &str, uri: &str, ip: &str) {
    if !emits(Level::Info) { return; }
    let ts = timestamp();
    let _ = writeln!(io::stdout(), "{DIM}{ts}{RESET} {YELLOW}→{RESET} {BOLD}{method}{RESET} {uri} from {ip}");
    let _ = io::stdout().flush();
}

pub fn response(status: u16, ms: u128, cache_hit: bool) {
    if !emits(Level::Info) { return; }
    let ts = timestamp();
    let col = status_color(status);
    let source = if cache_hit { format!(" {CYAN}[CACHE HIT]{RESET}") } else { String::new() };
    let _ = writeln!(io::stdout(), "{DIM}{ts}{RESET} {GREEN}←{RESET} {BOLD}{col}{status}{RESET} ({ms}ms){source}");
    let _ = io::stdout().flush();
}

pub fn separator() {
    if !ENABLED.load(Ordering::Relaxed) { return; }
    let _ = writeln!(io::stdout(), "{SEPARATOR}");
    let _ = io::stdout().flush();
}
