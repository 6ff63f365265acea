// File-backed response payload cache keyed by (host, path)
use std::fs;
use std::io;
use std::path::PathBuf;

/// Content-addressed store: one flat file per (host, path) pair under a
/// single root directory. Only response payload bytes are persisted, never
/// headers; entries are written once and never expired.
pub struct CacheStore {
    root: PathBuf,
}

/// In-progress writes land here before being renamed into the root.
const STAGING_DIR: &str = ".tmp";

impl CacheStore {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<CacheStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(CacheStore { root })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Flat filename for an entry: host and path concatenated, with every
    /// path separator replaced by a space. A space can never survive
    /// request-line tokenization, so distinct (host, path) pairs always map
    /// to distinct filenames and the substitution is reversible.
    fn key(host: &str, path: &str) -> String {
        format!("{host}{path}").replace('/', " ")
    }

    fn entry_path(&self, host: &str, path: &str) -> PathBuf {
        self.root.join(Self::key(host, path))
    }

    pub fn contains(&self, host: &str, path: &str) -> bool {
        self.entry_path(host, path).is_file()
    }

    /// Read a cached payload. Missing entries surface as ErrorKind::NotFound,
    /// never as an empty payload.
    pub fn read(&self, host: &str, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.entry_path(host, path))
    }

    /// Persist a payload, overwriting any previous entry (last write wins).
    /// Staged under a dedicated subdirectory and renamed into place so a
    /// concurrent reader never observes a half-written entry. Entries are
    /// flat files directly under the root, so the staging directory can
    /// never collide with an entry name.
    pub fn write(&self, host: &str, path: &str, payload: &[u8]) -> io::Result<()> {
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        let tmp = staging.join(Self::key(host, path));
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, self.entry_path(host, path))
    }
}
