use crate::types::{VegError, VegResult};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Anything that can hand out named blobs (lookup tables, legends, rasters)
pub trait DataSource {
    fn fetch(&self, name: &str) -> VegResult<Vec<u8>>;
}

/// Files below a root directory
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl DataSource for FileSource {
    fn fetch(&self, name: &str) -> VegResult<Vec<u8>> {
        let path = self.root.join(name);
        log::debug!("Reading {}", path.display());
        Ok(std::fs::read(path)?)
    }
}

/// In-memory blobs, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    blobs: HashMap<String, Vec<u8>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.blobs.insert(name.to_string(), content.into());
        self
    }
}

impl DataSource for StaticSource {
    fn fetch(&self, name: &str) -> VegResult<Vec<u8>> {
        self.blobs.get(name).cloned().ok_or_else(|| {
            VegError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no blob named '{}'", name),
            ))
        })
    }
}

/// Reversible file-name encoding: ASCII alphanumerics, '-' and non-leading '.' are
/// kept, every other byte becomes `_XX`. Distinct inputs never share a key.
fn cache_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for (i, byte) in text.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
        if keep {
            key.push(byte as char);
        } else {
            key.push_str(&format!("_{:02X}", byte));
        }
    }
    if key.is_empty() {
        key.push('_');
    }
    key
}

/// Files served over HTTP(S), optionally cached on disk
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    cache_dir: Option<PathBuf>,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_cache_dir<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Platform cache directory for downloaded lookup tables
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("verdin"))
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    /// One subdirectory per base URL, one file per name
    fn cache_path(&self, name: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_key(&self.base_url)).join(cache_key(name)))
    }

    fn download(&self, url: &str) -> VegResult<Vec<u8>> {
        log::info!("Downloading {}", url);

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| VegError::Http(format!("Failed to create HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| VegError::Http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VegError::Http(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| VegError::Http(format!("Failed to read response bytes: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn store(&self, path: &Path, content: &[u8]) -> VegResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content)?;
        tmp.persist(path).map_err(|e| VegError::Io(e.error))?;
        log::debug!("Cached {} bytes at {}", content.len(), path.display());
        Ok(())
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, name: &str) -> VegResult<Vec<u8>> {
        let cache_path = self.cache_path(name);
        if let Some(path) = cache_path.as_ref().filter(|p| p.exists()) {
            log::info!("Using cached copy: {}", path.display());
            return Ok(std::fs::read(path)?);
        }

        let content = self.download(&self.url_for(name))?;
        if let Some(path) = cache_path {
            self.store(&path, &content)?;
        }
        Ok(content)
    }
}
