// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Produces the training text from either a local file or a URL.
//
// Remote corpora are downloaded once and cached on disk, the
// same way the dataset helpers of most ML frameworks do it:
//
//   data/
//     shakespeare.txt   ← written on first run, read afterwards
//
// The bytes are decoded as strict UTF-8. A corpus with invalid
// UTF-8 is rejected rather than silently repaired, because a
// replacement character would end up in the vocabulary.

use anyhow::{ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::corpus::Corpus;
use crate::domain::traits::CorpusSource;

pub const SHAKESPEARE_URL: &str =
    "https://storage.googleapis.com/download.tensorflow.org/data/shakespeare.txt";
pub const SHAKESPEARE_FILE: &str = "shakespeare.txt";

// ─── FileCorpus ───────────────────────────────────────────────────────────────
/// Reads the corpus from a local UTF-8 file.
pub struct FileCorpus {
    path: PathBuf,
}

impl FileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for FileCorpus {
    fn load(&self) -> Result<Corpus> {
        let text = read_utf8(&self.path)?;
        let source = self.path.display().to_string();
        tracing::info!("Loaded corpus '{}' ({} bytes)", source, text.len());
        Ok(Corpus::new(source, text))
    }
}

// ─── RemoteCorpus ─────────────────────────────────────────────────────────────
/// Downloads the corpus into `cache_dir/file_name` unless it is already there.
pub struct RemoteCorpus {
    url:       String,
    cache_dir: PathBuf,
    file_name: String,
}

impl RemoteCorpus {
    pub fn new(
        url:       impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            url:       url.into(),
            cache_dir: cache_dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn cached_path(&self) -> PathBuf {
        self.cache_dir.join(&self.file_name)
    }

    fn download(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Cannot create cache directory '{}'", self.cache_dir.display())
        })?;

        tracing::info!("Downloading '{}'", self.url);
        let bytes = burn::data::network::downloader::download_file_as_bytes(
            &self.url,
            &self.file_name,
        );
        self.store(path, bytes)
    }

    /// Write a downloaded body to the cache. Only non-empty UTF-8 text
    /// is cached, so a failed download is retried on the next run.
    fn store(&self, path: &Path, bytes: Vec<u8>) -> Result<()> {
        ensure!(!bytes.is_empty(), "Download of '{}' returned no data", self.url);
        let text = String::from_utf8(bytes)
            .with_context(|| format!("Download of '{}' is not valid UTF-8 text", self.url))?;

        fs::write(path, &text)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Cached {} bytes at '{}'", text.len(), path.display());
        Ok(())
    }
}

impl CorpusSource for RemoteCorpus {
    fn load(&self) -> Result<Corpus> {
        let path = self.cached_path();
        if path.exists() {
            tracing::debug!("Using cached corpus '{}'", path.display());
        } else {
            self.download(&path)?;
        }
        let text = read_utf8(&path)?;
        Ok(Corpus::new(self.url.clone(), text))
    }
}

/// A local file when `path` is given, otherwise `url` cached under `cache_dir`.
pub fn corpus_source(path: Option<&str>, url: &str, cache_dir: &str) -> Box<dyn CorpusSource> {
    match path {
        Some(p) => Box::new(FileCorpus::new(p)),
        None => {
            let file_name = url
                .rsplit('/')
                .find(|seg| !seg.is_empty())
                .unwrap_or(SHAKESPEARE_FILE);
            Box::new(RemoteCorpus::new(url, cache_dir, file_name))
        }
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read corpus '{}'", path.display()))?;
    String::from_utf8(bytes)
        .with_context(|| format!("Corpus '{}' is not valid UTF-8", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_corpus_reads_text() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.txt");
        fs::write(&path, "To be, or not to be").unwrap();

        let corpus = FileCorpus::new(&path).load().unwrap();
        assert_eq!(corpus.text, "To be, or not to be");
        assert_eq!(corpus.char_len(), 19);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0x66, 0x6f, 0xff, 0xfe]).unwrap();

        assert!(FileCorpus::new(&path).load().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileCorpus::new(dir.path().join("nope.txt")).load().is_err());
    }

    #[test]
    fn test_corpus_source_prefers_local_path() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.txt");
        fs::write(&path, "local").unwrap();

        let source = corpus_source(path.to_str(), SHAKESPEARE_URL, "unused");
        assert_eq!(source.load().unwrap().text, "local");
    }

    #[test]
    fn test_corpus_source_caches_under_url_file_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shakespeare.txt"), "cached").unwrap();

        let cache  = dir.path().to_str().unwrap();
        let source = corpus_source(None, SHAKESPEARE_URL, cache);
        assert_eq!(source.load().unwrap().text, "cached");
    }

    #[test]
    fn test_remote_corpus_uses_cache_without_network() {
        let dir    = tempfile::tempdir().unwrap();
        let remote = RemoteCorpus::new("http://invalid.localhost/x.txt", dir.path(), "x.txt");
        fs::write(remote.cached_path(), "cached text").unwrap();

        let corpus = remote.load().unwrap();
        assert_eq!(corpus.text, "cached text");
        assert_eq!(corpus.source, "http://invalid.localhost/x.txt");
    }

    #[test]
    fn test_bad_download_is_not_cached() {
        let dir    = tempfile::tempdir().unwrap();
        let remote = RemoteCorpus::new("http://invalid.localhost/x.txt", dir.path(), "x.txt");
        let path   = remote.cached_path();

        assert!(remote.store(&path, vec![0x3c, 0xff, 0xfe]).is_err());
        assert!(remote.store(&path, Vec::new()).is_err());
        assert!(!path.exists());

        remote.store(&path, b"good text".to_vec()).unwrap();
        assert_eq!(remote.load().unwrap().text, "good text");
    }
}
