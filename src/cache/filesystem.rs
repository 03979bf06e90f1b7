use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::cache::CacheStore;
use crate::error::CallError;
use crate::Result;

const CACHE_FILE_EXTENSION: &str = "gz";

// Distinguishes temporary files of concurrent writers within one process.
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One gzip compressed file per key inside a dedicated directory. Writes go
/// to a temporary file first and are renamed into place, so a reader never
/// sees a partially written entry.
pub struct FileStore {
    location: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(location: P) -> Self {
        FileStore {
            location: location.as_ref().to_path_buf(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn validate_cache_location(&self) -> Result<()> {
        let path = self.location.as_path();
        let cache_location = path.to_string_lossy();

        if !path.exists() {
            return Err(CallError::CacheStoreError(format!(
                "Cache directory does not exist: {cache_location}"
            ))
            .into());
        }

        if !path.is_dir() {
            return Err(CallError::CacheStoreError(format!(
                "Cache location is not a directory: {cache_location}"
            ))
            .into());
        }

        // Check if we can write to the directory
        let test_file_path = path.join(".write_test_cache_file");
        match File::create(&test_file_path) {
            Ok(_) => {
                if let Err(e) = fs::remove_file(&test_file_path) {
                    return Err(CallError::CacheStoreError(format!(
                        "Failed to remove cache test file {}: {}",
                        test_file_path.to_string_lossy(),
                        e
                    ))
                    .into());
                }
            }
            Err(e) => {
                return Err(CallError::CacheStoreError(format!(
                    "No write permission for cache directory {cache_location}: {e}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Keys are opaque strings, file names are their SHA-256 digest.
    pub fn get_cache_file(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key);
        let hash = hasher.finalize();
        self.location.join(format!("{hash:x}.{CACHE_FILE_EXTENSION}"))
    }

    fn read_cache_data(&self, reader: impl Read) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(BufReader::new(reader));
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        Ok(data)
    }

    fn persist_cache_data(&self, value: &[u8], f: BufWriter<File>) -> Result<()> {
        let mut encoder = GzEncoder::new(f, Compression::default());
        encoder.write_all(value)?;
        let mut f = encoder.finish()?;
        f.flush()?;
        Ok(())
    }

    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.location).map_err(|err| {
            CallError::CacheStoreError(format!(
                "Cannot list cache directory {}: {}",
                self.location.display(),
                err
            ))
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_FILE_EXTENSION)
            {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.get_cache_file(key);
        match File::open(&path) {
            Ok(f) => {
                let data = self.read_cache_data(f).map_err(|err| {
                    CallError::CacheStoreError(format!(
                        "Cannot read cache file {}: {}",
                        path.display(),
                        err
                    ))
                })?;
                Ok(Some(data))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.get_cache_file(key);
        let sequence = WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{}.{}.tmp", std::process::id(), sequence));
        let f = BufWriter::new(File::create(&tmp_path)?);
        if let Err(err) = self.persist_cache_data(value, f) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.get_cache_file(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(self.cache_files()?.len())
    }

    fn clear(&self) -> Result<()> {
        for path in self.cache_files()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get_cache_file(key).is_file())
    }
}
