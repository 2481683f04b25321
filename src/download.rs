//! Dataset downloading and unpacking
//!
//! Fetches the public train/test archives over HTTP with progress reporting,
//! optionally verifies their SHA-256, unpacks them below the dataset root and
//! renames the extracted folders to `train` and `test`.

use crate::config::{DatasetSource, DownloadConfig};
use crate::error::{Result, RpsError};
use crate::services::{ProgressReporter, ProgressUnit};
use crate::types::{DatasetLayout, Split};
use futures_util::stream::TryStreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::Instrument;

/// Downloads and prepares the gesture dataset
pub struct DatasetDownloader {
    client: Client,
    config: DownloadConfig,
    layout: DatasetLayout,
    reporter: Arc<dyn ProgressReporter>,
}

impl DatasetDownloader {
    /// Create a new dataset downloader
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(
        config: DownloadConfig,
        layout: DatasetLayout,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RpsError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            config,
            layout,
            reporter,
        })
    }

    fn sources(&self) -> [(Split, &DatasetSource); 2] {
        [(Split::Train, &self.config.train), (Split::Test, &self.config.test)]
    }

    /// Where the temporary archive for `source` is written
    #[must_use]
    pub fn archive_path(&self, source: &DatasetSource) -> PathBuf {
        self.config.archive_dir.join(source.archive_name())
    }

    /// Run the whole download workflow
    ///
    /// Creates the dataset root, fetches and unpacks both archives, renames
    /// the extracted folders and deletes the archives.
    pub async fn download_dataset(&self) -> Result<()> {
        let root = self.layout.root();
        if !root.exists() {
            fs::create_dir_all(root)
                .map_err(|e| RpsError::file_io_error("create dataset directory", root, &e))?;
        }

        for (split, source) in self.sources() {
            let archive = self.archive_path(source);
            let span = crate::tracing_config::spans::download(&source.url, &archive);

            log::info!("📥 Downloading {} set from {}", split, source.url);
            self.fetch(&source.url, &archive).instrument(span).await?;
            Self::verify_archive(&archive, source.sha256.as_deref())?;
        }

        for (_, source) in self.sources() {
            self.extract(&self.archive_path(source), root).await?;
        }

        self.rename_extracted()?;
        self.cleanup_archives()?;
        log::info!("✅ Dataset ready in {}", root.display());
        Ok(())
    }

    /// Download `url` to `destination`, returning the number of bytes written
    ///
    /// With a known content length the body is streamed in `chunk_size`
    /// chunks; otherwise it is buffered and written in one go.
    ///
    /// # Errors
    /// - Request failure or non-success status
    /// - Failed to create or write the destination file
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        log::debug!("Downloading: {} -> {}", url, destination.display());

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RpsError::file_io_error("create directory", parent, &e))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RpsError::network_error(format!("Failed to download {}", url), e))?;

        if !response.status().is_success() {
            return Err(RpsError::network_error(
                format!("Failed to download {}", url),
                format!("HTTP status {}", response.status()),
            ));
        }

        let label = format!(
            "Downloading {}",
            destination
                .file_name()
                .map_or_else(|| url.to_string(), |n| n.to_string_lossy().into_owned())
        );

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| RpsError::file_io_error("create file", destination, &e))?;

        let downloaded = match response.content_length() {
            Some(total) => {
                self.reporter.start(&label, Some(total), ProgressUnit::Bytes);

                let mut stream = StreamReader::new(
                    response
                        .bytes_stream()
                        .map_err(|e| std::io::Error::new(ErrorKind::Other, e)),
                );

                let mut downloaded = 0u64;
                let mut buffer = vec![0; self.config.chunk_size.max(1)];
                loop {
                    let bytes_read = tokio::io::AsyncReadExt::read(&mut stream, &mut buffer)
                        .await
                        .map_err(|e| RpsError::network_error("Failed to read download stream", e))?;

                    if bytes_read == 0 {
                        break;
                    }

                    file.write_all(buffer.get(..bytes_read).unwrap_or(&[]))
                        .await
                        .map_err(|e| RpsError::file_io_error("write to file", destination, &e))?;

                    downloaded += bytes_read as u64;
                    self.reporter.advance(bytes_read as u64);
                }
                downloaded
            },
            None => {
                self.reporter.start(&label, None, ProgressUnit::Bytes);
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| RpsError::network_error("Failed to read download body", e))?;
                file.write_all(&body)
                    .await
                    .map_err(|e| RpsError::file_io_error("write to file", destination, &e))?;
                self.reporter.advance(body.len() as u64);
                body.len() as u64
            },
        };

        file.flush()
            .await
            .map_err(|e| RpsError::file_io_error("flush file", destination, &e))?;

        self.reporter.finish(&format!("Downloaded {}", destination.display()));
        log::debug!("Downloaded {} bytes to {}", downloaded, destination.display());
        Ok(downloaded)
    }

    /// Check an archive against its expected SHA-256 (hex), if one is configured
    ///
    /// # Errors
    /// - Failed to read the archive
    /// - Digest mismatch
    pub fn verify_archive(path: &Path, expected_sha256: Option<&str>) -> Result<()> {
        let Some(expected) = expected_sha256 else {
            return Ok(());
        };

        let contents = fs::read(path)
            .map_err(|e| RpsError::file_io_error("read file for verification", path, &e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let actual = format!("{:x}", hasher.finalize());

        if actual.eq_ignore_ascii_case(expected.trim()) {
            log::debug!("Checksum verified for {}", path.display());
            Ok(())
        } else {
            Err(RpsError::archive(format!(
                "integrity check failed for {}: expected {}, got {}",
                path.display(),
                expected,
                actual
            )))
        }
    }

    /// Unpack every entry of `archive` below `destination`
    ///
    /// Entries whose names would escape `destination` are skipped. Returns the
    /// number of entries processed.
    pub async fn extract(&self, archive: &Path, destination: &Path) -> Result<usize> {
        let delay = self.config.extract_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let archive = archive.to_path_buf();
        let destination = destination.to_path_buf();
        let reporter = Arc::clone(&self.reporter);

        tokio::task::spawn_blocking(move || extract_zip(&archive, &destination, reporter.as_ref()))
            .await
            .map_err(|e| RpsError::internal(format!("extraction task failed: {}", e)))?
    }

    /// Rename the extracted folders to `train` and `test`
    ///
    /// A canonical folder that already exists is left alone, so running this
    /// twice is harmless.
    ///
    /// # Errors
    /// - `DatasetNotFound` when neither the canonical nor the extracted folder exists
    pub fn rename_extracted(&self) -> Result<()> {
        for (split, source) in self.sources() {
            let target = self.layout.split_dir(split);
            let extracted = self.layout.root().join(source.extracted_dir_name());

            if target.exists() {
                log::info!("Folder {} already exists", target.display());
                continue;
            }
            if !extracted.exists() {
                return Err(RpsError::DatasetNotFound(extracted));
            }

            fs::rename(&extracted, &target)
                .map_err(|e| RpsError::file_io_error("rename extracted folder", &extracted, &e))?;
            log::debug!("Renamed {} -> {}", extracted.display(), target.display());
        }
        Ok(())
    }

    /// Delete the downloaded archives; missing files are not an error
    pub fn cleanup_archives(&self) -> Result<()> {
        for (_, source) in self.sources() {
            let archive = self.archive_path(source);
            match fs::remove_file(&archive) {
                Ok(()) => log::debug!("Removed {}", archive.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("{} already removed", archive.display());
                },
                Err(e) => return Err(RpsError::file_io_error("remove archive", &archive, &e)),
            }
        }
        Ok(())
    }
}

fn extract_zip(
    archive: &Path,
    destination: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<usize> {
    let file = fs::File::open(archive)
        .map_err(|e| RpsError::file_io_error("open archive", archive, &e))?;
    let mut zip = zip::ZipArchive::new(std::io::BufReader::new(file)).map_err(|e| {
        RpsError::archive(format!("{} is not a zip archive: {}", archive.display(), e))
    })?;

    let total = zip.len();
    reporter.start(
        &format!("Extracting {}", archive.display()),
        Some(total as u64),
        ProgressUnit::Items,
    );

    for i in 0..total {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| RpsError::archive(format!("failed to read entry {}: {}", i, e)))?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            log::warn!("Skipping unsafe archive entry {}", entry.name());
            reporter.advance(1);
            continue;
        };
        let out_path = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| RpsError::file_io_error("create directory", &out_path, &e))?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| RpsError::file_io_error("create directory", parent, &e))?;
            }
            let mut out_file = fs::File::create(&out_path)
                .map_err(|e| RpsError::file_io_error("create file", &out_path, &e))?;
            std::io::copy(&mut entry, &mut out_file)
                .map_err(|e| RpsError::file_io_error("extract", &out_path, &e))?;
        }
        reporter.advance(1);
    }

    reporter.finish(&format!("Extracted {}", archive.display()));
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoOpProgressReporter;
    use crate::test_utils::RecordingProgressReporter;
    use std::io::Write;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a local port
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/rps.zip", addr)
    }

    fn downloader(temp: &TempDir, reporter: Arc<dyn ProgressReporter>) -> DatasetDownloader {
        let config = DownloadConfig {
            archive_dir: temp.path().to_path_buf(),
            extract_delay_ms: 0,
            ..DownloadConfig::default()
        };
        let layout = DatasetLayout::new(temp.path().join("rock_paper_scissors"));
        DatasetDownloader::new(config, layout, reporter).unwrap()
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_fetch_with_content_length_reports_total() {
        let temp = TempDir::new().unwrap();
        let body = vec![7u8; 10_000];
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body).await;

        let reporter = Arc::new(RecordingProgressReporter::default());
        let dl = downloader(&temp, reporter.clone());
        let dest = temp.path().join("rps.zip");

        let written = dl.fetch(&url, &dest).await.unwrap();

        assert_eq!(written, 10_000);
        assert_eq!(fs::metadata(&dest).unwrap().len(), 10_000);
        assert_eq!(reporter.last_total(), Some(10_000));
        assert_eq!(reporter.advanced(), 10_000);
        assert_eq!(reporter.finished().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_without_content_length_buffers_body() {
        let temp = TempDir::new().unwrap();
        let body = b"no length header".to_vec();
        let head = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, body).await;

        let reporter = Arc::new(RecordingProgressReporter::default());
        let dl = downloader(&temp, reporter.clone());
        let dest = temp.path().join("rps.zip");

        let written = dl.fetch(&url, &dest).await.unwrap();

        assert_eq!(written, 16);
        assert_eq!(fs::read(&dest).unwrap(), b"no length header");
        assert_eq!(reporter.last_total(), None);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let temp = TempDir::new().unwrap();
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
            Vec::new(),
        )
        .await;

        let dl = downloader(&temp, Arc::new(NoOpProgressReporter));
        let err = dl.fetch(&url, &temp.path().join("rps.zip")).await.unwrap_err();
        assert!(matches!(err, RpsError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_verify_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rps.zip");
        fs::write(&path, "test content").unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"test content");
        let digest = format!("{:x}", hasher.finalize());

        assert!(DatasetDownloader::verify_archive(&path, None).is_ok());
        assert!(DatasetDownloader::verify_archive(&path, Some(&digest)).is_ok());
        assert!(DatasetDownloader::verify_archive(&path, Some(&digest.to_uppercase())).is_ok());

        let err = DatasetDownloader::verify_archive(&path, Some(&"0".repeat(64))).unwrap_err();
        assert!(matches!(err, RpsError::Archive(_)));
    }

    #[tokio::test]
    async fn test_extract_reports_each_entry() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("rps.zip");
        write_zip(
            &archive,
            &[
                ("rps/rock/a.png", b"r"),
                ("rps/paper/b.png", b"p"),
                ("../escape.txt", b"x"),
            ],
        );

        let reporter = Arc::new(RecordingProgressReporter::default());
        let dl = downloader(&temp, reporter.clone());
        let out = temp.path().join("out");

        let entries = dl.extract(&archive, &out).await.unwrap();

        assert_eq!(entries, 3);
        assert_eq!(fs::read(out.join("rps/rock/a.png")).unwrap(), b"r");
        assert!(out.join("rps/paper/b.png").is_file());
        assert!(!temp.path().join("escape.txt").exists());
        assert_eq!(reporter.last_total(), Some(3));
        assert_eq!(reporter.advanced(), 3);
    }

    #[tokio::test]
    async fn test_extract_rejects_non_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("rps.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let dl = downloader(&temp, Arc::new(NoOpProgressReporter));
        let err = dl.extract(&archive, temp.path()).await.unwrap_err();
        assert!(matches!(err, RpsError::Archive(_)));
    }

    #[test]
    fn test_rename_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dl = downloader(&temp, Arc::new(NoOpProgressReporter));
        let root = temp.path().join("rock_paper_scissors");
        fs::create_dir_all(root.join("rps/rock")).unwrap();
        fs::create_dir_all(root.join("rps-test-set/rock")).unwrap();

        dl.rename_extracted().unwrap();
        assert!(root.join("train/rock").is_dir());
        assert!(root.join("test/rock").is_dir());
        assert!(!root.join("rps").exists());

        dl.rename_extracted().unwrap();
        assert!(root.join("train/rock").is_dir());
    }

    #[test]
    fn test_rename_without_extracted_folders() {
        let temp = TempDir::new().unwrap();
        let dl = downloader(&temp, Arc::new(NoOpProgressReporter));
        fs::create_dir_all(temp.path().join("rock_paper_scissors")).unwrap();

        let err = dl.rename_extracted().unwrap_err();
        assert!(matches!(err, RpsError::DatasetNotFound(_)));
    }

    #[test]
    fn test_cleanup_ignores_missing_archives() {
        let temp = TempDir::new().unwrap();
        let dl = downloader(&temp, Arc::new(NoOpProgressReporter));
        fs::write(temp.path().join("rps.zip"), b"x").unwrap();

        dl.cleanup_archives().unwrap();
        assert!(!temp.path().join("rps.zip").exists());
        dl.cleanup_archives().unwrap();
    }
}
