use crate::lock::checkpoint;
use crate::StoreError;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const CHUNK: usize = 64 * 1024;

/// A finished download sitting in a temp file, with its blake3 digest.
pub struct Downloaded {
    pub file: NamedTempFile,
    pub checksum: String,
    pub bytes: u64,
}

/// Fetches source archives over HTTP(S), or from `file://` URLs for local
/// mirrors.
pub struct Downloader {
    agent: ureq::Agent,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Stream `url` into a temp file inside `temp_dir`, hashing as it goes.
    pub fn download(&self, url: &str, temp_dir: &Path) -> Result<Downloaded, StoreError> {
        if let Some(path) = url.strip_prefix("file://") {
            let file = std::fs::File::open(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::NotFound(url.to_owned()),
                _ => StoreError::Io(e),
            })?;
            return copy_hashed(file, temp_dir);
        }

        debug!("GET {url}");
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(StoreError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(StoreError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(StoreError::Http(format!("{url}: {e}")));
            }
        };
        let reader = resp.into_body().into_reader();
        copy_hashed(reader, temp_dir)
    }
}

fn copy_hashed(mut reader: impl Read, temp_dir: &Path) -> Result<Downloaded, StoreError> {
    std::fs::create_dir_all(temp_dir)?;
    let mut tmp = NamedTempFile::new_in(temp_dir)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK];
    let mut bytes: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        tmp.write_all(&buf[..n])?;
        bytes += n as u64;
        checkpoint()?;
    }
    tmp.as_file().sync_all()?;
    Ok(Downloaded {
        file: tmp,
        checksum: hasher.finalize().to_hex().to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    /// Serves `body` for `/ok` and 404 for anything else, one request per
    /// connection.
    fn serve(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                        break;
                    }
                }
                let path = request_line.split(' ').nth(1).unwrap_or("");
                if path == "/ok" {
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = stream.write_all(head.as_bytes());
                    let _ = stream.write_all(body);
                } else {
                    let _ = stream.write_all(
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    );
                }
                let _ = stream.flush();
            }
        });
        addr
    }

    #[test]
    fn http_download_is_hashed() {
        let addr = serve(b"archive bytes");
        let dir = tempfile::tempdir().unwrap();
        let got = Downloader::new()
            .download(&format!("{addr}/ok"), dir.path())
            .unwrap();
        assert_eq!(got.bytes, 13);
        assert_eq!(got.checksum, blake3::hash(b"archive bytes").to_hex().to_string());
        assert_eq!(std::fs::read(got.file.path()).unwrap(), b"archive bytes");
    }

    #[test]
    fn http_404_is_not_found() {
        let addr = serve(b"");
        let dir = tempfile::tempdir().unwrap();
        let err = Downloader::new()
            .download(&format!("{addr}/missing"), dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn connection_refused_is_http_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Downloader::new()
            .download("http://127.0.0.1:1/x.tar", dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Http(_)));
    }

    #[test]
    fn file_urls_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.zip");
        std::fs::write(&src, b"local").unwrap();
        let got = Downloader::new()
            .download(&format!("file://{}", src.display()), &dir.path().join("tmp"))
            .unwrap();
        assert_eq!(got.checksum, blake3::hash(b"local").to_hex().to_string());

        let missing = Downloader::new()
            .download("file:///definitely/not/here.zip", dir.path())
            .err()
            .unwrap();
        assert!(matches!(missing, StoreError::NotFound(_)));
    }
}
