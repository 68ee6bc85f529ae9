//! Downloading uploaded images for analysis.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Download errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("download request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("download returned HTTP {0}")]
    Status(u16),

    /// The body exceeded the size limit.
    #[error("download exceeded {max} bytes")]
    TooLarge {
        /// Limit in bytes.
        max: u64,
    },

    /// Writing the local copy failed.
    #[error("failed to write downloaded image: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Request(err.to_string()),
        }
    }
}

/// Copies the image at a retrieval URL into a local file.
pub trait ImageFetcher: Send + Sync {
    /// Streams `url` into `dest` and returns the number of bytes written.
    fn fetch_into(
        &self,
        url: &str,
        dest: &mut File,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// Fetches images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageFetcher {
    /// Creates a fetcher with a whole-request timeout and a body size cap.
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch_into(&self, url: &str, dest: &mut File) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(FetchError::TooLarge {
                max: self.max_bytes,
            });
        }

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(FetchError::TooLarge {
                    max: self.max_bytes,
                });
            }
            dest.write_all(&chunk).await?;
        }

        dest.flush().await?;
        tracing::debug!(url, bytes = written, "image downloaded");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns its URL.
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/images/photo.jpg")
    }

    async fn scratch(dir: &std::path::Path) -> (std::path::PathBuf, File) {
        let path = dir.join("copy.jpg");
        let file = File::create(&path).await.unwrap();
        (path, file)
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", b"\xff\xd8\xffjpeg".to_vec()).await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), 1024).unwrap();
        let (path, mut file) = scratch(dir.path()).await;

        let written = fetcher.fetch_into(&url, &mut file).await.unwrap();
        drop(file);

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(path).unwrap(), b"\xff\xd8\xffjpeg");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("404 Not Found", Vec::new()).await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), 1024).unwrap();
        let (_, mut file) = scratch(dir.path()).await;

        assert!(matches!(
            fetcher.fetch_into(&url, &mut file).await,
            Err(FetchError::Status(404))
        ));
    }

    #[tokio::test]
    async fn test_fetch_enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", vec![0u8; 64]).await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), 16).unwrap();
        let (_, mut file) = scratch(dir.path()).await;

        assert!(matches!(
            fetcher.fetch_into(&url, &mut file).await,
            Err(FetchError::TooLarge { max: 16 })
        ));
    }
}
