//! Remote diagram rasterization
//!
//! Posts the PlantUML source to a Kroki-compatible server and returns the
//! rendered image. Failures are not retried.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::RenderConfig;
use crate::error::{Error, Result};

/// HTTP client for a diagram rendering service
#[derive(Debug, Clone)]
pub struct Rasterizer {
    client: reqwest::Client,
    server_url: String,
}

impl Rasterizer {
    /// Build a client for the server in `config`
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            server_url: config.server_url.clone(),
        })
    }

    /// Send `diagram` and return the image bytes
    pub async fn rasterize(&self, diagram: &[u8]) -> Result<Vec<u8>> {
        tracing::info!(server = %self.server_url, bytes = diagram.len(), "Requesting diagram image");

        let resp = self
            .client
            .post(&self.server_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(diagram.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::RasterizeError(format!(
                "{} returned {}",
                self.server_url, status
            )));
        }

        let image = resp.bytes().await?;
        tracing::debug!(bytes = image.len(), "Received diagram image");
        Ok(image.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one request with `status` and `body`, handing back the request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/plantuml/svg", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: image/svg+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn config(url: String) -> RenderConfig {
        RenderConfig {
            svg: true,
            server_url: url,
            timeout_seconds: Some(5),
        }
    }

    #[tokio::test]
    async fn test_posts_plain_text_and_returns_body() {
        let (url, server) = serve_once("200 OK", "<svg/>").await;
        let rasterizer = Rasterizer::new(&config(url)).unwrap();

        let image = rasterizer.rasterize(b"@startuml\n@enduml\n").await.unwrap();
        assert_eq!(image, b"<svg/>");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /plantuml/svg"));
        assert!(request.to_lowercase().contains("content-type: text/plain"));
        assert!(request.ends_with("@startuml\n@enduml\n"));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_an_error() {
        let (url, server) = serve_once("400 Bad Request", "syntax error").await;
        let rasterizer = Rasterizer::new(&config(url)).unwrap();

        let err = rasterizer.rasterize(b"@startuml\n").await.unwrap_err();
        assert!(matches!(err, Error::RasterizeError(ref msg) if msg.contains("400")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // bind and drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let rasterizer = Rasterizer::new(&config(url)).unwrap();
        let err = rasterizer.rasterize(b"@startuml\n").await.unwrap_err();
        assert!(matches!(err, Error::HttpError(_)));
    }
}
