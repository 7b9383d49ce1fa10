//! Quote generation backed by hosted or local language models.
//!
//! The crate turns trimmed keywords into [`quotecraft_core::QuoteData`]:
//! - `prompt` builds the instruction and parses the model's JSON reply
//! - `gemini`, `openai` and `ollama` speak each provider's HTTP API
//! - `quote_service` adapts any [`llm::LlmClient`] to the core `QuoteService` seam
//! - `runtime` selects the implementation from `LlmConfig`
//!
//! The model only writes quote text. Request lifecycle, overlap protection and
//! error normalization belong to the generation controller in `quotecraft-core`.

pub mod gemini;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod quote_service;
pub mod runtime;

pub use llm::{CompletionRequest, LlmClient, LlmError};
pub use quote_service::{LlmQuoteService, StaticQuoteService};
pub use runtime::{build_quote_service, describe_provider};

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    pub(crate) struct CapturedRequest {
        pub head: String,
        pub body: String,
    }

    impl CapturedRequest {
        pub fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        pub fn has_header(&self, name: &str, value: &str) -> bool {
            self.head.lines().skip(1).any(|line| match line.split_once(':') {
                Some((header, content)) => {
                    header.trim().eq_ignore_ascii_case(name) && content.trim() == value
                }
                None => false,
            })
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).expect("request body should be JSON")
        }
    }

    /// Serves a single canned HTTP response and hands back what the client sent.
    pub(crate) async fn serve_once(
        status: u16,
        body: &'static str,
    ) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock listener");
        let address = listener.local_addr().expect("mock listener address");
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };

            let mut buffer = Vec::new();
            let mut chunk = [0_u8; 4096];
            let header_end = loop {
                let read = socket.read(&mut chunk).await.unwrap_or(0);
                if read == 0 {
                    return;
                }
                buffer.extend_from_slice(&chunk[..read]);
                if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n")
                {
                    break position + 4;
                }
            };

            let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while buffer.len() < header_end + content_length {
                let read = socket.read(&mut chunk).await.unwrap_or(0);
                if read == 0 {
                    break;
                }
                buffer.extend_from_slice(&chunk[..read]);
            }

            let captured = CapturedRequest {
                head,
                body: String::from_utf8_lossy(&buffer[header_end..]).to_string(),
            };
            let reason = if status < 400 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            let _ = sender.send(captured);
        });

        (format!("http://{address}"), receiver)
    }

    /// Accepts a connection and never answers it.
    pub(crate) async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock listener");
        let address = listener.local_addr().expect("mock listener address");

        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            }
        });

        format!("http://{address}")
    }

    /// An address nothing is listening on.
    pub(crate) async fn closed_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock listener");
        let address = listener.local_addr().expect("mock listener address");
        drop(listener);
        format!("http://{address}")
    }
}
