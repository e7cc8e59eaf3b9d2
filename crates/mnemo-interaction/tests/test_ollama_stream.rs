use futures::StreamExt;
use mnemo_core::agent::{AgentRequest, ChatAgent, GenerationParams};
use mnemo_core::session::Turn;
use mnemo_interaction::OllamaApiAgent;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one HTTP response and returns the raw request it received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n{body}"
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&raw).to_string()
    });

    (url, handle)
}

fn request() -> AgentRequest {
    AgentRequest::new(
        vec![Turn::user("Hello")],
        GenerationParams {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
        },
    )
}

#[tokio::test]
async fn test_stream_yields_content_chunks() {
    let (url, server) = serve_once(
        "200 OK",
        concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\" there\"},\"done\":false}\n",
            "{\"done\":true}\n"
        ),
    )
    .await;
    let agent = OllamaApiAgent::new(url, "llama3.2");

    let chunks: Vec<String> = agent
        .stream(request())
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;

    assert_eq!(chunks, vec!["Hi", " there"]);
    let raw_request = server.await.unwrap();
    assert!(raw_request.starts_with("POST /api/chat"));
    assert!(raw_request.contains("\"stream\":true"));
}

#[tokio::test]
async fn test_http_error_is_a_model_error() {
    let (url, _server) = serve_once("404 Not Found", "{\"error\":\"model 'nope' not found\"}").await;
    let agent = OllamaApiAgent::new(url, "nope");

    let err = agent.complete(request()).await.unwrap_err();

    assert!(err.is_model());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("model 'nope' not found"));
}
