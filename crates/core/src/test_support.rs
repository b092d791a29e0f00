//! One-shot HTTP server for exercising the reqwest adapters.

use anyhow::{ensure, Context, Result};
use reqwest::Client;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Request as received by [`serve_once`].
#[derive(Debug)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Header value by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Client that talks to the loopback server directly, ignoring proxy settings.
pub(crate) fn local_client() -> Result<Client> {
    Ok(Client::builder().no_proxy().build()?)
}

/// Accept a single connection, answer with `status` and `body`, and hand back
/// what the client sent.
pub(crate) async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> Result<(String, JoinHandle<Result<RecordedRequest>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let request = read_request(&mut stream).await?;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(request)
    });
    Ok((url, handle))
}

async fn read_request(stream: &mut TcpStream) -> Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let read = stream.read(&mut chunk).await?;
        ensure!(read > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8(buf[..head_end].to_vec())?;
    let mut lines = head.lines();
    let method = lines
        .next()
        .and_then(|line| line.split_whitespace().next())
        .context("missing request line")?
        .to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .map(|(_, value)| value.parse::<usize>())
        .transpose()?
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let read = stream.read(&mut chunk).await?;
        ensure!(read > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..read]);
    }
    let body = String::from_utf8(buf[head_end..head_end + length].to_vec())?;

    Ok(RecordedRequest {
        method,
        headers,
        body,
    })
}
