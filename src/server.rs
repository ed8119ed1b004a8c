//! Service mode: a minimal HTTP request loop over the loaded service.
//!
//! Two routes, both POST: `/ready` acknowledges that the load barrier
//! completed (the server only starts once it has), `/prove` takes a
//! hex-wrapped witness JSON and answers with the encoded proof. Any
//! failure maps to a 500 with the error text; partial proof state is
//! never exposed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::circuit::WitnessInput;
use crate::error::{ProverError, Result};
use crate::prover::ProverService;

#[derive(Debug, Deserialize)]
struct ProveRequest {
    witness_json_hex: String,
}

#[derive(Debug, Serialize)]
struct ProveResponse {
    proof_data: String,
}

const MAX_REQUEST_BYTES: usize = 64 << 20;

pub async fn serve(service: Arc<ProverService>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "prover service listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(err) = handle(stream, service).await {
                error!(%peer, %err, "request failed");
            }
        });
    }
}

async fn handle(mut stream: TcpStream, service: Arc<ProverService>) -> Result<()> {
    let (method, path, body) = read_request(&mut stream).await?;

    let response = match (method.as_str(), path.as_str()) {
        ("POST", "/ready") => json_response(200, &serde_json::to_string("success")?),
        ("POST", "/prove") => match prove(service, &body).await {
            Ok(resp) => json_response(200, &serde_json::to_string(&resp)?),
            Err(err) => {
                error!(%err, "prove request failed");
                text_response(500, &err.to_string())
            }
        },
        _ => text_response(404, "not found"),
    };

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn prove(service: Arc<ProverService>, body: &[u8]) -> Result<ProveResponse> {
    let request: ProveRequest = serde_json::from_slice(body)?;
    let witness = WitnessInput::from_hex(&request.witness_json_hex)?;

    // Groth16 proving is CPU-bound; keep the accept loop responsive.
    let proof_data = tokio::task::spawn_blocking(move || service.prove_onchain(&witness))
        .await
        .map_err(|join| ProverError::Io(std::io::Error::other(join)))??;
    Ok(ProveResponse { proof_data })
}

/// Read one HTTP/1.1 request: head until the blank line, then a
/// Content-Length body.
async fn read_request(stream: &mut TcpStream) -> Result<(String, String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(ProverError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Err(ProverError::Serialization("request head too large".into()));
        }
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| ProverError::Serialization("request head is not utf-8".into()))?;
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err(ProverError::Serialization("request body too large".into()));
    }

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(ProverError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-body",
            )));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);
    Ok((method, path, body))
}

fn json_response(status: u16, body: &str) -> String {
    response(status, "application/json", body)
}

fn text_response(status: u16, body: &str) -> String {
    response(status, "text/plain", body)
}

fn response(status: u16, content_type: &str, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    )
}
