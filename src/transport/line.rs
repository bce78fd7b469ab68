//! Newline-delimited single-stream transport. One consumer, strictly
//! sequential: each line is read, dispatched, and its response written
//! and flushed before the next line is read.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::app::SharedApp;
use crate::rpc::RpcEngine;

/// Read envelopes from `input` until end-of-stream, writing one response
/// line per non-empty, non-notification request to `output`.
pub async fn serve_lines<R, W>(app: SharedApp, engine: &RpcEngine, input: R, mut output: W)
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "line transport read failed");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = engine.handle_raw(&app, trimmed).await {
            let Ok(rendered) = serde_json::to_string(&response) else {
                tracing::error!("failed to serialise response envelope");
                continue;
            };
            if output.write_all(rendered.as_bytes()).await.is_err() {
                break;
            }
            if output.write_all(b"\n").await.is_err() {
                break;
            }
            if output.flush().await.is_err() {
                break;
            }
        }
    }
}
