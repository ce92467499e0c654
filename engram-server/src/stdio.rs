//! Line-delimited JSON-RPC over stdin/stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use engram_engine::MemoryEngine;

use crate::rpc;

pub async fn serve(engine: Arc<MemoryEngine>) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    tracing::info!("stdio transport ready");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<rpc::RpcRequest>(&line) {
            Ok(request) => rpc::handle_request(&engine, request).await,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                Some(rpc::parse_error())
            }
        };
        if let Some(response) = response {
            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            stdout.write_all(payload.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
