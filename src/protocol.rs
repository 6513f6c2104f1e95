//! Wire format between the engine and a worker process: serde-tagged JSON,
//! one message per line. Newline framing lets chunked stream data reassemble
//! into discrete messages without a length prefix.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerRequest {
    Init {
        log_level: String,
        options: serde_json::Value,
        working_dir: String,
    },
    Call {
        correlation_id: u64,
        method: String,
        args: serde_json::Value,
    },
    Dispose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerResponse {
    Initialized,
    Result {
        correlation_id: u64,
        value: serde_json::Value,
    },
    Rejection {
        correlation_id: u64,
        error: String,
    },
    DisposeCompleted,
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

/// Reads newline-framed messages off a buffered byte stream.
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        MessageReader { inner }
    }

    /// Next complete message, or `None` on a clean end of stream.
    pub async fn read_message<T: DeserializeOwned>(&mut self) -> std::io::Result<Option<T>> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = self.inner.read_until(b'\n', &mut line).await?;
            if n == 0 {
                return Ok(None);
            }
            // A worker may emit stray blank lines between messages.
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            let message = serde_json::from_slice(&line).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("malformed worker message: {e}"),
                )
            })?;
            return Ok(Some(message));
        }
    }
}
