//! # Block Sources
//!
//! Where block envelopes enter the pipeline. The chain fetcher is an external
//! collaborator; the binary reads its output as JSON lines.

use async_trait::async_trait;
use idx_01_tx_decoding::BlockEnvelope;
use std::path::Path;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("block source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid block envelope: {reason}")]
    InvalidEnvelope { line: u64, reason: String },
}

/// Yields block envelopes in height order.
#[async_trait]
pub trait BlockSource: Send {
    /// Next envelope, or `None` once the source is exhausted.
    async fn next_block(&mut self) -> Result<Option<BlockEnvelope>, SourceError>;
}

/// One JSON-encoded `BlockEnvelope` per line. Blank lines are skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line: u64,
}

impl JsonLinesSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> BlockSource for JsonLinesSource<R> {
    async fn next_block(&mut self) -> Result<Option<BlockEnvelope>, SourceError> {
        while let Some(text) = self.lines.next_line().await? {
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let envelope =
                serde_json::from_str(&text).map_err(|e| SourceError::InvalidEnvelope {
                    line: self.line,
                    reason: e.to_string(),
                })?;
            return Ok(Some(envelope));
        }
        Ok(None)
    }
}

/// Envelopes from memory, for tests and replays.
#[derive(Debug, Default)]
pub struct VecSource {
    blocks: std::collections::VecDeque<BlockEnvelope>,
}

impl VecSource {
    pub fn new(blocks: impl IntoIterator<Item = BlockEnvelope>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BlockSource for VecSource {
    async fn next_block(&mut self) -> Result<Option<BlockEnvelope>, SourceError> {
        Ok(self.blocks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = concat!(
        r#"{"height":1,"hash":"aa","time":"2023-10-31T12:00:00Z","chain_id":"celestia"}"#,
        "\n\n",
        r#"{"height":2,"hash":"bb","time":"2023-10-31T12:00:12Z","chain_id":"celestia"}"#,
        "\n",
    );

    #[tokio::test]
    async fn test_json_lines_in_order() {
        let mut source = JsonLinesSource::new(LINES.as_bytes());

        let first = source.next_block().await.unwrap().unwrap();
        let second = source.next_block().await.unwrap().unwrap();

        assert_eq!((first.height, second.height), (1, 2));
        assert!(source.next_block().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_line_reports_position() {
        let input = "\n{\"height\":\n";
        let mut source = JsonLinesSource::new(input.as_bytes());

        let err = source.next_block().await.unwrap_err();

        assert!(matches!(err, SourceError::InvalidEnvelope { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.jsonl");
        std::fs::write(&path, LINES).unwrap();

        let mut source = JsonLinesSource::open(&path).await.unwrap();

        assert_eq!(source.next_block().await.unwrap().unwrap().height, 1);
    }
}
