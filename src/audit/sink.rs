use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::audit::event::AuditEvent;

/// Destination for serialized audit elements. Modeled as a trait so a real
/// network transport to the downstream logger (spec.md §6.3) can be swapped
/// in without touching the publisher/dispatcher.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn write_line(&self, xml: &str) -> anyhow::Result<()>;

    /// Returns the dumped log content, optionally filtered to one user's
    /// events. `filename` names the destination the caller intends to
    /// persist this dump under; validating it is a boundary concern left to
    /// the caller (spec.md §9).
    async fn dump(&self, username: Option<&str>) -> anyhow::Result<String>;
}

pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditSink {
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn write_line(&self, xml: &str) -> anyhow::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(xml.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn dump(&self, username: Option<&str>) -> anyhow::Result<String> {
        let read_file = File::open(&self.path).await?;
        let mut lines = BufReader::new(read_file).lines();

        let mut out = String::new();
        while let Some(line) = lines.next_line().await? {
            match username {
                Some(u) => {
                    if line_matches_username(&line, u) {
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
                None => {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }

        Ok(out)
    }
}

/// `quick_xml`'s serde serializer escapes text-node metacharacters on write,
/// so the stored `<username>...</username>` text always matches the literal
/// username byte-for-byte; a substring check on the tagged element is enough
/// to filter a dump without re-parsing the XML.
fn line_matches_username(line: &str, username: &str) -> bool {
    let needle = format!("<username>{}</username>", username);
    line.contains(&needle)
}
