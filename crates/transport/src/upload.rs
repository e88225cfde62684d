//! Upload request types and byte-level progress tracking
//!
//! Files are held in memory as `Bytes` and streamed to the connection in
//! fixed-size chunks. Every chunk handed to the body advances a shared
//! `ProgressTracker`, which fans the running total out to the caller's sink.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::Stream;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

/// Size of each body chunk. Smaller chunks mean finer-grained progress.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// One file to include in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk. The part's file name is the path's final component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("upload"));
        Ok(Self::new(file_name, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A multipart POST of one or more files.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub headers: HeaderMap,
    /// Form field name shared by every file part.
    pub field_name: String,
    pub files: Vec<UploadFile>,
    pub signal: Option<CancellationToken>,
}

/// Progress notification. `total` is `None` when the length is not computable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

/// Receiver for progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Running byte counter shared by all parts of one upload.
#[derive(Clone)]
pub struct ProgressTracker {
    loaded: Arc<AtomicU64>,
    total: Option<u64>,
    sink: Option<ProgressSink>,
}

impl ProgressTracker {
    /// A zero total is treated as unknown.
    pub fn new(total: u64, sink: Option<ProgressSink>) -> Self {
        Self {
            loaded: Arc::new(AtomicU64::new(0)),
            total: (total > 0).then_some(total),
            sink,
        }
    }

    pub fn for_files(files: &[UploadFile], sink: Option<ProgressSink>) -> Self {
        Self::new(files.iter().map(UploadFile::len).sum(), sink)
    }

    /// Record `bytes` more as sent and notify the sink.
    pub fn advance(&self, bytes: u64) {
        let loaded = self.loaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        if let Some(sink) = &self.sink {
            sink(ProgressEvent {
                loaded,
                total: self.total,
            });
        }
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::Relaxed)
    }
}

/// Stream `bytes` in `CHUNK_SIZE` pieces, advancing `tracker` as each piece
/// is pulled by the request body.
pub fn progress_stream(
    bytes: Bytes,
    tracker: ProgressTracker,
) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let mut chunks = Vec::with_capacity(bytes.len().div_ceil(CHUNK_SIZE));
    let mut rest = bytes;
    while !rest.is_empty() {
        let take = rest.len().min(CHUNK_SIZE);
        chunks.push(rest.split_to(take));
    }

    futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok(chunk)
    }))
}
