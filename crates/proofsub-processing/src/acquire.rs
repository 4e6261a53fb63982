//! Content acquisition
//!
//! Payload bytes arrive in chunks (multipart fields or a streamed HTTP body) and are fed
//! to a [`MediaIntake`]. Every chunk is hashed exactly once as it arrives, the leading bytes
//! are kept for content sniffing, and the body is retained in a rewindable form so that
//! the extractor can make several passes over it.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom, Write};

use bytes::{Bytes, BytesMut};
use proofsub_core::{AppError, ContentDigest};
use sha2::{Digest, Sha256};

use crate::sniff::{resolve_content_type, SNIFF_SAMPLE_LEN};

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("payload exceeds the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: usize },

    #[error("failed to buffer payload: {0}")]
    Io(#[from] io::Error),
}

impl From<AcquireError> for AppError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::TooLarge { limit_bytes } => AppError::PayloadTooLarge(format!(
                "File size exceeds maximum allowed size of {} MB",
                limit_bytes / 1024 / 1024
            )),
            AcquireError::Io(e) => AppError::Internal(format!("Failed to buffer payload: {}", e)),
        }
    }
}

/// Rewindable view over an acquired payload.
pub trait MediaReader: BufRead + Seek + Send {}

impl<T: BufRead + Seek + Send> MediaReader for T {}

/// Retained payload bytes.
#[derive(Debug)]
pub enum MediaBody {
    InMemory(Bytes),
    /// Anonymous temporary file, removed by the OS once dropped.
    Spooled { file: File, len: u64 },
}

impl MediaBody {
    /// Open a fresh reader positioned at the first byte.
    pub fn open(&self) -> io::Result<Box<dyn MediaReader>> {
        match self {
            MediaBody::InMemory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            MediaBody::Spooled { file, .. } => {
                let mut handle = file.try_clone()?;
                handle.seek(SeekFrom::Start(0))?;
                Ok(Box::new(BufReader::new(handle)))
            }
        }
    }

    /// Materialize the payload in memory.
    pub fn to_bytes(&self) -> io::Result<Bytes> {
        match self {
            MediaBody::InMemory(bytes) => Ok(bytes.clone()),
            MediaBody::Spooled { len, .. } => {
                let mut buf = Vec::with_capacity(*len as usize);
                self.open()?.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self, MediaBody::Spooled { .. })
    }
}

/// A fully received payload with its resolved identity.
#[derive(Debug)]
pub struct AcquiredMedia {
    pub file_name: String,
    pub content_type: String,
    pub digest: ContentDigest,
    pub size: u64,
    pub body: MediaBody,
}

impl AcquiredMedia {
    /// Acquire a payload that is already fully in memory.
    pub fn from_bytes(
        data: impl Into<Bytes>,
        file_name: impl Into<String>,
        declared_type: Option<&str>,
    ) -> Self {
        let data = data.into();
        let mut intake = MediaIntake::in_memory(usize::MAX);
        // An in-memory intake without a limit has no failure path.
        intake.hasher.update(&data);
        intake.capture_sample(&data);
        intake.len = data.len() as u64;
        intake.buffer = BytesMut::from(&data[..]);
        intake.finish_unchecked(file_name.into(), declared_type)
    }
}

/// Incremental collector for one payload.
pub struct MediaIntake {
    hasher: Sha256,
    sample: Vec<u8>,
    len: u64,
    max_bytes: usize,
    spool_threshold: Option<usize>,
    buffer: BytesMut,
    spool: Option<File>,
}

impl MediaIntake {
    /// Keep the whole payload in memory, rejecting anything above `max_bytes`.
    pub fn in_memory(max_bytes: usize) -> Self {
        Self {
            hasher: Sha256::new(),
            sample: Vec::with_capacity(SNIFF_SAMPLE_LEN),
            len: 0,
            max_bytes,
            spool_threshold: None,
            buffer: BytesMut::new(),
            spool: None,
        }
    }

    /// Spill the payload to a temporary file once it grows past `spool_threshold`.
    pub fn spooling(max_bytes: usize, spool_threshold: usize) -> Self {
        Self {
            spool_threshold: Some(spool_threshold),
            ..Self::in_memory(max_bytes)
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn capture_sample(&mut self, chunk: &[u8]) {
        let room = SNIFF_SAMPLE_LEN.saturating_sub(self.sample.len());
        if room > 0 {
            self.sample
                .extend_from_slice(&chunk[..room.min(chunk.len())]);
        }
    }

    /// Feed the next chunk of the payload.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), AcquireError> {
        let new_len = self.len + chunk.len() as u64;
        if new_len > self.max_bytes as u64 {
            return Err(AcquireError::TooLarge {
                limit_bytes: self.max_bytes,
            });
        }

        self.hasher.update(chunk);
        self.capture_sample(chunk);
        self.len = new_len;

        if let Some(file) = self.spool.as_mut() {
            file.write_all(chunk)?;
            return Ok(());
        }

        self.buffer.extend_from_slice(chunk);

        if let Some(threshold) = self.spool_threshold {
            if self.buffer.len() > threshold {
                let mut file = tempfile::tempfile()?;
                file.write_all(&self.buffer)?;
                tracing::debug!(
                    size_bytes = self.buffer.len(),
                    "Payload exceeded spool threshold, spilling to temporary file"
                );
                self.buffer = BytesMut::new();
                self.spool = Some(file);
            }
        }

        Ok(())
    }

    /// Seal the payload, resolving its content type from the declared value or the
    /// leading bytes.
    pub fn finish(
        mut self,
        file_name: impl Into<String>,
        declared_type: Option<&str>,
    ) -> Result<AcquiredMedia, AcquireError> {
        if let Some(file) = self.spool.as_mut() {
            file.flush()?;
        }
        Ok(self.finish_unchecked(file_name.into(), declared_type))
    }

    fn finish_unchecked(self, file_name: String, declared_type: Option<&str>) -> AcquiredMedia {
        let content_type = resolve_content_type(declared_type, &self.sample, &file_name);
        let digest: [u8; 32] = self.hasher.finalize().into();

        let body = match self.spool {
            Some(file) => MediaBody::Spooled {
                file,
                len: self.len,
            },
            None => MediaBody::InMemory(self.buffer.freeze()),
        };

        AcquiredMedia {
            file_name,
            content_type,
            digest: ContentDigest::from_bytes(digest),
            size: self.len,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "hello world"
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn digest_matches_known_vector() {
        let media = AcquiredMedia::from_bytes(&b"hello world"[..], "hello.txt", None);
        assert_eq!(media.digest.as_str(), HELLO_SHA256);
        assert_eq!(media.size, 11);
        assert_eq!(media.content_type, "text/plain");
    }

    #[test]
    fn chunked_intake_hashes_like_single_buffer() {
        let mut intake = MediaIntake::in_memory(1024);
        intake.push(b"hello").unwrap();
        intake.push(b" ").unwrap();
        intake.push(b"world").unwrap();
        let media = intake.finish("hello.txt", Some("text/plain")).unwrap();
        assert_eq!(media.digest.as_str(), HELLO_SHA256);
        assert!(!media.body.is_spooled());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut intake = MediaIntake::in_memory(4);
        intake.push(b"abcd").unwrap();
        let err = intake.push(b"e").unwrap_err();
        assert!(matches!(err, AcquireError::TooLarge { limit_bytes: 4 }));
    }

    #[test]
    fn spooled_body_is_rewindable_and_hash_is_unchanged() {
        let mut intake = MediaIntake::spooling(1024, 8);
        intake.push(b"hello wo").unwrap();
        intake.push(b"rld").unwrap();
        let media = intake.finish("hello.txt", None).unwrap();

        assert!(media.body.is_spooled());
        assert_eq!(media.digest.as_str(), HELLO_SHA256);

        let mut first = String::new();
        media.body.open().unwrap().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        media.body.open().unwrap().read_to_string(&mut second).unwrap();
        assert_eq!(first, "hello world");
        assert_eq!(second, "hello world");
        assert_eq!(&media.body.to_bytes().unwrap()[..], b"hello world");
    }

    #[test]
    fn too_large_maps_to_payload_too_large() {
        let err: AppError = AcquireError::TooLarge {
            limit_bytes: 20 * 1024 * 1024,
        }
        .into();
        assert!(matches!(err, AppError::PayloadTooLarge(ref msg) if msg.contains("20 MB")));
    }
}
