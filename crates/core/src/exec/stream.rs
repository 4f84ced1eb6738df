//! Stream multiplexing: drain a child's stdout and stderr concurrently
//! into one ordered sequence of decoded text chunks.
//!
//! One reader task per stream, both feeding the same channel, so chunks
//! arrive at the consumer in true read-completion order -- order within
//! a stream is preserved, interleaving across streams reflects real
//! arrival time. No batching, no forced cross-stream ordering.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrigin {
    Stdout,
    Stderr,
}

/// One unit of decoded output text.
///
/// `text` may be a partial line. Chunks are never mutated after
/// creation; the transport and the ledger see the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub origin: StreamOrigin,
    pub text: String,
}

/// Prefix applied to every decoded stderr fragment.
pub const STDERR_TAG: &str = "[stderr] ";

/// Read buffer size for each stream drain loop.
const READ_BUF_BYTES: usize = 8 * 1024;

/// Incremental UTF-8 decoder.
///
/// An incomplete trailing multi-byte sequence is buffered across reads
/// so a character split across two reads decodes intact. Genuinely
/// invalid bytes are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode the next batch of bytes, returning all complete text.
    pub fn decode(&mut self, input: &[u8]) -> String {
        self.pending.extend_from_slice(input);
        let buf = std::mem::take(&mut self.pending);

        let mut out = String::with_capacity(buf.len());
        let mut pos = 0;
        while pos < buf.len() {
            match std::str::from_utf8(&buf[pos..]) {
                Ok(s) => {
                    out.push_str(s);
                    pos = buf.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&buf[pos..pos + valid]) {
                        out.push_str(s);
                    }
                    pos += valid;
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            pos += len;
                        }
                        None => {
                            // Incomplete trailing sequence: hold it for
                            // the next read.
                            self.pending = buf[pos..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is still buffered at end-of-stream.
    ///
    /// A sequence that never completed can no longer become valid, so it
    /// collapses to a single replacement character.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Drain `reader` to end-of-stream, sending each decoded fragment as an
/// [`OutputChunk`] tagged with `origin`.
///
/// A read error ends this stream's drain with a warning but does not
/// affect the other stream. Returns when the stream closes or the
/// consumer goes away.
pub async fn drain_stream<R: AsyncRead + Unpin>(
    reader: Option<R>,
    origin: StreamOrigin,
    tx: mpsc::Sender<OutputChunk>,
) {
    let Some(mut reader) = reader else {
        return;
    };

    let mut decoder = Utf8Decoder::default();
    let mut buf = [0u8; READ_BUF_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                if text.is_empty() {
                    continue;
                }
                if send_chunk(&tx, origin, text).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(?origin, error = %e, "Error reading child stream");
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = send_chunk(&tx, origin, rest).await;
    }
}

async fn send_chunk(
    tx: &mpsc::Sender<OutputChunk>,
    origin: StreamOrigin,
    text: String,
) -> Result<(), mpsc::error::SendError<OutputChunk>> {
    let text = match origin {
        StreamOrigin::Stdout => text,
        StreamOrigin::Stderr => format!("{STDERR_TAG}{text}"),
    };
    tx.send(OutputChunk { origin, text }).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
