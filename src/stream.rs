//! Byte stream to text fragment conversion.
//!
//! A streamed body arrives as arbitrary byte chunks. Each chunk becomes one
//! text fragment, decoded according to [`Utf8Chunking`].

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::client::ReasonError;
use crate::options::Utf8Chunking;

/// Turn a byte stream into a stream of text fragments, one per chunk.
///
/// With [`Utf8Chunking::Carry`] an incomplete multi-byte sequence at the end
/// of a chunk is held back and completed by the next one; chunks that decode
/// to nothing are skipped, and a residue left when the bytes end is flushed
/// lossily. With [`Utf8Chunking::PerChunk`] every chunk is decoded lossily on
/// its own and yielded as is.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
/// use reason_stream::options::Utf8Chunking;
/// use reason_stream::stream::text_fragments;
/// use reason_stream::ReasonError;
///
/// # futures::executor::block_on(async {
/// let bytes = futures::stream::iter(vec![
///     Ok::<_, ReasonError>(Bytes::from_static(b"caf\xC3")),
///     Ok(Bytes::from_static(b"\xA9")),
/// ]);
/// let fragments: Vec<String> = text_fragments(bytes, Utf8Chunking::Carry)
///     .map(|r| r.unwrap())
///     .collect()
///     .await;
/// assert_eq!(fragments, vec!["caf".to_string(), "\u{e9}".to_string()]);
/// # });
/// ```
pub fn text_fragments<S, E>(
    bytes: S,
    chunking: Utf8Chunking,
) -> impl Stream<Item = Result<String, ReasonError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ReasonError> + Send,
{
    stream::unfold(
        (Box::pin(bytes), Vec::<u8>::new(), false),
        move |(mut bytes, mut residue, mut ended)| async move {
            loop {
                if ended {
                    return None;
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let text = match chunking {
                            Utf8Chunking::PerChunk => {
                                String::from_utf8_lossy(&chunk).into_owned()
                            }
                            Utf8Chunking::Carry => {
                                residue.extend_from_slice(&chunk);
                                let text = drain_utf8(&mut residue);
                                if text.is_empty() {
                                    continue;
                                }
                                text
                            }
                        };
                        return Some((Ok(text), (bytes, residue, ended)));
                    }
                    Some(Err(e)) => {
                        // Transport failure ends the sequence
                        ended = true;
                        return Some((Err(e.into()), (bytes, residue, ended)));
                    }
                    None => {
                        ended = true;
                        if !residue.is_empty() {
                            let text = String::from_utf8_lossy(&residue).into_owned();
                            residue.clear();
                            return Some((Ok(text), (bytes, residue, ended)));
                        }
                    }
                }
            }
        },
    )
}

/// Decode as much of `buffer` as possible, leaving only an incomplete
/// trailing sequence behind. Invalid sequences become U+FFFD.
fn drain_utf8(buffer: &mut Vec<u8>) -> String {
    let mut out = String::new();

    loop {
        match std::str::from_utf8(buffer) {
            Ok(s) => {
                out.push_str(s);
                buffer.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buffer[..valid]));

                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        buffer.drain(..valid + len);
                    }
                    None => {
                        buffer.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}
