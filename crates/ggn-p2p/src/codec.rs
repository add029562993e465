use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Rpc, MAX_FRAME_SIZE};

/// Size of the big-endian length prefix in front of every frame.
pub const LENGTH_PREFIX: usize = 4;

/// Pulls one framed message at a time off a connection.
///
/// An implementation must consume exactly one frame per call and report an
/// error on malformed or short input. The transport closes the connection on
/// the first error, so a decoder never needs to resynchronise.
#[async_trait]
pub trait Decoder: Send + Sync {
    async fn decode(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        rpc: &mut Rpc,
    ) -> ProtocolResult<()>;
}

/// Frame a payload: `[4 bytes len][payload]`.
pub fn encode_frame(payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let mut buf = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// EOF before the first length byte is a clean close
/// ([`ProtocolError::ConnectionClosed`]); EOF anywhere later is a framing
/// error. The length is checked against `max_frame_size` before allocating.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> ProtocolResult<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_buf = [0u8; LENGTH_PREFIX];
    let n = reader.read(&mut len_buf).await?;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if n < LENGTH_PREFIX {
        reader
            .read_exact(&mut len_buf[n..])
            .await
            .map_err(|e| truncated(e, "length prefix"))?;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_size {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| truncated(e, "payload"))?;
    Ok(Bytes::from(payload))
}

fn truncated(e: io::Error, part: &str) -> ProtocolError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ProtocolError::FramingError(format!("stream ended inside frame {part}"))
    } else {
        ProtocolError::Io(e)
    }
}

/// Length-prefixed binary decoder, the default framing for node connections.
#[derive(Clone, Debug)]
pub struct LengthPrefixedDecoder {
    max_frame_size: usize,
}

impl LengthPrefixedDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for LengthPrefixedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decoder for LengthPrefixedDecoder {
    async fn decode(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        rpc: &mut Rpc,
    ) -> ProtocolResult<()> {
        rpc.payload = read_frame(reader, self.max_frame_size).await?;
        Ok(())
    }
}
