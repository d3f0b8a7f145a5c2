//! Multipart message framing over a byte stream.
//!
//! ```text
//! +-----------+-----------+---------+-----------+---------+
//! | count u32 | len_0 u32 | frame_0 | len_1 u32 | frame_1 | ...
//! +-----------+-----------+---------+-----------+---------+
//! ```
//!
//! All integers are big-endian.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RegistrarError;

/// Upper bound on frames per message.
pub const MAX_FRAMES: usize = 16;

/// Upper bound on a single frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Serializes `frames` into a single buffer.
///
/// # Errors
///
/// Returns [`RegistrarError::Protocol`] when a limit is exceeded.
pub fn encode(frames: &[Bytes]) -> Result<BytesMut, RegistrarError> {
    if frames.len() > MAX_FRAMES {
        return Err(RegistrarError::Protocol(format!(
            "message has {} frames, limit is {MAX_FRAMES}",
            frames.len()
        )));
    }
    let total: usize = frames.iter().map(|f| 4 + f.len()).sum();
    let mut buf = BytesMut::with_capacity(4 + total);
    buf.put_u32(frame_len(frames.len())?);
    for frame in frames {
        if frame.len() > MAX_FRAME_LEN {
            return Err(RegistrarError::Protocol(format!(
                "frame of {} bytes exceeds limit",
                frame.len()
            )));
        }
        buf.put_u32(frame_len(frame.len())?);
        buf.put_slice(frame);
    }
    Ok(buf)
}

fn frame_len(n: usize) -> Result<u32, RegistrarError> {
    u32::try_from(n).map_err(|_| RegistrarError::Protocol(format!("length {n} overflows u32")))
}

/// Writes one multipart message and flushes.
///
/// # Errors
///
/// Returns [`RegistrarError::Protocol`] on limit violations and
/// [`RegistrarError::Io`] on write failure.
pub async fn write_message<W>(writer: &mut W, frames: &[Bytes]) -> Result<(), RegistrarError>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode(frames)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one multipart message.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly before a new
/// message started.
///
/// # Errors
///
/// Returns [`RegistrarError::Protocol`] on limit violations and
/// [`RegistrarError::Io`] on read failure or truncation mid-message.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<Bytes>>, RegistrarError>
where
    R: AsyncRead + Unpin,
{
    let count = match reader.read_u32().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if count > MAX_FRAMES {
        return Err(RegistrarError::Protocol(format!(
            "message announces {count} frames, limit is {MAX_FRAMES}"
        )));
    }

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.read_u32().await? as usize;
        if len > MAX_FRAME_LEN {
            return Err(RegistrarError::Protocol(format!(
                "frame of {len} bytes exceeds limit"
            )));
        }
        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).await?;
        frames.push(Bytes::from(frame));
    }
    Ok(Some(frames))
}
