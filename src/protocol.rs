//! Wire primitives shared by the server and the client: big-endian
//! unsigned integers and length-prefixed UTF-8 text over any async stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Upper bound on any text payload, guarding against corrupt prefixes.
const MAX_TEXT_BYTES: usize = 16 * 1024 * 1024;

/// Token acknowledging a successful protocol step.
pub const TOKEN_OK: &str = "OK";
/// Token reporting a failed acquisition or reload.
pub const TOKEN_ERROR: &str = "ERROR";
/// Token refusing an out-of-range cluster count.
pub const TOKEN_REFUSED: &str = "NO";

/// Request selector opening every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Reload = 1,
    Fresh = 2,
}

impl RequestKind {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for RequestKind {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(RequestKind::Reload),
            2 => Ok(RequestKind::Fresh),
            other => Err(ProtocolError::UnknownRequestKind(other)),
        }
    }
}

/// One side of a protocol conversation.
pub struct Channel<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Channel<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn read_int(&mut self) -> Result<u32, ProtocolError> {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf).await?;
        Ok(u32::from_be_bytes(buf))
    }

    pub async fn write_int(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.stream.write_all(&value.to_be_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn read_text(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_int().await? as usize;
        if len > MAX_TEXT_BYTES {
            return Err(ProtocolError::TextTooLong {
                len,
                max: MAX_TEXT_BYTES,
            });
        }
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await?;
        Ok(String::from_utf8(buf)?)
    }

    pub async fn write_text(&mut self, text: &str) -> Result<(), ProtocolError> {
        let bytes = text.as_bytes();
        if bytes.len() > MAX_TEXT_BYTES {
            return Err(ProtocolError::TextTooLong {
                len: bytes.len(),
                max: MAX_TEXT_BYTES,
            });
        }
        self.stream
            .write_all(&(bytes.len() as u32).to_be_bytes())
            .await?;
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_int_round_trip() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = Channel::new(a);
        let mut right = Channel::new(b);
        left.write_int(2).await.unwrap();
        left.write_int(u32::MAX).await.unwrap();
        assert_eq!(right.read_int().await.unwrap(), 2);
        assert_eq!(right.read_int().await.unwrap(), u32::MAX);
    }

    #[tokio::test]
    async fn test_text_round_trip() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = Channel::new(a);
        let mut right = Channel::new(b);
        left.write_text("per aspera ad astra").await.unwrap();
        left.write_text("").await.unwrap();
        assert_eq!(right.read_text().await.unwrap(), "per aspera ad astra");
        assert_eq!(right.read_text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_oversized_prefix_is_rejected() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = Channel::new(a);
        let mut right = Channel::new(b);
        left.write_int(u32::MAX).await.unwrap();
        let err = right.read_text().await.unwrap_err();
        assert!(matches!(err, ProtocolError::TextTooLong { .. }));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_an_io_error() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = Channel::new(a);
        let mut right = Channel::new(b);
        left.write_int(12).await.unwrap();
        drop(left);
        let err = right.read_text().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn test_request_kind_codes() {
        assert_eq!(RequestKind::try_from(1).unwrap(), RequestKind::Reload);
        assert_eq!(RequestKind::try_from(2).unwrap(), RequestKind::Fresh);
        assert_eq!(RequestKind::Fresh.code(), 2);
        let err = RequestKind::try_from(9).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownRequestKind(9)));
    }
}
