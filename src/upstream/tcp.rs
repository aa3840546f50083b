//! TCP exchange with an upstream server.
//!
//! TCP DNS messages are prefixed with a 2-byte big-endian length.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ResolveError;

/// Send `request` to `upstream` over a fresh connection and read the reply.
pub async fn exchange(upstream: SocketAddr, request: &[u8]) -> Result<Vec<u8>, ResolveError> {
    let len =
        u16::try_from(request.len()).map_err(|_| ResolveError::MessageTooLarge(request.len()))?;

    let mut stream = TcpStream::connect(upstream).await?;

    let mut framed = Vec::with_capacity(2 + request.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(request);
    stream.write_all(&framed).await?;

    read_dns_message(&mut stream).await
}

/// Read one length-prefixed DNS message, returned without its prefix.
async fn read_dns_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, ResolveError> {
    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix).await?;

    let msg_len = u16::from_be_bytes(prefix) as usize;
    let mut buf = vec![0u8; msg_len];
    stream.read_exact(&mut buf).await?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_dns_message_strips_prefix() {
        let mut wire: &[u8] = &[0x00, 0x03, 0xAA, 0xBB, 0xCC, 0xFF];

        let message = read_dns_message(&mut wire).await.unwrap();

        assert_eq!(message, vec![0xAA, 0xBB, 0xCC]);
    }

    #[tokio::test]
    async fn read_dns_message_fails_on_short_stream() {
        let mut wire: &[u8] = &[0x00, 0x05, 0xAA];

        assert!(matches!(
            read_dns_message(&mut wire).await,
            Err(ResolveError::Io(_))
        ));
    }

    #[tokio::test]
    async fn exchange_rejects_oversized_request() {
        let request = vec![0u8; u16::MAX as usize + 1];
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        assert!(matches!(
            exchange(addr, &request).await,
            Err(ResolveError::MessageTooLarge(_))
        ));
    }
}
