//! UDP exchange with an upstream server.
//!
//! Each exchange uses its own ephemeral socket connected to the upstream,
//! so replies are matched to requests by socket and transaction ID.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use super::{HEADER_LEN, MAX_DNS_PACKET_SIZE};
use crate::error::ResolveError;

/// Send `request` to `upstream` and wait for the matching reply.
///
/// Datagrams too short to hold a header, or carrying another query ID,
/// are ignored.
pub async fn exchange(upstream: SocketAddr, request: &[u8]) -> Result<Vec<u8>, ResolveError> {
    let bind_addr: SocketAddr = if upstream.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(upstream).await?;
    socket.send(request).await?;

    let mut buf = vec![0u8; MAX_DNS_PACKET_SIZE];
    loop {
        let len = socket.recv(&mut buf).await?;

        if len < HEADER_LEN || request.get(..2) != Some(&buf[..2]) {
            continue;
        }

        buf.truncate(len);
        return Ok(buf);
    }
}
