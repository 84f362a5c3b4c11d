use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Capability object hiding whether a reply goes out as a UDP datagram or a
/// length-prefixed TCP write. The query FSM only ever calls `deliver`; it
/// never learns which transport it's talking to.
#[async_trait::async_trait]
pub trait ReplyHandle: Send + Sync {
    async fn deliver(&self, bytes: &[u8]);
}

/// UDP reply path: one shared socket, `send_to` the originating client
/// address. Delivery failures are swallowed — datagrams are unreliable
/// anyway and there is no client connection to tear down.
pub struct UdpReply {
    socket: Arc<UdpSocket>,
    client: SocketAddr,
}

impl UdpReply {
    pub fn new(socket: Arc<UdpSocket>, client: SocketAddr) -> Self {
        Self { socket, client }
    }
}

#[async_trait::async_trait]
impl ReplyHandle for UdpReply {
    async fn deliver(&self, bytes: &[u8]) {
        if let Err(err) = self.socket.send_to(bytes, self.client).await {
            tracing::debug!(client = %self.client, error = %err, "udp reply delivery failed");
        }
    }
}

/// TCP reply path: hands the length-prefixed frame to the connection-owning
/// task over an mpsc channel. If that task has already exited (client
/// vanished), the send fails and is ignored identically to a dropped
/// datagram — the FSM and the connection reader share a failure domain.
pub struct TcpReply {
    sender: mpsc::Sender<Vec<u8>>,
}

impl TcpReply {
    pub fn new(sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self { sender }
    }
}

#[async_trait::async_trait]
impl ReplyHandle for TcpReply {
    async fn deliver(&self, bytes: &[u8]) {
        let mut framed = Vec::with_capacity(2 + bytes.len());
        framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        framed.extend_from_slice(bytes);
        let _ = self.sender.send(framed).await;
    }
}
