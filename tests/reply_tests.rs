use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use spartan_forwarder::reply::{ReplyHandle, TcpReply, UdpReply};

#[tokio::test]
async fn tcp_reply_adds_a_two_byte_big_endian_length_prefix() {
    let (tx, mut rx) = mpsc::channel(1);
    let reply = TcpReply::new(tx);

    reply.deliver(b"hello").await;

    let framed = rx.recv().await.expect("a frame was sent");
    assert_eq!(&framed[..2], &5u16.to_be_bytes());
    assert_eq!(&framed[2..], b"hello");
}

#[tokio::test]
async fn tcp_reply_send_failure_is_swallowed_when_receiver_dropped() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let reply = TcpReply::new(tx);

    // Must not panic even though nothing is listening.
    reply.deliver(b"hello").await;
}

#[tokio::test]
async fn udp_reply_sends_a_bare_datagram_to_the_client() {
    let client_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client_addr = client_socket.local_addr().unwrap();

    let server_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let reply = UdpReply::new(server_socket, client_addr);

    reply.deliver(b"response-bytes").await;

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(1), client_socket.recv_from(&mut buf))
        .await
        .expect("received a datagram in time")
        .unwrap();

    assert_eq!(&buf[..len], b"response-bytes");
}
