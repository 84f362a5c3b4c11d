use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::router::UpstreamEndpoint;

/// Terminal outcome of one upstream exchange. A probe posts exactly one of
/// these before exiting, or exits without posting at all — there is no
/// separate "probe exited" signal to race against, which sidesteps the
/// worker-exit/reply ordering question entirely.
pub enum ProbeOutcome {
    Reply(Vec<u8>),
    Failed,
}

pub struct ProbeEvent {
    pub endpoint: UpstreamEndpoint,
    pub outcome: ProbeOutcome,
}

/// Spawns a UDP probe: one ephemeral socket, one datagram out, one datagram
/// back from exactly `endpoint`. Anything else — wrong source, I/O error,
/// or the timeout — ends the probe without a reply.
pub fn spawn_udp_probe(
    query: Bytes,
    endpoint: UpstreamEndpoint,
    probe_timeout: Duration,
    events: mpsc::Sender<ProbeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = timeout(probe_timeout, run_udp_probe(&query, endpoint))
            .await
            .unwrap_or(ProbeOutcome::Failed);
        let _ = events.send(ProbeEvent { endpoint, outcome }).await;
    })
}

async fn run_udp_probe(query: &[u8], endpoint: UpstreamEndpoint) -> ProbeOutcome {
    let bind_addr = if endpoint.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = match UdpSocket::bind(bind_addr).await {
        Ok(socket) => socket,
        Err(err) => {
            tracing::debug!(%endpoint, error = %err, "udp probe bind failed");
            return ProbeOutcome::Failed;
        }
    };

    if let Err(err) = socket.send_to(query, endpoint).await {
        tracing::debug!(%endpoint, error = %err, "udp probe send failed");
        return ProbeOutcome::Failed;
    }

    let mut buf = vec![0u8; 4096];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, from)) if from == endpoint => return ProbeOutcome::Reply(buf[..len].to_vec()),
            Ok(_) => continue, // datagram from an unrelated source; keep waiting
            Err(err) => {
                tracing::debug!(%endpoint, error = %err, "udp probe recv failed");
                return ProbeOutcome::Failed;
            }
        }
    }
}

/// Spawns a TCP probe: connect, write the 2-byte length-prefixed query, read
/// one length-prefixed reply.
pub fn spawn_tcp_probe(
    query: Bytes,
    endpoint: UpstreamEndpoint,
    probe_timeout: Duration,
    events: mpsc::Sender<ProbeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = timeout(probe_timeout, run_tcp_probe(&query, endpoint))
            .await
            .unwrap_or(ProbeOutcome::Failed);
        let _ = events.send(ProbeEvent { endpoint, outcome }).await;
    })
}

async fn run_tcp_probe(query: &[u8], endpoint: UpstreamEndpoint) -> ProbeOutcome {
    let mut stream = match TcpStream::connect(endpoint).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::debug!(%endpoint, error = %err, "tcp probe connect failed");
            return ProbeOutcome::Failed;
        }
    };

    let len_prefix = (query.len() as u16).to_be_bytes();
    if let Err(err) = stream.write_all(&len_prefix).await {
        tracing::debug!(%endpoint, error = %err, "tcp probe write failed");
        return ProbeOutcome::Failed;
    }
    if let Err(err) = stream.write_all(query).await {
        tracing::debug!(%endpoint, error = %err, "tcp probe write failed");
        return ProbeOutcome::Failed;
    }

    let mut len_buf = [0u8; 2];
    if let Err(err) = stream.read_exact(&mut len_buf).await {
        tracing::debug!(%endpoint, error = %err, "tcp probe short read");
        return ProbeOutcome::Failed;
    }
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut reply = vec![0u8; len];
    if let Err(err) = stream.read_exact(&mut reply).await {
        tracing::debug!(%endpoint, error = %err, "tcp probe short read");
        return ProbeOutcome::Failed;
    }

    ProbeOutcome::Reply(reply)
}
