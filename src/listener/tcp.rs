use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::permit::PermitManager;
use crate::query_fsm::{QueryFsm, Transport};
use crate::reply::TcpReply;
use crate::router::Router;

pub async fn run(
    config: Arc<Config>,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
    permits: PermitManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(config.tcp_bind_addr).await?;
    info!(bind_addr = %config.tcp_bind_addr, "tcp listener started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("tcp listener shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, client) = result?;
                debug!(%client, "accepted tcp connection");

                let config = config.clone();
                let router = router.clone();
                let metrics = metrics.clone();
                let permits = permits.clone();
                let connection_shutdown = shutdown_rx.resubscribe();

                tokio::spawn(async move {
                    handle_connection(stream, client, config, router, metrics, permits, connection_shutdown).await;
                });
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    client: SocketAddr,
    config: Arc<Config>,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
    permits: PermitManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Vec<u8>>(32);

    // Writer task: drains framed replies onto the socket. A write failure
    // shuts down the write half, which in turn makes the reader's next
    // `read_exact` fail — the reader and writer share this connection's
    // failure domain.
    let writer = tokio::spawn(async move {
        while let Some(framed) = reply_rx.recv().await {
            if let Err(err) = write_half.write_all(&framed).await {
                debug!(%client, %err, "tcp write failed, closing connection");
                let _ = write_half.shutdown().await;
                break;
            }
        }
    });

    let mut length_buf = [0u8; 2];
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(%client, "tcp connection torn down by shutdown");
                break;
            }
            result = read_half.read_exact(&mut length_buf) => {
                match result {
                    Ok(_) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                        debug!(%client, "tcp connection closed by client");
                        break;
                    }
                    Err(err) => {
                        debug!(%client, %err, "tcp read failed");
                        break;
                    }
                }

                let message_len = u16::from_be_bytes(length_buf) as usize;
                let mut message = vec![0u8; message_len];
                if let Err(err) = read_half.read_exact(&mut message).await {
                    debug!(%client, %err, "tcp short read");
                    break;
                }

                let Some(permit) = permits.try_acquire() else {
                    warn!(%client, "max concurrent queries reached, dropping tcp query");
                    continue;
                };

                let reply = Arc::new(TcpReply::new(reply_tx.clone()));
                QueryFsm::start(
                    reply,
                    message,
                    Transport::Tcp,
                    router.clone(),
                    metrics.clone(),
                    config.clone(),
                    permit,
                );
            }
        }
    }

    drop(reply_tx);
    let _ = writer.await;
}
