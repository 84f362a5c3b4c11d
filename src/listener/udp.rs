use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::permit::PermitManager;
use crate::query_fsm::{QueryFsm, Transport};
use crate::reply::UdpReply;
use crate::router::Router;

pub async fn run(
    config: Arc<Config>,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
    permits: PermitManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let socket = Arc::new(UdpSocket::bind(config.udp_bind_addr).await?);
    info!(bind_addr = %config.udp_bind_addr, "udp listener started");

    let mut buf = vec![0u8; 4096];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("udp listener shutting down");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                let (len, client) = result?;

                let Some(permit) = permits.try_acquire() else {
                    warn!(%client, "max concurrent queries reached, dropping udp query");
                    continue;
                };

                let raw_query = buf[..len].to_vec();
                let reply = Arc::new(UdpReply::new(socket.clone(), client));
                let router = router.clone();
                let metrics = metrics.clone();
                let config = config.clone();

                debug!(%client, len, "accepted udp query");
                QueryFsm::start(reply, raw_query, Transport::Udp, router, metrics, config, permit);
            }
        }
    }

    Ok(())
}
