use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config::Config;
use crate::dns::Message;
use crate::metrics::Metrics;
use crate::probe::{self, ProbeEvent, ProbeOutcome};
use crate::reply::ReplyHandle;
use crate::router::{Router, UpstreamEndpoint};

/// Cap on probes spawned per query, per the router-output sampling policy.
const MAX_PROBES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// Per-query handler. `start` is the only public entry point: it spawns the
/// FSM as a detached task and returns immediately. The caller is notified
/// exclusively through the `ReplyHandle` it supplied, never through a return
/// value from `start` itself.
pub struct QueryFsm;

impl QueryFsm {
    /// `permit` is held for the lifetime of the FSM, not just its spawn:
    /// the admission slot an accepting listener reserved stays reserved
    /// until this query's probes have all been joined or aborted.
    pub fn start(
        reply: Arc<dyn ReplyHandle>,
        raw_query: Vec<u8>,
        transport: Transport,
        router: Arc<Router>,
        metrics: Arc<Metrics>,
        config: Arc<Config>,
        permit: OwnedSemaphorePermit,
    ) {
        tokio::spawn(async move {
            let _permit = permit;
            run(reply, raw_query, transport, router, metrics, config).await;
        });
    }
}

async fn run(
    reply: Arc<dyn ReplyHandle>,
    raw_query: Vec<u8>,
    transport: Transport,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
    config: Arc<Config>,
) {
    let message = match Message::decode(&raw_query) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(error = %err, "dropping undecodable client query");
            return;
        }
    };

    let ignored = Router::ignored_questions(&message.questions);
    metrics.record_ignored_questions(ignored);

    let upstreams = router.upstreams_from_questions(&message.questions);
    if upstreams.is_empty() {
        metrics.record_no_upstreams_available();
        if let Ok(bytes) = message.to_servfail().encode() {
            reply.deliver(&bytes).await;
        }
        return;
    }

    let selected = take_upstreams(&upstreams);
    let send_time = Instant::now();
    let query_bytes = Bytes::from(raw_query);

    let (tx, mut rx) = mpsc::channel(selected.len());
    let handles: Vec<_> = selected
        .iter()
        .map(|&endpoint| {
            spawn_probe(
                transport,
                query_bytes.clone(),
                endpoint,
                config.probe_timeout,
                tx.clone(),
            )
        })
        .collect();
    drop(tx);

    let mut outstanding = selected;
    let global_deadline = send_time + config.global_timeout;

    let winner = loop {
        if outstanding.is_empty() {
            break None;
        }
        let remaining = global_deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            _ = sleep(remaining) => break None,
            event = rx.recv() => {
                let Some(event) = event else { break None; };
                remove_one(&mut outstanding, event.endpoint);
                match event.outcome {
                    ProbeOutcome::Reply(bytes) => {
                        metrics.record_success(event.endpoint, send_time.elapsed());
                        break Some((event.endpoint, bytes));
                    }
                    ProbeOutcome::Failed => {
                        metrics.record_failure(event.endpoint);
                    }
                }
            }
        }
    };

    match winner {
        None => {
            for endpoint in outstanding.drain(..) {
                metrics.record_failure(endpoint);
            }
            metrics.record_upstreams_failed();
        }
        Some((_, bytes)) => {
            reply.deliver(&bytes).await;
            // Losers get no more time than the winner took to arrive.
            let drain_timeout = send_time.elapsed();
            drain(outstanding, &mut rx, send_time, drain_timeout, &metrics).await;
        }
    }

    for handle in handles {
        handle.abort();
    }
}

async fn drain(
    mut outstanding: Vec<UpstreamEndpoint>,
    rx: &mut mpsc::Receiver<ProbeEvent>,
    send_time: Instant,
    drain_timeout: Duration,
    metrics: &Metrics,
) {
    let deadline = Instant::now() + drain_timeout;

    while !outstanding.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            _ = sleep(remaining) => {
                for endpoint in outstanding.drain(..) {
                    metrics.record_failure(endpoint);
                }
                return;
            }
            event = rx.recv() => {
                let Some(event) = event else { return; };
                remove_one(&mut outstanding, event.endpoint);
                match event.outcome {
                    ProbeOutcome::Reply(_) => {
                        metrics.record_success(event.endpoint, send_time.elapsed());
                    }
                    ProbeOutcome::Failed => {
                        metrics.record_failure(event.endpoint);
                    }
                }
            }
        }
    }
}

fn spawn_probe(
    transport: Transport,
    query: Bytes,
    endpoint: UpstreamEndpoint,
    probe_timeout: Duration,
    events: mpsc::Sender<ProbeEvent>,
) -> tokio::task::JoinHandle<()> {
    match transport {
        Transport::Udp => probe::spawn_udp_probe(query, endpoint, probe_timeout, events),
        Transport::Tcp => probe::spawn_tcp_probe(query, endpoint, probe_timeout, events),
    }
}

fn remove_one(outstanding: &mut Vec<UpstreamEndpoint>, endpoint: UpstreamEndpoint) {
    if let Some(pos) = outstanding.iter().position(|&ep| ep == endpoint) {
        outstanding.remove(pos);
    }
}

/// Selects up to `MAX_PROBES` endpoints to race. With `n <= MAX_PROBES` the
/// full router output is used as-is; otherwise two are sampled uniformly
/// with replacement, so a repeated endpoint in the router's output is a
/// sampling weight rather than a deduplication candidate.
fn take_upstreams(upstreams: &[UpstreamEndpoint]) -> Vec<UpstreamEndpoint> {
    if upstreams.len() <= MAX_PROBES {
        return upstreams.to_vec();
    }
    let mut rng = rand::rng();
    (0..MAX_PROBES)
        .map(|_| upstreams[rng.random_range(0..upstreams.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(n: u8) -> UpstreamEndpoint {
        format!("10.0.0.{n}:53").parse().unwrap()
    }

    #[test]
    fn take_upstreams_uses_all_when_at_or_under_cap() {
        let pool = vec![endpoint(1)];
        assert_eq!(take_upstreams(&pool), pool);

        let pool = vec![endpoint(1), endpoint(2)];
        assert_eq!(take_upstreams(&pool), pool);
    }

    #[test]
    fn take_upstreams_caps_at_two_for_larger_pools() {
        let pool = vec![endpoint(1), endpoint(2), endpoint(3), endpoint(4), endpoint(5)];
        let selected = take_upstreams(&pool);
        assert_eq!(selected.len(), MAX_PROBES);
        for ep in selected {
            assert!(pool.contains(&ep));
        }
    }

    #[test]
    fn remove_one_drops_a_single_matching_instance() {
        let mut outstanding = vec![endpoint(1), endpoint(1), endpoint(2)];
        remove_one(&mut outstanding, endpoint(1));
        assert_eq!(outstanding, vec![endpoint(1), endpoint(2)]);
    }
}
