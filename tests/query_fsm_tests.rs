use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, Notify};

use spartan_forwarder::config::Config;
use spartan_forwarder::dns::{Header, Message, Question, Rcode, ResourceClass, ResourceType};
use spartan_forwarder::metrics::Metrics;
use spartan_forwarder::query_fsm::{QueryFsm, Transport};
use spartan_forwarder::reply::ReplyHandle;
use spartan_forwarder::router::{NullZoneCache, Router};

/// Captures the single `deliver` call a query FSM is allowed to make.
struct CapturingReply {
    delivered: Mutex<Option<Vec<u8>>>,
    notify: Notify,
}

impl CapturingReply {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(None),
            notify: Notify::new(),
        })
    }

    async fn wait_for_delivery(&self, timeout: Duration) -> Option<Vec<u8>> {
        if let Some(bytes) = self.delivered.lock().await.clone() {
            return Some(bytes);
        }
        let wait = self.notify.notified();
        let _ = tokio::time::timeout(timeout, wait).await;
        self.delivered.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ReplyHandle for CapturingReply {
    async fn deliver(&self, bytes: &[u8]) {
        *self.delivered.lock().await = Some(bytes.to_vec());
        self.notify.notify_waiters();
    }
}

fn sample_query(id: u16) -> Vec<u8> {
    Message {
        header: Header {
            id,
            qr: false,
            opcode: 0,
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            z: 0,
            rcode: 0,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        questions: vec![Question {
            labels: vec!["example".to_string(), "com".to_string()],
            qtype: ResourceType::A,
            qclass: ResourceClass::IN,
        }],
    }
    .encode()
    .expect("encode succeeds")
}

/// Spawns a fake upstream that replies to every datagram after `delay`.
async fn spawn_fake_upstream(delay: Duration) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let request = buf[..len].to_vec();
            let delay = delay;
            let socket_addr = from;
            let response = Message::decode(&request)
                .map(|mut message| {
                    message.header.qr = true;
                    message.header.rcode = Rcode::NO_ERROR;
                    message.encode().unwrap()
                })
                .unwrap_or_default();
            tokio::time::sleep(delay).await;
            let _ = socket.send_to(&response, socket_addr).await;
        }
    });

    addr
}

/// Spawns a fake upstream that never replies, to exercise timeout paths.
async fn spawn_silent_upstream() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            if socket.recv_from(&mut buf).await.is_err() {
                return;
            }
            // never reply
        }
    });
    addr
}

fn router_with_default_pool(pool: Vec<SocketAddr>) -> Arc<Router> {
    let mut config = Config::default();
    config.default_pool = pool;
    Arc::new(Router::new(config, Box::new(NullZoneCache)))
}

#[tokio::test]
async fn fast_winner_delivers_its_reply() {
    let fast = spawn_fake_upstream(Duration::from_millis(5)).await;
    let slow = spawn_fake_upstream(Duration::from_millis(200)).await;

    let router = router_with_default_pool(vec![fast, slow]);
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut config = Config::default();
    config.global_timeout = Duration::from_secs(2);
    config.probe_timeout = Duration::from_secs(2);
    let config = Arc::new(config);

    let reply = CapturingReply::new();
    let permits = tokio::sync::Semaphore::new(1);
    let permit = Arc::new(permits).acquire_owned().await.unwrap();

    QueryFsm::start(
        reply.clone(),
        sample_query(0xAAAA),
        Transport::Udp,
        router,
        metrics,
        config,
        permit,
    );

    let delivered = reply
        .wait_for_delivery(Duration::from_secs(1))
        .await
        .expect("a reply was delivered");

    let decoded = Message::decode(&delivered).unwrap();
    assert_eq!(decoded.header.id, 0xAAAA);
    assert_eq!(decoded.header.rcode, Rcode::NO_ERROR);
}

#[tokio::test]
async fn all_upstreams_silent_yields_no_reply() {
    let a = spawn_silent_upstream().await;
    let b = spawn_silent_upstream().await;

    let router = router_with_default_pool(vec![a, b]);
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut config = Config::default();
    config.global_timeout = Duration::from_millis(100);
    config.probe_timeout = Duration::from_millis(100);
    let config = Arc::new(config);

    let reply = CapturingReply::new();
    let permits = tokio::sync::Semaphore::new(1);
    let permit = Arc::new(permits).acquire_owned().await.unwrap();

    QueryFsm::start(
        reply.clone(),
        sample_query(0xBBBB),
        Transport::Udp,
        router,
        metrics,
        config,
        permit,
    );

    let delivered = reply.wait_for_delivery(Duration::from_millis(500)).await;
    assert!(delivered.is_none());
}

#[tokio::test]
async fn empty_router_result_synthesizes_servfail() {
    let router = router_with_default_pool(Vec::new());
    let metrics = Arc::new(Metrics::new().unwrap());
    let config = Arc::new(Config::default());

    let reply = CapturingReply::new();
    let permits = tokio::sync::Semaphore::new(1);
    let permit = Arc::new(permits).acquire_owned().await.unwrap();

    QueryFsm::start(
        reply.clone(),
        sample_query(0xCCCC),
        Transport::Udp,
        router,
        metrics,
        config,
        permit,
    );

    let delivered = reply
        .wait_for_delivery(Duration::from_secs(1))
        .await
        .expect("servfail was delivered");

    let decoded = Message::decode(&delivered).unwrap();
    assert_eq!(decoded.header.id, 0xCCCC);
    assert_eq!(decoded.header.rcode, Rcode::SERVER_FAILURE);
}

#[tokio::test]
async fn undecodable_query_is_dropped_silently() {
    let router = router_with_default_pool(vec!["127.0.0.1:1".parse().unwrap()]);
    let metrics = Arc::new(Metrics::new().unwrap());
    let config = Arc::new(Config::default());

    let reply = CapturingReply::new();
    let permits = tokio::sync::Semaphore::new(1);
    let permit = Arc::new(permits).acquire_owned().await.unwrap();

    QueryFsm::start(
        reply.clone(),
        vec![0u8; 2],
        Transport::Udp,
        router,
        metrics,
        config,
        permit,
    );

    let delivered = reply.wait_for_delivery(Duration::from_millis(200)).await;
    assert!(delivered.is_none());
}
