use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Process-wide configuration, loaded once at startup and treated as
/// effectively immutable for the lifetime of any in-flight query.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the UDP listener binds.
    pub udp_bind_addr: SocketAddr,

    /// Address the TCP listener binds.
    pub tcp_bind_addr: SocketAddr,

    /// Address the metrics/health HTTP server binds. `None` disables it.
    pub http_bind_addr: Option<SocketAddr>,

    /// Upstream pool for the `mesos` suffix.
    pub mesos_pool: Vec<SocketAddr>,

    /// Upstream pool for the `zk` and `spartan` suffixes.
    pub zone_pool: Vec<SocketAddr>,

    /// Upstream pool for everything else that isn't locally authoritative.
    pub default_pool: Vec<SocketAddr>,

    /// Time from entering `WaitForFirstReply` to a winning reply.
    pub global_timeout: Duration,

    /// Per-probe send/receive timeout.
    pub probe_timeout: Duration,

    /// Cap on concurrently in-flight queries, enforced by a semaphore shared
    /// across the UDP and TCP listeners.
    pub max_concurrent_queries: usize,

    /// Worker threads for the Tokio runtime (0 = let Tokio pick).
    pub worker_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            udp_bind_addr: "0.0.0.0:53".parse().expect("default UDP bind is valid"),
            tcp_bind_addr: "0.0.0.0:53".parse().expect("default TCP bind is valid"),
            http_bind_addr: Some(
                "127.0.0.1:9053"
                    .parse()
                    .expect("default HTTP bind is valid"),
            ),
            mesos_pool: Vec::new(),
            zone_pool: Vec::new(),
            default_pool: vec![
                "8.8.8.8:53".parse().expect("default upstream is valid"),
                "4.2.2.1:53".parse().expect("default upstream is valid"),
                "8.8.8.8:53".parse().expect("default upstream is valid"),
                "4.2.2.1:53".parse().expect("default upstream is valid"),
                "8.8.8.8:53".parse().expect("default upstream is valid"),
            ],
            global_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
            max_concurrent_queries: 4096,
            worker_threads: 0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SPARTAN_UDP_BIND_ADDR") {
            config.udp_bind_addr = addr
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddress(addr))?;
        }

        if let Ok(addr) = std::env::var("SPARTAN_TCP_BIND_ADDR") {
            config.tcp_bind_addr = addr
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddress(addr))?;
        }

        match std::env::var("SPARTAN_HTTP_BIND_ADDR") {
            Ok(addr) if addr.eq_ignore_ascii_case("none") => config.http_bind_addr = None,
            Ok(addr) => {
                config.http_bind_addr = Some(
                    addr.parse()
                        .map_err(|_| ConfigError::InvalidHttpBindAddress(addr))?,
                );
            }
            Err(_) => {}
        }

        if let Ok(pool) = std::env::var("SPARTAN_MESOS_UPSTREAMS") {
            config.mesos_pool = parse_pool(&pool)?;
        }

        if let Ok(pool) = std::env::var("SPARTAN_ZONE_UPSTREAMS") {
            config.zone_pool = parse_pool(&pool)?;
        }

        if let Ok(pool) = std::env::var("SPARTAN_DEFAULT_UPSTREAMS") {
            config.default_pool = parse_pool(&pool)?;
        }

        if let Ok(timeout) = std::env::var("SPARTAN_GLOBAL_TIMEOUT_SECS") {
            let secs = timeout
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
            if secs == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "global timeout must be greater than 0".to_string(),
                ));
            }
            config.global_timeout = Duration::from_secs(secs);
        }

        if let Ok(timeout) = std::env::var("SPARTAN_PROBE_TIMEOUT_SECS") {
            let secs = timeout
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
            if secs == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "probe timeout must be greater than 0".to_string(),
                ));
            }
            config.probe_timeout = Duration::from_secs(secs);
        }

        if let Ok(max) = std::env::var("SPARTAN_MAX_CONCURRENT_QUERIES") {
            config.max_concurrent_queries = max.parse::<usize>().map_err(|_| {
                ConfigError::InvalidMaxConcurrentQueries(max.clone())
            })?;
            if config.max_concurrent_queries == 0 {
                return Err(ConfigError::InvalidMaxConcurrentQueries(
                    "must be greater than 0".to_string(),
                ));
            }
        }

        if let Ok(threads) = std::env::var("SPARTAN_WORKER_THREADS") {
            config.worker_threads = threads
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidWorkerThreads(threads))?;
        }

        Ok(config)
    }
}

/// Parses a comma-separated list of `ip:port` entries. Duplicates are kept
/// deliberately: the router samples with replacement and repeated entries
/// are a weighting, not a typo.
fn parse_pool(raw: &str) -> Result<Vec<SocketAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidUpstreamServer(s.to_string()))
        })
        .collect()
}
