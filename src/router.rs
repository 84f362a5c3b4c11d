use std::net::SocketAddr;

use crate::config::Config;
use crate::dns::Question;

/// `(ip, port)` pair identifying one upstream resolver. Equality is
/// structural, inherited directly from `SocketAddr`.
pub type UpstreamEndpoint = SocketAddr;

/// Outcome of asking the zone cache whether a name is locally authoritative.
pub enum Authority {
    Found,
    NotFound,
}

/// External collaborator recognizing locally-authoritative names. Any
/// non-`Found` outcome is treated as not-found.
pub trait ZoneCache: Send + Sync {
    fn get_authority(&self, name: &str) -> Authority;
}

/// Zone cache that never claims authority, so the crate is runnable without
/// a real zone store wired in.
pub struct NullZoneCache;

impl ZoneCache for NullZoneCache {
    fn get_authority(&self, _name: &str) -> Authority {
        Authority::NotFound
    }
}

pub struct Router {
    config: Config,
    zone_cache: Box<dyn ZoneCache>,
}

impl Router {
    pub fn new(config: Config, zone_cache: Box<dyn ZoneCache>) -> Self {
        Self { config, zone_cache }
    }

    /// Number of trailing questions dropped because only the first question
    /// in a request is ever routed.
    pub fn ignored_questions(questions: &[Question]) -> usize {
        questions.len().saturating_sub(1)
    }

    /// Maps a question list to an ordered upstream list, per the routing
    /// algorithm: multi-question requests are trimmed to the first question
    /// (with the remainder counted by the caller), the name is routed by its
    /// top-level reversed label, and the result may contain duplicates that
    /// weight later sampling.
    pub fn upstreams_from_questions(&self, questions: &[Question]) -> Vec<UpstreamEndpoint> {
        let Some(first) = questions.first() else {
            return Vec::new();
        };

        let name = first.name().to_lowercase();
        let mut reversed: Vec<&str> = name.split('.').collect();
        reversed.reverse();

        let pool = match reversed.first().copied() {
            Some("mesos") => &self.config.mesos_pool,
            Some("zk") | Some("spartan") => &self.config.zone_pool,
            _ => match self.zone_cache.get_authority(&name) {
                Authority::Found => &self.config.zone_pool,
                Authority::NotFound => &self.config.default_pool,
            },
        };

        pool.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{ResourceClass, ResourceType};

    fn question(name: &str) -> Question {
        Question {
            labels: name.split('.').map(str::to_string).collect(),
            qtype: ResourceType::A,
            qclass: ResourceClass::IN,
        }
    }

    fn router_with(config: Config) -> Router {
        Router::new(config, Box::new(NullZoneCache))
    }

    #[test]
    fn routes_mesos_suffix_to_mesos_pool() {
        let mut config = Config::default();
        config.mesos_pool = vec!["10.0.0.1:53".parse().unwrap()];
        config.default_pool = vec!["9.9.9.9:53".parse().unwrap()];
        let router = router_with(config);

        let result = router.upstreams_from_questions(&[question("foo.mesos")]);
        assert_eq!(result, vec!["10.0.0.1:53".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn routes_zk_and_spartan_to_the_same_zone_pool() {
        let mut config = Config::default();
        config.zone_pool = vec!["10.0.0.2:53".parse().unwrap()];
        let router = router_with(config);

        assert_eq!(
            router.upstreams_from_questions(&[question("master.zk")]),
            router.upstreams_from_questions(&[question("master.spartan")])
        );
    }

    #[test]
    fn falls_back_to_default_pool_for_unmatched_names() {
        let mut config = Config::default();
        config.default_pool = vec!["9.9.9.9:53".parse().unwrap()];
        let router = router_with(config);

        let result = router.upstreams_from_questions(&[question("example.com")]);
        assert_eq!(result, vec!["9.9.9.9:53".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn empty_question_list_yields_empty_pool() {
        let router = router_with(Config::default());
        assert!(router.upstreams_from_questions(&[]).is_empty());
    }

    #[test]
    fn duplicates_in_pool_are_preserved() {
        let mut config = Config::default();
        config.default_pool = vec![
            "9.9.9.9:53".parse().unwrap(),
            "9.9.9.9:53".parse().unwrap(),
        ];
        let router = router_with(config);

        let result = router.upstreams_from_questions(&[question("example.com")]);
        assert_eq!(result.len(), 2);
    }
}
