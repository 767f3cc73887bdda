//! Service kind -> vertical tier classification.

use crate::models::NodeAttributes;

/// Vertical band of a resource inside its container, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Edge = 0,
    Compute = 1,
    Cache = 2,
    Data = 3,
}

const EDGE_KINDS: &[&str] = &[
    "alb",
    "elb",
    "nlb",
    "load-balancer",
    "api-gateway",
    "apigateway",
    "cloudfront",
    "cdn",
    "internet-gateway",
    "igw",
    "nat-gateway",
    "nat",
    "waf",
    "route53",
];

const CACHE_KINDS: &[&str] = &["elasticache", "redis", "memcached", "cache"];

const DATA_KINDS: &[&str] = &[
    "rds",
    "aurora",
    "dynamodb",
    "s3",
    "efs",
    "documentdb",
    "redshift",
    "database",
];

/// Kinds that can serve as the entry point of the top-level enclosure
const ENTRY_KINDS: &[&str] = &[
    "alb",
    "elb",
    "nlb",
    "load-balancer",
    "api-gateway",
    "apigateway",
];

fn normalize(kind: &str) -> String {
    let lowered = kind.trim().to_ascii_lowercase().replace(['_', ' '], "-");
    let stripped = lowered
        .strip_prefix("aws-")
        .or_else(|| lowered.strip_prefix("amazon-"))
        .unwrap_or(&lowered);
    stripped.to_string()
}

impl Tier {
    /// Tier derived from a service kind. Unknown kinds land in `Compute`.
    pub fn for_service_kind(kind: &str) -> Tier {
        let kind = normalize(kind);
        let kind = kind.as_str();
        if EDGE_KINDS.contains(&kind) {
            Tier::Edge
        } else if CACHE_KINDS.contains(&kind) {
            Tier::Cache
        } else if DATA_KINDS.contains(&kind) {
            Tier::Data
        } else {
            Tier::Compute
        }
    }

    /// Tier from an explicit hint; values past the last tier clamp to `Data`
    pub fn from_hint(hint: u8) -> Tier {
        match hint {
            0 => Tier::Edge,
            1 => Tier::Compute,
            2 => Tier::Cache,
            _ => Tier::Data,
        }
    }

    pub fn of(attributes: &NodeAttributes) -> Tier {
        match attributes.tier_hint {
            Some(hint) => Tier::from_hint(hint),
            None => Tier::for_service_kind(&attributes.service_kind),
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Load balancers and API gateways
pub fn is_entry_point(service_kind: &str) -> bool {
    ENTRY_KINDS.contains(&normalize(service_kind).as_str())
}
