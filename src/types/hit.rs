//! Access hits and aggregated view statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HitId;
use crate::utils::time::wire_format;

/// One recorded access, append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub id: HitId,
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "wire_format")]
    pub timestamp: DateTime<Utc>,
}

/// A hit before the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHit {
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "wire_format")]
    pub timestamp: DateTime<Utc>,
}

impl NewHit {
    pub fn into_hit(self, id: HitId) -> Hit {
        Hit {
            id,
            app: self.app,
            uri: self.uri,
            ip: self.ip,
            timestamp: self.timestamp,
        }
    }
}

/// Hit count for one (app, uri) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: u64,
}
