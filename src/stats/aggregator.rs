//! View counting over recorded hits

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use super::event_uri;
use crate::error::{DomainError, DomainResult};
use crate::store::{EntityStore, HitFilter};
use crate::types::{EventId, Hit, ViewStats};
use crate::utils::time::{format_wire, Clock};

/// Hit sets larger than this are tallied on the rayon pool
pub const PARALLEL_AGGREGATION_THRESHOLD: usize = 10_000;

/// Counts hits per event or per (app, uri)
pub struct ViewCountAggregator {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl ViewCountAggregator {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Views of each event in `[since, now]`, rows or distinct ips.
    ///
    /// Every id in `event_ids` is a key of the result; events nobody viewed
    /// map to 0. Hits from every app count.
    pub fn count_views(
        &self,
        event_ids: &[EventId],
        since: DateTime<Utc>,
        unique: bool,
    ) -> DomainResult<HashMap<EventId, u64>> {
        let mut views: HashMap<EventId, u64> = event_ids.iter().map(|id| (*id, 0)).collect();
        if event_ids.is_empty() {
            return Ok(views);
        }

        let uris: HashMap<String, EventId> = event_ids.iter().map(|id| (event_uri(*id), *id)).collect();
        let hits = self.store.list_hits(&HitFilter {
            start: since,
            end: self.clock.now(),
            uris: uris.keys().cloned().collect(),
        })?;

        for (uri, tally) in tally(&hits, |hit| hit.uri.as_str()) {
            if let Some(id) = uris.get(uri) {
                views.insert(*id, tally.count(unique));
            }
        }
        Ok(views)
    }

    /// Hits in `[start, end]` grouped by (app, uri), most viewed first.
    ///
    /// An empty `uris` selects every uri.
    pub fn stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        uris: &[String],
        unique: bool,
    ) -> DomainResult<Vec<ViewStats>> {
        if start > end {
            return Err(DomainError::validation(
                "start",
                format!("{} is after {}", format_wire(&start), format_wire(&end)),
            ));
        }

        let hits = self.store.list_hits(&HitFilter {
            start,
            end,
            uris: uris.to_vec(),
        })?;
        debug!(hits = hits.len(), unique, "aggregating stats");

        let mut stats: Vec<ViewStats> = tally(&hits, |hit| (hit.app.as_str(), hit.uri.as_str()))
            .into_iter()
            .map(|((app, uri), tally)| ViewStats {
                app: app.to_string(),
                uri: uri.to_string(),
                hits: tally.count(unique),
            })
            .collect();
        stats.sort_by(|a, b| {
            b.hits
                .cmp(&a.hits)
                .then_with(|| a.app.cmp(&b.app))
                .then_with(|| a.uri.cmp(&b.uri))
        });
        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct Tally<'a> {
    rows: u64,
    ips: HashSet<&'a str>,
}

impl<'a> Tally<'a> {
    fn add(&mut self, hit: &'a Hit) {
        self.rows += 1;
        self.ips.insert(hit.ip.as_str());
    }

    fn merge(&mut self, other: Tally<'a>) {
        self.rows += other.rows;
        self.ips.extend(other.ips);
    }

    fn count(&self, unique: bool) -> u64 {
        if unique {
            self.ips.len() as u64
        } else {
            self.rows
        }
    }
}

fn tally<'a, K, F>(hits: &'a [Hit], key: F) -> HashMap<K, Tally<'a>>
where
    K: Eq + Hash + Send,
    F: Fn(&'a Hit) -> K + Sync,
{
    if hits.len() > PARALLEL_AGGREGATION_THRESHOLD {
        hits.par_iter()
            .fold(HashMap::new, |mut acc: HashMap<K, Tally<'a>>, hit| {
                acc.entry(key(hit)).or_default().add(hit);
                acc
            })
            .reduce(HashMap::new, |mut left, right| {
                for (k, tally) in right {
                    left.entry(k).or_default().merge(tally);
                }
                left
            })
    } else {
        let mut acc: HashMap<K, Tally<'a>> = HashMap::new();
        for hit in hits {
            acc.entry(key(hit)).or_default().add(hit);
        }
        acc
    }
}
