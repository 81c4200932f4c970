//! External collaborator contracts: the follow graph and the engagement
//! index. Both are best-effort inputs to ranking; neither may block a page
//! from rendering.

use crate::feed::types::EngagementCounters;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Follow relationships, cached client-side; reads are synchronous.
pub trait FollowGraph: Send + Sync {
    fn followed_author_ids(&self) -> HashSet<String>;
}

/// Engagement counters by item id. May return a partial or empty map; the
/// session bounds the call with a timeout and ranks without counters when
/// it does not answer in time.
#[async_trait]
pub trait EngagementIndex: Send + Sync {
    async fn get(&self, ids: &[String]) -> HashMap<String, EngagementCounters>;
}

/// Fixed follow list, for the driver binary and tests.
pub struct StaticFollowGraph {
    ids: HashSet<String>,
}

impl StaticFollowGraph {
    pub fn new<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl FollowGraph for StaticFollowGraph {
    fn followed_author_ids(&self) -> HashSet<String> {
        self.ids.clone()
    }
}

/// Engagement index that answers with nothing, forcing recency ranking.
pub struct NullEngagementIndex;

#[async_trait]
impl EngagementIndex for NullEngagementIndex {
    async fn get(&self, _ids: &[String]) -> HashMap<String, EngagementCounters> {
        HashMap::new()
    }
}
