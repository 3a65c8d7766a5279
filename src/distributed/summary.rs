use serde::{Deserialize, Serialize};

use crate::args::ShardingPolicy;

/// One slave that did not acknowledge a start or stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveFailure {
    pub address: String,
    pub reason: String,
}

/// Per-node result of a best-effort fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<SlaveFailure>,
    /// Nodes whose share of users was zero.
    pub skipped: Vec<String>,
}

impl DispatchSummary {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Users each of `nodes` slaves should run for a run of `total` users.
///
/// `Divide` hands the remainder to the first nodes, so shares differ by at
/// most one and always sum to `total`.
#[must_use]
pub fn shard_users(total: usize, nodes: usize, policy: ShardingPolicy) -> Vec<usize> {
    match policy {
        ShardingPolicy::Replicate => vec![total; nodes],
        ShardingPolicy::Divide => {
            let base = total.checked_div(nodes).unwrap_or(0);
            let remainder = total.checked_rem(nodes).unwrap_or(0);
            (0..nodes)
                .map(|idx| base.saturating_add(usize::from(idx < remainder)))
                .collect()
        }
    }
}
