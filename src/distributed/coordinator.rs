use futures_util::future::join_all;
use reqwest::Client;
use tracing::{info, warn};

use crate::args::ShardingPolicy;
use crate::error::DistributedError;
use crate::run::{RunSpec, RunSpecMessage};

use super::protocol::{SLAVE_START_PATH, SLAVE_STOP_PATH, StartMessage};
use super::registry::SlaveNode;
use super::summary::{DispatchSummary, SlaveFailure, shard_users};

/// Fans runs out to slave nodes. Each node is contacted independently; one
/// unreachable node never prevents delivery to the others.
#[derive(Debug, Clone)]
pub struct SlaveCoordinator {
    client: Client,
    sharding: ShardingPolicy,
}

impl SlaveCoordinator {
    #[must_use]
    pub const fn new(client: Client, sharding: ShardingPolicy) -> Self {
        Self { client, sharding }
    }

    #[must_use]
    pub const fn sharding(&self) -> ShardingPolicy {
        self.sharding
    }

    /// Sends `spec` to every node with its share of users.
    pub async fn dispatch(
        &self,
        run_id: &str,
        spec: &RunSpec,
        nodes: &[SlaveNode],
    ) -> DispatchSummary {
        let shares = shard_users(spec.user_count, nodes.len(), self.sharding);
        let mut summary = DispatchSummary::default();
        let mut pending = Vec::with_capacity(nodes.len());

        for (node, users) in nodes.iter().zip(shares) {
            if users == 0 {
                info!("Slave {} skipped: no users left to assign", node.address);
                summary.skipped.push(node.address.clone());
                continue;
            }
            let message = StartMessage {
                run_id: run_id.to_owned(),
                spec: RunSpecMessage::from_spec(spec, users),
            };
            pending.push(async move {
                let result = self.send_start(node, &message).await;
                (node, users, result)
            });
        }

        for (node, users, result) in join_all(pending).await {
            match result {
                Ok(()) => {
                    info!("Slave {} started {} users", node.address, users);
                    summary.delivered.push(node.address.clone());
                }
                Err(err) => {
                    warn!("Slave dispatch failed: {}", err);
                    summary.failed.push(SlaveFailure {
                        address: node.address.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        summary
    }

    /// Forwards a stop to every node.
    pub async fn stop_all(&self, nodes: &[SlaveNode]) -> DispatchSummary {
        let results = join_all(nodes.iter().map(|node| async move {
            let result = self.send_stop(node).await;
            (node, result)
        }))
        .await;

        let mut summary = DispatchSummary::default();
        for (node, result) in results {
            match result {
                Ok(()) => summary.delivered.push(node.address.clone()),
                Err(err) => {
                    warn!("Slave stop failed: {}", err);
                    summary.failed.push(SlaveFailure {
                        address: node.address.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        summary
    }

    async fn send_start(
        &self,
        node: &SlaveNode,
        message: &StartMessage,
    ) -> Result<(), DistributedError> {
        let request = self.client.post(node.endpoint(SLAVE_START_PATH)).json(message);
        Self::expect_ack(node, request).await
    }

    async fn send_stop(&self, node: &SlaveNode) -> Result<(), DistributedError> {
        let request = self.client.post(node.endpoint(SLAVE_STOP_PATH));
        Self::expect_ack(node, request).await
    }

    async fn expect_ack(
        node: &SlaveNode,
        request: reqwest::RequestBuilder,
    ) -> Result<(), DistributedError> {
        let response =
            request
                .send()
                .await
                .map_err(|err| DistributedError::SlaveUnreachable {
                    addr: node.address.clone(),
                    source: err,
                })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("<unreadable body: {}>", err));
        Err(DistributedError::SlaveRejected {
            addr: node.address.clone(),
            status: status.as_u16(),
            message,
        })
    }
}
