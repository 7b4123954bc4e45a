//! Key template tables.
//!
//! Codes are persisted by the alerters; changing one orphans every value
//! already written under it. Append new entries, never renumber.

use crate::data::TagChange;

pub const PARENT_HASH: &str = "hash_p1";

pub const SYSTEM_METRICS: &[&str] = &[
    "s1", // process_cpu_seconds_total
    "s2", // process_memory_usage
    "s3", // virtual_memory_usage
    "s4", // open_file_descriptors
    "s5", // system_cpu_usage
    "s6", // system_ram_usage
    "s7", // system_storage_usage
    "s8", // network_transmit_bytes_per_second
    "s9", // network_receive_bytes_per_second
    "s10", // network_receive_bytes_total
    "s11", // network_transmit_bytes_total
    "s12", // disk_io_time_seconds_total
    "s13", // disk_io_time_seconds_in_interval
    "s14", // last_monitored
    "s15", // went_down_at
];

pub const GITHUB_METRICS: &[&str] = &[
    "gh1", // no_of_releases
    "gh2", // last_monitored
];

pub const SYSTEM_ALERTS: &[&str] = &[
    "alert_system1", // open_file_descriptors
    "alert_system2", // system_cpu_usage
    "alert_system3", // system_storage_usage
    "alert_system4", // system_ram_usage
    "alert_system5", // system_is_down
    "alert_system6", // metric_not_found
    "alert_system7", // invalid_url
];

pub const CHAINLINK_NODE_ALERTS: &[&str] = &[
    "alert_cl_node1", // head_tracker_current_head
    "alert_cl_node2", // head_tracker_heads_received_total
    "alert_cl_node3", // max_unconfirmed_blocks
    "alert_cl_node4", // process_start_time_seconds
    "alert_cl_node5", // tx_manager_gas_bump_exceeds_limit_total
    "alert_cl_node6", // unconfirmed_transactions
    "alert_cl_node7", // run_status_update_total
    "alert_cl_node8", // eth_balance_amount
    "alert_cl_node9", // eth_balance_amount_increase
    "alert_cl_node10", // node_is_down
    "alert_cl_node11", // prometheus_is_down
];

pub const EVM_NODE_ALERTS: &[&str] = &[
    "alert_evm_node1", // evm_node_is_down
    "alert_evm_node2", // evm_block_syncing_block_height_difference
    "alert_evm_node3", // evm_block_syncing_no_change_in_block_height
    "alert_evm_node4", // evm_invalid_url
];

pub const COSMOS_NODE_ALERTS: &[&str] = &[
    "alert_cosmos_node1", // node_is_down
    "alert_cosmos_node2", // validator_was_slashed
    "alert_cosmos_node3", // node_is_syncing
    "alert_cosmos_node4", // validator_is_not_active
    "alert_cosmos_node5", // validator_is_jailed
    "alert_cosmos_node6", // blocks_missed
    "alert_cosmos_node7", // no_change_in_height
    "alert_cosmos_node8", // block_height_difference
    "alert_cosmos_node9", // prometheus_is_down
    "alert_cosmos_node10", // tendermint_rpc_is_down
    "alert_cosmos_node11", // cosmos_rest_is_down
];

pub const SUBSTRATE_NODE_ALERTS: &[&str] = &[
    "alert_substrate_node1", // node_is_down
    "alert_substrate_node2", // no_change_in_best_block_height
    "alert_substrate_node3", // no_change_in_finalized_block_height
    "alert_substrate_node4", // node_is_syncing
    "alert_substrate_node5", // validator_is_not_active
    "alert_substrate_node6", // validator_is_not_elected
    "alert_substrate_node7", // validator_bonded_amount_changed
    "alert_substrate_node8", // no_heartbeat_and_block_authored
    "alert_substrate_node9", // offline
    "alert_substrate_node10", // payout_not_claimed
    "alert_substrate_node11", // controller_address_changed
    "alert_substrate_node12", // validator_was_slashed
];

pub const GITHUB_ALERTS: &[&str] = &[
    "alert_github1", // github_release
    "alert_github2", // cannot_access_github
    "alert_github3", // github_api_call_error
];

pub const DOCKERHUB_ALERTS: &[&str] = &[
    "alert_dockerhub1", // dockerhub_new_tag
    "alert_dockerhub2", // dockerhub_updated_tag
    "alert_dockerhub3", // dockerhub_deleted_tag
    "alert_dockerhub4", // cannot_access_dockerhub
    "alert_dockerhub5", // dockerhub_api_call_error
];

pub const COSMOS_NETWORK_ALERTS: &[&str] = &[
    "alert_cosmos_network1", // new_proposal
    "alert_cosmos_network2", // proposal_concluded
    "alert_cosmos_network3", // no_synced_cosmos_rest_source
    "alert_cosmos_network4", // cosmos_network_data_error
];

pub const SUBSTRATE_NETWORK_ALERTS: &[&str] = &[
    "alert_substrate_network1", // grandpa_is_stalled
    "alert_substrate_network2", // new_referendum
    "alert_substrate_network3", // referendum_concluded
    "alert_substrate_network4", // no_synced_substrate_websocket_source
];

pub const CHAINLINK_CONTRACT_ALERTS: &[&str] = &[
    "alert_cl_contract1", // price_feed_not_observed
    "alert_cl_contract2", // price_feed_deviation
    "alert_cl_contract3", // consensus_failure
    "alert_cl_contract4", // error_retrieving_chainlink_contract_data
];

pub const RELEASE_CODE: &str = "alert_github1";

pub fn tag_code(change: TagChange) -> &'static str {
    match change {
        TagChange::New => "alert_dockerhub1",
        TagChange::Updated => "alert_dockerhub2",
        TagChange::Deleted => "alert_dockerhub3",
    }
}

/// Kind of node a node alert applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Chainlink,
    Evm,
    Cosmos,
    Substrate,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Chainlink,
        NodeKind::Evm,
        NodeKind::Cosmos,
        NodeKind::Substrate,
    ];

    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Chainlink => CHAINLINK_NODE_ALERTS,
            NodeKind::Evm => EVM_NODE_ALERTS,
            NodeKind::Cosmos => COSMOS_NODE_ALERTS,
            NodeKind::Substrate => SUBSTRATE_NODE_ALERTS,
        }
    }

    /// Substring shared by every alert code of this node kind
    pub fn marker(&self) -> &'static str {
        match self {
            NodeKind::Chainlink => "alert_cl_node",
            NodeKind::Evm => "alert_evm_node",
            NodeKind::Cosmos => "alert_cosmos_node",
            NodeKind::Substrate => "alert_substrate_node",
        }
    }
}

/// Data category a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    SystemMetric,
    GithubMetric,
    SystemAlert,
    NodeAlert(NodeKind),
    GithubAlert,
    DockerhubAlert,
    ChainSourcedAlert,
}

impl KeyCategory {
    /// Template codes for this category, in table order.
    pub fn codes(&self) -> Vec<&'static str> {
        match self {
            KeyCategory::SystemMetric => codes_of(&[SYSTEM_METRICS]),
            KeyCategory::GithubMetric => codes_of(&[GITHUB_METRICS]),
            KeyCategory::SystemAlert => codes_of(&[SYSTEM_ALERTS]),
            KeyCategory::NodeAlert(kind) => codes_of(&[kind.templates()]),
            KeyCategory::GithubAlert => codes_of(&[GITHUB_ALERTS]),
            KeyCategory::DockerhubAlert => codes_of(&[DOCKERHUB_ALERTS]),
            KeyCategory::ChainSourcedAlert => codes_of(&[
                COSMOS_NETWORK_ALERTS,
                SUBSTRATE_NETWORK_ALERTS,
                CHAINLINK_CONTRACT_ALERTS,
            ]),
        }
    }
}

/// Alert codes expected for any declared node, across all node kinds.
pub fn node_alert_codes() -> Vec<&'static str> {
    let tables: Vec<&'static [&'static str]> = NodeKind::ALL.iter().map(|k| k.templates()).collect();
    codes_of(&tables)
}

fn codes_of(tables: &[&'static [&'static str]]) -> Vec<&'static str> {
    tables
        .iter()
        .flat_map(|table| table.iter().copied())
        .collect()
}
