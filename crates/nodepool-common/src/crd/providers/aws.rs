//! AWS platform configuration (CAPA)
//!
//! Cluster-level settings live on the HostedCluster, per-pool settings on the
//! NodePool. The builder in `nodepool-capi` combines both into an
//! `AWSMachineTemplate`.
//!
//! Reference: <https://github.com/kubernetes-sigs/cluster-api-provider-aws>

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::{AwsResourceReference, ResourceTag};

/// AWS settings of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatformSpec {
    /// AWS region (e.g., "us-east-1")
    pub region: String,

    /// Tags applied to every AWS resource of the cluster
    ///
    /// These win over pool tags with the same key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_tags: Vec<ResourceTag>,
}

/// AWS status of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatformStatus {
    /// Security group created by the control plane for worker nodes
    #[serde(
        default,
        rename = "defaultWorkerSecurityGroupID",
        skip_serializing_if = "String::is_empty"
    )]
    pub default_worker_security_group_id: String,
}

/// AWS settings of a NodePool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsNodePoolPlatform {
    /// EC2 instance type (e.g., "m5.large")
    pub instance_type: String,

    /// Subnet the instances are placed in
    #[serde(default)]
    pub subnet: AwsResourceReference,

    /// AMI id; resolved from the release image when empty
    #[serde(default, rename = "ami", skip_serializing_if = "String::is_empty")]
    pub ami: String,

    /// Extra security groups, placed before the cluster default group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<AwsResourceReference>,

    /// Root volume settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<Volume>,

    /// Tags applied to the pool's instances
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_tags: Vec<ResourceTag>,

    /// Tenancy, capacity reservation and spot settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementOptions>,
}

/// EBS root volume
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Size in GiB
    #[serde(default)]
    pub size: i64,

    /// Volume type (e.g., "gp3", "io1")
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,

    /// Provisioned IOPS
    #[serde(default, rename = "iops", skip_serializing_if = "is_zero")]
    pub iops: i64,

    /// Whether the volume is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,

    /// KMS key used for encryption
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encryption_key: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Placement of a pool's instances
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementOptions {
    /// Instance tenancy: "default", "dedicated" or "host"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenancy: String,

    /// Capacity reservation to launch into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_reservation: Option<CapacityReservationOptions>,

    /// Launch as spot instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_market_options: Option<SpotMarketOptions>,
}

/// Market type for capacity reservations
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum MarketType {
    /// On-demand capacity reservation
    OnDemand,
    /// Capacity block for ML workloads
    CapacityBlock,
}

/// Capacity reservation settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReservationOptions {
    /// Reservation id
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Market type of the reservation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<MarketType>,

    /// Reservation preference (e.g., "Open", "None", "CapacityReservationsOnly")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preference: String,
}

/// Spot instance settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpotMarketOptions {
    /// Maximum hourly price; on-demand price when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}
