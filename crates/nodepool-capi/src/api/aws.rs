//! CAPA `AWSMachineTemplate` (infrastructure.cluster.x-k8s.io/v1beta2)

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use nodepool_common::crd::AwsResourceReference;

/// Spec of an AWSMachineTemplate
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta2",
    kind = "AWSMachineTemplate",
    plural = "awsmachinetemplates",
    status = "AWSMachineTemplateStatus",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct AWSMachineTemplateSpec {
    /// Machine template body
    pub template: AWSMachineTemplateResource,
}

/// Template wrapper around the machine spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AWSMachineTemplateResource {
    /// Machine spec stamped into every AWSMachine
    pub spec: AWSMachineSpec,
}

/// Status of an AWSMachineTemplate
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AWSMachineTemplateStatus {
    /// Resources of one machine, reported natively by CAPA
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity: BTreeMap<String, Quantity>,
}

/// EC2 instance settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AWSMachineSpec {
    /// Boot image
    #[serde(default)]
    pub ami: AMIReference,

    /// EC2 instance type
    pub instance_type: String,

    /// IAM instance profile attached to the instance
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iam_instance_profile: String,

    /// Tags added to the instance and its volumes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_tags: BTreeMap<String, String>,

    /// Security groups in addition to the CAPA-managed ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_security_groups: Vec<AwsResourceReference>,

    /// Subnet the instance is placed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<AwsResourceReference>,

    /// Whether user data is passed uncompressed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncompressed_user_data: Option<bool>,

    /// How cloud-init fetches the bootstrap secret
    #[serde(default)]
    pub cloud_init: CloudInit,

    /// Root EBS volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<Volume>,

    /// Instance metadata service settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_metadata_options: Option<InstanceMetadataOptions>,

    /// Assign a public IP
    #[serde(default, rename = "publicIP", skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<bool>,

    /// Instance tenancy
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenancy: String,

    /// Capacity reservation to launch into
    #[serde(default, rename = "capacityReservationID", skip_serializing_if = "Option::is_none")]
    pub capacity_reservation_id: Option<String>,

    /// Capacity reservation preference
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub capacity_reservation_preference: String,

    /// Purchasing model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<MarketType>,

    /// Spot request settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_market_options: Option<SpotMarketOptions>,
}

/// Reference to an AMI
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct AMIReference {
    /// AMI id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Secret delivery settings for cloud-init
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudInit {
    /// Pass the bootstrap data directly in user data
    #[serde(default)]
    pub insecure_skip_secrets_manager: bool,

    /// Backend used when the secrets manager is not skipped
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secure_secrets_backend: String,
}

/// EBS volume
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Size in GiB
    pub size: i64,

    /// Volume type
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,

    /// Provisioned IOPS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,

    /// Encrypt the volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,

    /// KMS key used for encryption
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encryption_key: String,
}

/// IMDS token requirement
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HttpTokensState {
    /// IMDSv1 and IMDSv2
    #[default]
    Optional,
    /// IMDSv2 only
    Required,
}

/// On/off switch used by the IMDS settings
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceMetadataState {
    /// Turned on
    #[default]
    Enabled,
    /// Turned off
    Disabled,
}

/// Instance metadata service settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadataOptions {
    /// IMDS endpoint state
    pub http_endpoint: InstanceMetadataState,
    /// Hop limit of IMDS responses
    pub http_put_response_hop_limit: i64,
    /// Token requirement
    pub http_tokens: HttpTokensState,
    /// Expose instance tags through IMDS
    pub instance_metadata_tags: InstanceMetadataState,
}

/// EC2 purchasing model
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum MarketType {
    /// On-demand instances
    OnDemand,
    /// Spot instances
    Spot,
    /// Capacity blocks for ML
    CapacityBlock,
}

/// Spot request settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpotMarketOptions {
    /// Maximum hourly price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}
