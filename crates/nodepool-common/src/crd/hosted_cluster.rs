//! HostedCluster Custom Resource Definition
//!
//! Only the fields the machine-template builders read are modeled: the infra
//! id, the platform blocks, and the worker security group reported in status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::providers::{AwsPlatformSpec, AwsPlatformStatus, AzurePlatformSpec, PowerVSPlatformSpec};
use super::types::PlatformType;

/// Specification for a HostedCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "HostedCluster",
    plural = "hostedclusters",
    shortname = "hc",
    status = "HostedClusterStatus",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"Platform","type":"string","jsonPath":".spec.platform.type"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterSpec {
    /// Unique id used to name and tag the cluster's cloud resources
    #[serde(default, rename = "infraID")]
    pub infra_id: String,

    /// Infrastructure platform
    #[serde(default)]
    pub platform: PlatformSpec,
}

/// Platform block of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Platform discriminator
    #[serde(rename = "type", default)]
    pub type_: PlatformType,

    /// AWS settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPlatformSpec>,

    /// Azure settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzurePlatformSpec>,

    /// PowerVS settings
    #[serde(default, rename = "powervs", skip_serializing_if = "Option::is_none")]
    pub powervs: Option<PowerVSPlatformSpec>,
}

/// Status for a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterStatus {
    /// Platform-specific status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformStatus>,
}

/// Platform-specific status of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    /// AWS status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPlatformStatus>,
}

impl HostedCluster {
    /// Default worker security group, empty when the control plane has not
    /// created it yet
    pub fn default_worker_security_group_id(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.platform.as_ref())
            .and_then(|p| p.aws.as_ref())
            .map(|aws| aws.default_worker_security_group_id.as_str())
            .unwrap_or_default()
    }

    /// Value of an annotation, if set
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}
