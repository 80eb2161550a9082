//! NodePool Custom Resource Definition
//!
//! A NodePool is a homogeneous group of worker machines attached to a
//! HostedCluster. The platform block selects which machine template gets built.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::providers::{AwsNodePoolPlatform, AzureNodePoolPlatform, PowerVSNodePoolPlatform};
use super::types::{PlatformType, Release, Taint};

/// Specification for a NodePool
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "NodePool",
    plural = "nodepools",
    shortname = "np",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.clusterName"}"#,
    printcolumn = r#"{"name":"Platform","type":"string","jsonPath":".spec.platform.type"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    /// Name of the HostedCluster this pool belongs to
    #[serde(default)]
    pub cluster_name: String,

    /// Release payload the pool's machines boot
    #[serde(default)]
    pub release: Release,

    /// Infrastructure platform
    #[serde(default)]
    pub platform: NodePoolPlatform,

    /// Labels applied to every node of the pool
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_labels: BTreeMap<String, String>,

    /// Taints applied to every node of the pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// CPU architecture of the pool's machines (e.g., "amd64", "arm64")
    #[serde(default = "default_arch")]
    pub arch: String,
}

fn default_arch() -> String {
    "amd64".to_string()
}

/// Platform block of a NodePool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlatform {
    /// Platform discriminator
    #[serde(rename = "type", default)]
    pub type_: PlatformType,

    /// AWS settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsNodePoolPlatform>,

    /// Azure settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureNodePoolPlatform>,

    /// PowerVS settings
    #[serde(default, rename = "powervs", skip_serializing_if = "Option::is_none")]
    pub powervs: Option<PowerVSNodePoolPlatform>,
}

impl NodePool {
    /// Value of an annotation, if set
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Name of the pool, empty when unset
    pub fn name_or_empty(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Namespace of the pool, empty when unset
    pub fn namespace_or_empty(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }
}
