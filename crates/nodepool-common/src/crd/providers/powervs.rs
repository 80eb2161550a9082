//! IBM Cloud PowerVS platform configuration (CAPIBM)
//!
//! Reference: <https://github.com/kubernetes-sigs/cluster-api-provider-ibmcloud>

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::PowerVSResourceReference;

/// PowerVS settings of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerVSPlatformSpec {
    /// PowerVS region code (e.g., "dal", "lon")
    pub region: String,

    /// PowerVS zone (e.g., "dal12")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone: String,

    /// Workspace (service instance) the machines run in
    #[serde(rename = "serviceInstanceID")]
    pub service_instance_id: String,

    /// Network the machines attach to
    #[serde(default)]
    pub subnet: PowerVSResourceReference,

    /// IBM Cloud resource group
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,
}

/// How processors are allocated to a PowerVS machine
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerVSProcessorType {
    /// Whole cores dedicated to the machine
    Dedicated,
    /// Fractional cores from a shared pool
    #[default]
    Shared,
    /// Shared cores capped at the entitled capacity
    Capped,
}

impl std::fmt::Display for PowerVSProcessorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dedicated => write!(f, "dedicated"),
            Self::Shared => write!(f, "shared"),
            Self::Capped => write!(f, "capped"),
        }
    }
}

/// What happens to an imported boot image when its pool goes away
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerVSImageDeletePolicy {
    /// Delete the image with the pool
    #[default]
    Delete,
    /// Keep the image
    Retain,
}

impl std::fmt::Display for PowerVSImageDeletePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

/// PowerVS settings of a NodePool
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerVSNodePoolPlatform {
    /// Machine type (e.g., "s922", "e980")
    #[serde(default = "default_system_type")]
    pub system_type: String,

    /// Processor allocation
    #[serde(default)]
    pub processor_type: PowerVSProcessorType,

    /// Number of processors; fractional values are strings (e.g., "0.5")
    #[serde(default = "default_processors")]
    pub processors: IntOrString,

    /// Memory in GiB
    #[serde(default = "default_memory_gib", rename = "memoryGiB")]
    pub memory_gib: i32,

    /// Boot image; imported from the release image when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PowerVSResourceReference>,

    /// Storage tier of the imported boot image (e.g., "tier1", "tier3")
    #[serde(default = "default_storage_type")]
    pub storage_type: String,

    /// Fate of the imported boot image
    #[serde(default)]
    pub image_delete_policy: PowerVSImageDeletePolicy,
}

fn default_system_type() -> String {
    "s922".to_string()
}

fn default_processors() -> IntOrString {
    IntOrString::String("0.5".to_string())
}

fn default_memory_gib() -> i32 {
    32
}

fn default_storage_type() -> String {
    "tier1".to_string()
}

impl Default for PowerVSNodePoolPlatform {
    fn default() -> Self {
        Self {
            system_type: default_system_type(),
            processor_type: PowerVSProcessorType::default(),
            processors: default_processors(),
            memory_gib: default_memory_gib(),
            image: None,
            storage_type: default_storage_type(),
            image_delete_policy: PowerVSImageDeletePolicy::default(),
        }
    }
}
