//! Supporting types shared by the HostedCluster and NodePool CRDs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Infrastructure platform a cluster or pool runs on
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PlatformType {
    /// Amazon Web Services
    #[serde(rename = "AWS")]
    Aws,
    /// Microsoft Azure
    Azure,
    /// IBM Cloud Power Virtual Server
    PowerVS,
    /// KubeVirt virtual machines
    KubeVirt,
    /// OpenStack
    OpenStack,
    /// Agent-provisioned bare metal
    Agent,
    /// No infrastructure integration
    #[default]
    None,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aws => write!(f, "AWS"),
            Self::Azure => write!(f, "Azure"),
            Self::PowerVS => write!(f, "PowerVS"),
            Self::KubeVirt => write!(f, "KubeVirt"),
            Self::OpenStack => write!(f, "OpenStack"),
            Self::Agent => write!(f, "Agent"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Effect of a node taint
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaintEffect {
    /// Do not schedule new pods without a matching toleration
    NoSchedule,
    /// Avoid scheduling pods without a matching toleration
    PreferNoSchedule,
    /// Evict running pods without a matching toleration
    NoExecute,
}

impl std::str::FromStr for TaintEffect {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NoSchedule" => Ok(Self::NoSchedule),
            "PreferNoSchedule" => Ok(Self::PreferNoSchedule),
            "NoExecute" => Ok(Self::NoExecute),
            _ => Err(crate::Error::invalid_input(format!(
                "invalid taint effect: {s}, expected one of: NoSchedule, PreferNoSchedule, NoExecute"
            ))),
        }
    }
}

impl std::fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSchedule => write!(f, "NoSchedule"),
            Self::PreferNoSchedule => write!(f, "PreferNoSchedule"),
            Self::NoExecute => write!(f, "NoExecute"),
        }
    }
}

/// A taint applied to every node of a pool
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
pub struct Taint {
    /// Taint key
    pub key: String,
    /// Taint value (may be empty)
    #[serde(default)]
    pub value: String,
    /// Taint effect
    pub effect: TaintEffect,
}

impl Taint {
    /// Create a taint
    pub fn new(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect,
        }
    }
}

/// A key/value tag applied to cloud resources
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ResourceTag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl ResourceTag {
    /// Create a tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Filter used to select AWS resources by attribute
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Filter {
    /// Filter name (e.g. "tag:Name")
    pub name: String,
    /// Accepted values
    #[serde(default)]
    pub values: Vec<String>,
}

/// Reference to an AWS resource by id or by filters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct AwsResourceReference {
    /// Resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Filters matching the resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl AwsResourceReference {
    /// Reference a resource by id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            filters: Vec::new(),
        }
    }
}

/// Reference to an IBM Cloud resource by id or name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PowerVSResourceReference {
    /// Resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Release payload a pool runs
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Release {
    /// Release image pull spec
    pub image: String,
}
