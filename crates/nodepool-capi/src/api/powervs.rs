//! CAPIBM `IBMPowerVSMachineTemplate` and `IBMPowerVSImage`
//! (infrastructure.cluster.x-k8s.io/v1beta1)

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use nodepool_common::crd::PowerVSResourceReference;

/// Spec of an IBMPowerVSMachineTemplate
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "IBMPowerVSMachineTemplate",
    plural = "ibmpowervsmachinetemplates",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct IBMPowerVSMachineTemplateSpec {
    /// Machine template body
    pub template: IBMPowerVSMachineTemplateResource,
}

/// Template wrapper around the machine spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct IBMPowerVSMachineTemplateResource {
    /// Machine spec stamped into every IBMPowerVSMachine
    pub spec: IBMPowerVSMachineSpec,
}

/// PowerVS instance settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IBMPowerVSMachineSpec {
    /// Workspace the instance runs in
    #[serde(rename = "serviceInstanceID")]
    pub service_instance_id: String,

    /// Explicit boot image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PowerVSResourceReference>,

    /// Boot image imported through an IBMPowerVSImage object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<LocalObjectReference>,

    /// Network the instance attaches to
    #[serde(default)]
    pub network: PowerVSResourceReference,

    /// Machine type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sys_type: String,

    /// Processor allocation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proc_type: String,

    /// Processor count
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub processors: String,

    /// Memory in GiB
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

/// Reference to an object in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Object name
    pub name: String,
}

/// Spec of an IBMPowerVSImage
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "IBMPowerVSImage",
    plural = "ibmpowervsimages",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct IBMPowerVSImageSpec {
    /// Cluster the image belongs to
    pub cluster_name: String,

    /// Workspace the image is imported into
    #[serde(rename = "serviceInstanceID")]
    pub service_instance_id: String,

    /// Bucket holding the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Object key of the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Object-store region of the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Storage tier of the imported image
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_type: String,

    /// Fate of the image when the object is deleted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delete_policy: String,
}
