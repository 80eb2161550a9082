//! CAPZ `AzureMachineTemplate` (infrastructure.cluster.x-k8s.io/v1beta1)

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of an AzureMachineTemplate
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "AzureMachineTemplate",
    plural = "azuremachinetemplates",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineTemplateSpec {
    /// Machine template body
    pub template: AzureMachineTemplateResource,
}

/// Template wrapper around the machine spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AzureMachineTemplateResource {
    /// Machine spec stamped into every AzureMachine
    pub spec: AzureMachineSpec,
}

/// Azure VM settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineSpec {
    /// VM size
    #[serde(rename = "vmSize")]
    pub vm_size: String,

    /// Availability zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<String>,

    /// Boot image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    /// Managed identity type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// User-assigned identities attached to the VM
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_assigned_identities: Vec<UserAssignedIdentity>,

    /// OS disk
    #[serde(rename = "osDisk")]
    pub os_disk: OSDisk,

    /// Base64 encoded OpenSSH public key
    #[serde(default, rename = "sshPublicKey")]
    pub ssh_public_key: String,

    /// Network interfaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,

    /// Host security settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_profile: Option<SecurityProfile>,

    /// Boot diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// Boot image reference; exactly one field is set
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Image {
    /// Image resource id
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Marketplace image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<AzureMarketplaceImage>,
}

/// Marketplace image reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureMarketplaceImage {
    /// Publisher
    pub publisher: String,
    /// Offer
    pub offer: String,
    /// SKU
    #[serde(rename = "sku")]
    pub sku: String,
    /// Version
    pub version: String,
    /// Whether the image needs a purchase plan
    #[serde(default)]
    pub third_party_image: bool,
}

/// User-assigned identity
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct UserAssignedIdentity {
    /// Identity resource id
    #[serde(rename = "providerID")]
    pub provider_id: String,
}

/// OS disk settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OSDisk {
    /// Disk size in GB
    #[serde(default, rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,

    /// Managed disk settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,

    /// Disk caching
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caching_type: String,

    /// Ephemeral disk placement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_disk_settings: Option<DiffDiskSettings>,
}

/// Managed disk settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    /// Storage account type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_account_type: String,

    /// Customer-managed key for the disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_set: Option<DiskEncryptionSetParameters>,
}

/// Disk encryption set reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct DiskEncryptionSetParameters {
    /// Encryption set resource id
    pub id: String,
}

/// Ephemeral OS disk placement
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct DiffDiskSettings {
    /// Placement, "Local"
    pub option: String,
}

/// Network interface
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Subnet name within the cluster virtual network
    pub subnet_name: String,
}

/// Host security settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    /// Encrypt temp disks and caches at the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_host: Option<bool>,
}

/// Diagnostics settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Diagnostics {
    /// Boot diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot: Option<BootDiagnostics>,
}

/// Boot diagnostics settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootDiagnostics {
    /// "Disabled", "Managed" or "UserManaged"
    pub storage_account_type: String,

    /// User storage account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_managed: Option<UserManagedBootDiagnostics>,
}

/// User storage account for boot diagnostics
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct UserManagedBootDiagnostics {
    /// Storage account URI
    #[serde(rename = "storageAccountURI")]
    pub storage_account_uri: String,
}
