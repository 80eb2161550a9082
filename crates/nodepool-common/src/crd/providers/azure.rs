//! Azure platform configuration (CAPZ)
//!
//! Reference: <https://github.com/kubernetes-sigs/cluster-api-provider-azure>

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Azure settings of a HostedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzurePlatformSpec {
    /// Subscription the cluster's resources live in
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,

    /// Resource group holding the cluster's resources
    pub resource_group: String,

    /// Azure location (e.g., "eastus")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Default subnet for worker machines
    #[serde(default, rename = "subnetID", skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,

    /// Managed identity attached to worker machines
    #[serde(default, rename = "machineIdentityID", skip_serializing_if = "String::is_empty")]
    pub machine_identity_id: String,
}

/// Which image source a pool boots from
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AzureVmImageType {
    /// A managed image or gallery image referenced by resource id
    #[serde(rename = "ImageID")]
    #[default]
    ImageId,
    /// An Azure Marketplace image
    AzureMarketplace,
}

/// Hyper-V generation of a marketplace image
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum HyperVGeneration {
    /// Generation 1
    #[serde(rename = "V1")]
    Gen1,
    /// Generation 2
    #[serde(rename = "V2")]
    #[default]
    Gen2,
}

/// Azure Marketplace image coordinates
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureMarketplaceImage {
    /// Image publisher
    #[serde(default)]
    pub publisher: String,
    /// Image offer
    #[serde(default)]
    pub offer: String,
    /// Image SKU
    #[serde(default, rename = "sku")]
    pub sku: String,
    /// Image version
    #[serde(default)]
    pub version: String,
    /// Hyper-V generation used when defaulting from the release image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_generation: Option<HyperVGeneration>,
}

impl AzureMarketplaceImage {
    /// True when publisher, offer, SKU and version are all set
    pub fn is_complete(&self) -> bool {
        !self.publisher.is_empty()
            && !self.offer.is_empty()
            && !self.sku.is_empty()
            && !self.version.is_empty()
    }
}

/// Boot image of an Azure pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureVmImage {
    /// Discriminator selecting `image_id` or `azure_marketplace`
    #[serde(rename = "type")]
    pub type_: AzureVmImageType,

    /// Image resource id
    #[serde(default, rename = "imageID", skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// Marketplace image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_marketplace: Option<AzureMarketplaceImage>,
}

/// OS disk persistence
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DiskPersistence {
    /// Managed disk that survives reboots and redeploys
    #[default]
    Persistent,
    /// Ephemeral disk on the host's local storage
    Ephemeral,
}

/// OS disk of an Azure pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureNodePoolOsDisk {
    /// Size in GiB
    #[serde(default, rename = "sizeGiB")]
    pub size_gib: i32,

    /// Storage account type (e.g., "Premium_LRS")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub disk_storage_account_type: String,

    /// Disk encryption set resource id
    #[serde(default, rename = "encryptionSetID", skip_serializing_if = "String::is_empty")]
    pub encryption_set_id: String,

    /// Persistence of the disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<DiskPersistence>,
}

/// Boot diagnostics of an Azure pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// "Disabled", "Managed" or "UserManaged"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_account_type: String,

    /// Storage account used when the type is "UserManaged"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_managed: Option<UserManagedDiagnostics>,
}

/// User-provided boot diagnostics storage account
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserManagedDiagnostics {
    /// Storage account URI
    #[serde(rename = "storageAccountURI")]
    pub storage_account_uri: String,
}

/// Azure settings of a NodePool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureNodePoolPlatform {
    /// VM size (e.g., "Standard_D4s_v3")
    pub vm_size: String,

    /// Boot image
    pub image: AzureVmImage,

    /// OS disk
    #[serde(default)]
    pub os_disk: AzureNodePoolOsDisk,

    /// Availability zone used as the machine failure domain
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,

    /// "Enabled" turns on encryption at host
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encryption_at_host: String,

    /// Subnet resource id
    #[serde(rename = "subnetID")]
    pub subnet_id: String,

    /// Boot diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,

    /// User-assigned managed identity attached to the machines
    #[serde(default, rename = "machineIdentityID", skip_serializing_if = "String::is_empty")]
    pub machine_identity_id: String,
}
