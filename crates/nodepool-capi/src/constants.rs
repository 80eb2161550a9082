//! Centralized constants for the nodepool-capi crate
//!
//! Well-known annotation keys, provider defaults and API versions shared by
//! the template builders and the scale-from-zero annotator.

use nodepool_common::release::ReleaseVersion;

// =============================================================================
// Infrastructure Provider API Versions
// =============================================================================

/// AWS infrastructure API version
pub const AWS_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta2";

/// Azure infrastructure API version
pub const AZURE_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta1";

/// IBM Cloud infrastructure API version (PowerVS machine templates and images)
pub const IBMCLOUD_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta1";

// =============================================================================
// AWS Defaults
// =============================================================================

/// Value of the cluster cloud-provider tag
pub const AWS_CLOUD_PROVIDER_TAG_VALUE: &str = "owned";

/// Root volume size in GiB when the pool sets none
pub const AWS_DEFAULT_ROOT_VOLUME_SIZE: i64 = 16;

/// Backend for the bootstrap secret fetched by cloud-init
pub const AWS_SECURE_SECRETS_BACKEND: &str = "secrets-manager";

/// IMDS hop limit; 2 lets pods reach the metadata service
pub const AWS_METADATA_HOP_LIMIT: i64 = 2;

/// Tenancy value that disables the capacity-block default
pub const AWS_TENANCY_HOST: &str = "host";

/// Build the cluster cloud-provider tag key for an infra name
pub fn aws_cloud_provider_tag_key(infra_name: &str) -> String {
    format!("kubernetes.io/cluster/{infra_name}")
}

/// Build the worker IAM instance profile name for an infra name
pub fn aws_worker_instance_profile(infra_name: &str) -> String {
    format!("{infra_name}-worker-profile")
}

// =============================================================================
// Azure Defaults
// =============================================================================

/// Managed identity type used when the pool names an identity
pub const AZURE_USER_ASSIGNED_IDENTITY: &str = "UserAssigned";

/// OS disk caching required by ephemeral disks
pub const AZURE_EPHEMERAL_CACHING_TYPE: &str = "ReadOnly";

/// Diff disk placement for ephemeral disks
pub const AZURE_EPHEMERAL_DIFF_DISK_OPTION: &str = "Local";

/// Value of `encryptionAtHost` that turns it on
pub const AZURE_ENCRYPTION_AT_HOST_ENABLED: &str = "Enabled";

/// Diagnostics storage type that carries a user storage account
pub const AZURE_USER_MANAGED_DIAGNOSTICS: &str = "UserManaged";

/// First release that publishes marketplace images in its stream metadata
///
/// Pre-release builds of this version sort below it and are not defaulted.
pub const AZURE_MARKETPLACE_MIN_VERSION: ReleaseVersion = ReleaseVersion::new(4, 20, 0);

/// RSA modulus size of generated SSH keys
pub const SSH_RSA_KEY_BITS: usize = 2048;

// =============================================================================
// PowerVS Defaults
// =============================================================================

/// Object-store region used for unknown PowerVS regions
pub const POWERVS_DEFAULT_IMAGE_REGION: &str = "us-south";

// =============================================================================
// Scale-from-zero Annotations
// =============================================================================

/// vCPU count of one machine
pub const CPU_ANNOTATION: &str = "machine.openshift.io/vCPU";

/// Memory of one machine in MiB
pub const MEMORY_ANNOTATION: &str = "machine.openshift.io/memoryMb";

/// GPU count of one machine
pub const GPU_ANNOTATION: &str = "machine.openshift.io/GPU";

/// Node labels the autoscaler assumes for a new machine
pub const LABELS_ANNOTATION: &str = "capacity.cluster-autoscaler.kubernetes.io/labels";

/// Node taints the autoscaler assumes for a new machine
pub const TAINTS_ANNOTATION: &str = "capacity.cluster-autoscaler.kubernetes.io/taints";

/// All scale-from-zero annotation keys
pub const SCALE_FROM_ZERO_ANNOTATIONS: [&str; 5] = [
    CPU_ANNOTATION,
    MEMORY_ANNOTATION,
    GPU_ANNOTATION,
    LABELS_ANNOTATION,
    TAINTS_ANNOTATION,
];

/// Node label carrying the CPU architecture
pub const ARCH_LABEL: &str = "kubernetes.io/arch";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_names_derive_from_infra_name() {
        assert_eq!(aws_cloud_provider_tag_key("test"), "kubernetes.io/cluster/test");
        assert_eq!(aws_worker_instance_profile("test"), "test-worker-profile");
    }

    #[test]
    fn scale_from_zero_keys_are_distinct() {
        let keys: std::collections::BTreeSet<_> = SCALE_FROM_ZERO_ANNOTATIONS.iter().collect();
        assert_eq!(keys.len(), SCALE_FROM_ZERO_ANNOTATIONS.len());
    }
}
