//! Machine-template builders
//!
//! One builder per infrastructure provider turns a NodePool (and its parent
//! HostedCluster) into the spec of the CAPI machine template its machines are
//! stamped from. Builders are pure functions; the caller persists the result
//! under the name returned by [`template_name`].
//!
//! # Supported Providers
//!
//! - AWS ([`aws_machine_template_spec`])
//! - Azure ([`azure_machine_template_spec`])
//! - IBM Cloud PowerVS ([`powervs_machine_template_spec`])

mod aws;
mod azure;
mod powervs;

pub use aws::{aws_machine_template_spec, validate_aws_platform, DEFAULT_SECURITY_GROUP_NOT_READY};
pub use azure::{
    azure_machine_template_spec, azure_machine_template_spec_with_rng, boot_image_gallery_id,
    default_marketplace_image, IMAGE_REQUIRED,
};
pub use powervs::{image_region, powervs_boot_image, powervs_image, powervs_machine_template_spec};

use std::collections::BTreeMap;
use std::fmt::Write;

use aws_lc_rs::digest::{digest, SHA256};
use serde::Serialize;
use tracing::debug;

use crate::api::{AWSMachineTemplateSpec, AzureMachineTemplateSpec, IBMPowerVSMachineTemplateSpec};
use crate::constants::{
    aws_cloud_provider_tag_key, AWS_API_VERSION, AWS_CLOUD_PROVIDER_TAG_VALUE, AZURE_API_VERSION,
    IBMCLOUD_API_VERSION,
};
use nodepool_common::crd::{AzureVmImageType, HostedCluster, NodePool, PlatformType, ResourceTag};
use nodepool_common::release::ReleaseImage;
use nodepool_common::{Error, Result};

/// Number of hex characters of the spec hash used in template names
const TEMPLATE_HASH_LEN: usize = 8;

// =============================================================================
// Provider Dispatch
// =============================================================================

/// A machine template spec for one of the supported providers
#[derive(Clone, Debug, PartialEq)]
pub enum MachineTemplateSpec {
    /// CAPA AWSMachineTemplate
    Aws(AWSMachineTemplateSpec),
    /// CAPZ AzureMachineTemplate
    Azure(AzureMachineTemplateSpec),
    /// CAPIBM IBMPowerVSMachineTemplate
    PowerVS(IBMPowerVSMachineTemplateSpec),
}

impl MachineTemplateSpec {
    /// Kind of the template resource
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Aws(_) => "AWSMachineTemplate",
            Self::Azure(_) => "AzureMachineTemplate",
            Self::PowerVS(_) => "IBMPowerVSMachineTemplate",
        }
    }

    /// API version of the template resource
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Aws(_) => AWS_API_VERSION,
            Self::Azure(_) => AZURE_API_VERSION,
            Self::PowerVS(_) => IBMCLOUD_API_VERSION,
        }
    }
}

/// Everything a builder may read
#[derive(Clone, Copy, Debug)]
pub struct TemplateInputs<'a> {
    /// Parent cluster
    pub hosted_cluster: &'a HostedCluster,
    /// Pool the template is built for
    pub node_pool: &'a NodePool,
    /// Release the pool runs
    pub release_image: &'a ReleaseImage,
    /// Infra name used for AWS tags and IAM names
    pub infra_name: &'a str,
    /// Whether the ignition user data is compressed (AWS)
    pub user_data_compressed: bool,
    /// SSH key of the template currently in use (Azure)
    pub existing_ssh_key: Option<&'a str>,
}

/// Build the machine template spec for a NodePool's platform
///
/// Azure pools that select no image get the release's marketplace image
/// before the builder runs; the NodePool itself is left untouched.
pub fn machine_template_spec(inputs: &TemplateInputs<'_>) -> Result<MachineTemplateSpec> {
    let pool_platform = inputs.node_pool.spec.platform.type_;
    let cluster_platform = inputs.hosted_cluster.spec.platform.type_;
    if pool_platform != cluster_platform {
        return Err(Error::invalid_input_for_field(
            "spec.platform.type",
            format!(
                "NodePool platform {pool_platform} does not match HostedCluster platform {cluster_platform}"
            ),
        ));
    }

    debug!(
        pool = %inputs.node_pool.name_or_empty(),
        platform = %pool_platform,
        "building machine template spec"
    );

    match pool_platform {
        PlatformType::Aws => aws_machine_template_spec(
            inputs.infra_name,
            inputs.hosted_cluster,
            inputs.node_pool,
            inputs.user_data_compressed,
            inputs.release_image,
        )
        .map(MachineTemplateSpec::Aws),
        PlatformType::Azure => {
            let defaulted = with_default_marketplace_image(inputs.node_pool, inputs.release_image)?;
            let node_pool = defaulted.as_ref().unwrap_or(inputs.node_pool);
            azure_machine_template_spec(node_pool, inputs.existing_ssh_key)
                .map(MachineTemplateSpec::Azure)
        }
        PlatformType::PowerVS => powervs_machine_template_spec(
            inputs.hosted_cluster,
            inputs.node_pool,
            inputs.release_image,
        )
        .map(MachineTemplateSpec::PowerVS),
        other @ (PlatformType::KubeVirt
        | PlatformType::OpenStack
        | PlatformType::Agent
        | PlatformType::None) => Err(Error::invalid_input_for_field(
            "spec.platform.type",
            format!("no machine template builder for platform {other}"),
        )),
    }
}

/// Copy of the pool with the release marketplace image filled in, if one applies
fn with_default_marketplace_image(
    node_pool: &NodePool,
    release_image: &ReleaseImage,
) -> Result<Option<NodePool>> {
    let Some(mut image) = default_marketplace_image(node_pool, release_image)? else {
        return Ok(None);
    };
    let mut defaulted = node_pool.clone();
    if let Some(azure) = defaulted.spec.platform.azure.as_mut() {
        image.image_generation = azure
            .image
            .azure_marketplace
            .as_ref()
            .and_then(|m| m.image_generation);
        azure.image.type_ = AzureVmImageType::AzureMarketplace;
        azure.image.azure_marketplace = Some(image);
    }
    Ok(Some(defaulted))
}

// =============================================================================
// Template Naming
// =============================================================================

/// Name of the template resource for a spec
///
/// `<pool>-<hash>` where the hash covers the serialized spec, so any change
/// to the spec produces a new template and rolls the pool's machines.
pub fn template_name(pool_name: &str, spec: &MachineTemplateSpec) -> Result<String> {
    match spec {
        MachineTemplateSpec::Aws(aws) => aws_template_name(pool_name, aws),
        MachineTemplateSpec::Azure(azure) => hashed_name(pool_name, azure),
        MachineTemplateSpec::PowerVS(powervs) => hashed_name(pool_name, powervs),
    }
}

/// Name of an AWSMachineTemplate
///
/// Tags are applied to running instances in place, so they are left out of
/// the hash.
pub fn aws_template_name(pool_name: &str, spec: &AWSMachineTemplateSpec) -> Result<String> {
    let mut untagged = spec.clone();
    untagged.template.spec.additional_tags.clear();
    hashed_name(pool_name, &untagged)
}

fn hashed_name<T: Serialize>(pool_name: &str, spec: &T) -> Result<String> {
    let json = serde_json::to_string(spec)?;
    let hash = digest(&SHA256, json.as_bytes());
    let suffix = hash.as_ref()[..TEMPLATE_HASH_LEN / 2]
        .iter()
        .fold(String::with_capacity(TEMPLATE_HASH_LEN), |mut s, b| {
            let _ = write!(s, "{:02x}", b);
            s
        });
    Ok(format!("{pool_name}-{suffix}"))
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Merge cluster and pool tags into the tag set of a machine
///
/// Starts from the cloud-provider ownership tag, then applies pool tags and
/// finally cluster tags, so the cluster wins on conflicts.
pub fn merge_resource_tags(
    infra_name: &str,
    pool_tags: &[ResourceTag],
    cluster_tags: &[ResourceTag],
) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::from([(
        aws_cloud_provider_tag_key(infra_name),
        AWS_CLOUD_PROVIDER_TAG_VALUE.to_string(),
    )]);
    for tag in pool_tags.iter().chain(cluster_tags) {
        tags.insert(tag.key.clone(), tag.value.clone());
    }
    tags
}

/// Failure domain for an availability zone; empty means none
pub fn failure_domain(zone: &str) -> Option<String> {
    (!zone.is_empty()).then(|| zone.to_string())
}

/// Subnet name of an Azure subnet resource id
///
/// The name is whatever follows the last `/subnets/` segment (matched case
/// insensitively) and must be a single non-empty path segment. Ids with
/// anything after the subnet name, such as a trailing `/` or a child
/// resource, are rejected the same way ARM resource id parsing rejects them.
pub fn subnet_name_from_id(subnet_id: &str) -> Result<&str> {
    const SEGMENT: &str = "/subnets/";
    let invalid = || Error::invalid_input(format!("failed to parse subnet name from {subnet_id:?}"));

    let start = subnet_id
        .to_ascii_lowercase()
        .rfind(SEGMENT)
        .map(|i| i + SEGMENT.len())
        .ok_or_else(invalid)?;
    let name = &subnet_id[start..];
    if name.is_empty() || name.contains('/') {
        return Err(invalid());
    }
    Ok(name)
}
