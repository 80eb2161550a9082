//! IBM Cloud PowerVS machine templates (CAPIBM)
//!
//! RHCOS boot images for PowerVS live in IBM Cloud Object Storage and must be
//! imported into the workspace before machines can boot from them. The
//! builder therefore produces two objects: the machine template, which refers
//! to the boot image by name, and an `IBMPowerVSImage` that performs the
//! import.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tracing::debug;

use crate::api::powervs::{
    IBMPowerVSImage, IBMPowerVSImageSpec, IBMPowerVSMachineSpec,
    IBMPowerVSMachineTemplateResource, IBMPowerVSMachineTemplateSpec, LocalObjectReference,
};
use crate::constants::POWERVS_DEFAULT_IMAGE_REGION;
use nodepool_common::crd::{HostedCluster, NodePool, PowerVSNodePoolPlatform, PowerVSPlatformSpec};
use nodepool_common::release::{CoreOSPowerVSImage, ReleaseImage, PPC64LE_ARCH};
use nodepool_common::{Error, Result, CLUSTER_NAME_LABEL};

/// Object-store region holding the boot images for a PowerVS region
pub fn image_region(region: &str) -> &'static str {
    match region {
        "dal" | "us-south" => "us-south",
        "eu-de" => "eu-de",
        "lon" => "eu-gb",
        "osa" => "jp-osa",
        "syd" => "au-syd",
        "sao" => "br-sao",
        "tor" => "ca-tor",
        "tok" => "jp-tok",
        "us-east" => "us-east",
        _ => POWERVS_DEFAULT_IMAGE_REGION,
    }
}

/// Boot image for a PowerVS region, with the object-store region it lives in
pub fn powervs_boot_image<'a>(
    release_image: &'a ReleaseImage,
    region: &str,
) -> Result<(&'a CoreOSPowerVSImage, String)> {
    let arch = release_image.architecture(PPC64LE_ARCH, PPC64LE_ARCH)?;
    let mapped = image_region(region);
    let image = arch.images.powervs.regions.get(mapped).ok_or_else(|| {
        Error::not_found_kind(
            "region",
            format!("couldn't find PowerVS image for region {mapped:?}"),
        )
    })?;
    Ok((image, mapped.to_string()))
}

fn cluster_platform(hosted_cluster: &HostedCluster) -> Result<&PowerVSPlatformSpec> {
    hosted_cluster.spec.platform.powervs.as_ref().ok_or_else(|| {
        Error::invalid_input_for_field(
            "spec.platform.powervs",
            "HostedCluster has no PowerVS platform configuration",
        )
    })
}

fn pool_platform(node_pool: &NodePool) -> Result<&PowerVSNodePoolPlatform> {
    node_pool.spec.platform.powervs.as_ref().ok_or_else(|| {
        Error::invalid_input_for_field(
            "spec.platform.powervs",
            "NodePool has no PowerVS platform configuration",
        )
    })
}

/// Build the IBMPowerVSMachineTemplate spec for a NodePool
///
/// The release image is only consulted when the pool does not name its own
/// boot image.
pub fn powervs_machine_template_spec(
    hosted_cluster: &HostedCluster,
    node_pool: &NodePool,
    release_image: &ReleaseImage,
) -> Result<IBMPowerVSMachineTemplateSpec> {
    let cluster = cluster_platform(hosted_cluster)?;
    let platform = pool_platform(node_pool)?;

    let (image, image_ref) = match &platform.image {
        Some(image) => (Some(image.clone()), None),
        None => {
            let (boot_image, _) = powervs_boot_image(release_image, &cluster.region)?;
            debug!(
                pool = %node_pool.name_or_empty(),
                image = %boot_image.release,
                "using release boot image for PowerVS machines"
            );
            (
                None,
                Some(LocalObjectReference {
                    name: boot_image.release.clone(),
                }),
            )
        }
    };

    let processors = match &platform.processors {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    };

    Ok(IBMPowerVSMachineTemplateSpec {
        template: IBMPowerVSMachineTemplateResource {
            spec: IBMPowerVSMachineSpec {
                service_instance_id: cluster.service_instance_id.clone(),
                image,
                image_ref,
                network: cluster.subnet.clone(),
                sys_type: platform.system_type.clone(),
                proc_type: platform.processor_type.to_string(),
                processors,
                memory: platform.memory_gib.to_string(),
            },
        },
    })
}

/// Build the IBMPowerVSImage that imports a boot image into the workspace
///
/// `region` is the object-store region returned by [`powervs_boot_image`].
pub fn powervs_image(
    name: &str,
    namespace: &str,
    hosted_cluster: &HostedCluster,
    node_pool: &NodePool,
    infra_id: &str,
    region: &str,
    image: &CoreOSPowerVSImage,
) -> Result<IBMPowerVSImage> {
    let cluster = cluster_platform(hosted_cluster)?;
    let platform = pool_platform(node_pool)?;

    let mut object = IBMPowerVSImage::new(
        name,
        IBMPowerVSImageSpec {
            cluster_name: infra_id.to_string(),
            service_instance_id: cluster.service_instance_id.clone(),
            bucket: Some(image.bucket.clone()),
            object: Some(image.object.clone()),
            region: Some(region.to_string()),
            storage_type: platform.storage_type.clone(),
            delete_policy: platform.image_delete_policy.to_string(),
        },
    );
    object.metadata.namespace = Some(namespace.to_string());
    object.metadata.annotations = Some(BTreeMap::from([(
        CLUSTER_NAME_LABEL.to_string(),
        infra_id.to_string(),
    )]));
    Ok(object)
}
