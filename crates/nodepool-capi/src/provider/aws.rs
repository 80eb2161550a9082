//! AWS machine templates (CAPA)
//!
//! Combines the HostedCluster's AWS settings with a NodePool's AWS block into
//! an `AWSMachineTemplateSpec`. Worker security groups, tags and the IAM
//! profile all derive from the cluster's infra name.

use tracing::debug;

use super::merge_resource_tags;
use crate::api::aws::{
    AMIReference, AWSMachineSpec, AWSMachineTemplateResource, AWSMachineTemplateSpec, CloudInit,
    HttpTokensState, InstanceMetadataOptions, InstanceMetadataState, MarketType,
    SpotMarketOptions, Volume,
};
use crate::constants::{
    aws_worker_instance_profile, AWS_DEFAULT_ROOT_VOLUME_SIZE, AWS_METADATA_HOP_LIMIT,
    AWS_SECURE_SECRETS_BACKEND, AWS_TENANCY_HOST,
};
use nodepool_common::crd::{
    AwsNodePoolPlatform, AwsResourceReference, HostedCluster, MarketType as PoolMarketType,
    NodePool, PlacementOptions,
};
use nodepool_common::release::ReleaseImage;
use nodepool_common::{
    Error, Result, AWS_MACHINE_PUBLIC_IPS_ANNOTATION, EC2_INSTANCE_METADATA_HTTP_TOKENS_ANNOTATION,
};

/// Message of the error returned while the worker security group is missing
pub const DEFAULT_SECURITY_GROUP_NOT_READY: &str =
    "the default security group for the HostedCluster has not been created";

const SPOT_PLACEMENT_CONFLICT: &str = "spotMarketOptions is incompatible with capacityReservation and requires tenancy to be 'default' or unset (not 'dedicated' or 'host')";

fn aws_platform(node_pool: &NodePool) -> Result<&AwsNodePoolPlatform> {
    node_pool.spec.platform.aws.as_ref().ok_or_else(|| {
        Error::invalid_input_for_field(
            "spec.platform.aws",
            "NodePool has no AWS platform configuration",
        )
    })
}

/// Build the AWSMachineTemplate spec for a NodePool
///
/// The AMI comes from the NodePool; when the pool leaves it empty it is
/// resolved from the release image for the cluster region and the pool
/// architecture. Fails with `NotReady` when the machine would end up with no
/// security group at all.
pub fn aws_machine_template_spec(
    infra_name: &str,
    hosted_cluster: &HostedCluster,
    node_pool: &NodePool,
    user_data_compressed: bool,
    release_image: &ReleaseImage,
) -> Result<AWSMachineTemplateSpec> {
    let platform = aws_platform(node_pool)?;
    let cluster_platform = hosted_cluster.spec.platform.aws.as_ref();

    let ami = if platform.ami.is_empty() {
        let region = cluster_platform.map(|p| p.region.as_str()).unwrap_or_default();
        let ami = release_image
            .aws_ami(region, &node_pool.spec.arch)
            .map_err(|e| {
                Error::not_found_kind(
                    "ami",
                    format!("couldn't discover an AMI for release image: {e}"),
                )
            })?;
        debug!(
            pool = %node_pool.name_or_empty(),
            region = %region,
            ami = %ami,
            "resolved AMI from release image"
        );
        ami
    } else {
        platform.ami.clone()
    };

    let mut security_groups = platform.security_groups.clone();
    let default_sg = hosted_cluster.default_worker_security_group_id();
    if !default_sg.is_empty() {
        security_groups.push(AwsResourceReference::by_id(default_sg));
    }
    if security_groups.is_empty() {
        return Err(Error::not_ready(DEFAULT_SECURITY_GROUP_NOT_READY));
    }

    let cluster_tags = cluster_platform
        .map(|p| p.resource_tags.as_slice())
        .unwrap_or_default();

    let mut spec = AWSMachineSpec {
        ami: AMIReference { id: Some(ami) },
        instance_type: platform.instance_type.clone(),
        iam_instance_profile: aws_worker_instance_profile(infra_name),
        additional_tags: merge_resource_tags(infra_name, &platform.resource_tags, cluster_tags),
        additional_security_groups: security_groups,
        subnet: Some(platform.subnet.clone()),
        uncompressed_user_data: Some(!user_data_compressed),
        cloud_init: CloudInit {
            insecure_skip_secrets_manager: true,
            secure_secrets_backend: AWS_SECURE_SECRETS_BACKEND.to_string(),
        },
        root_volume: Some(root_volume(platform)),
        instance_metadata_options: Some(instance_metadata_options(node_pool)),
        ..Default::default()
    };

    if let Some(placement) = &platform.placement {
        apply_placement(&mut spec, placement);
    }

    if hosted_cluster.annotation(AWS_MACHINE_PUBLIC_IPS_ANNOTATION) == Some("true") {
        spec.public_ip = Some(true);
    }

    Ok(AWSMachineTemplateSpec {
        template: AWSMachineTemplateResource { spec },
    })
}

fn root_volume(platform: &AwsNodePoolPlatform) -> Volume {
    let Some(volume) = &platform.root_volume else {
        return Volume {
            size: AWS_DEFAULT_ROOT_VOLUME_SIZE,
            ..Default::default()
        };
    };
    Volume {
        size: if volume.size > 0 {
            volume.size
        } else {
            AWS_DEFAULT_ROOT_VOLUME_SIZE
        },
        type_: volume.type_.clone(),
        iops: (volume.iops > 0).then_some(volume.iops),
        encrypted: volume.encrypted,
        encryption_key: volume.encryption_key.clone(),
    }
}

fn instance_metadata_options(node_pool: &NodePool) -> InstanceMetadataOptions {
    let http_tokens = match node_pool.annotation(EC2_INSTANCE_METADATA_HTTP_TOKENS_ANNOTATION) {
        Some("required") => HttpTokensState::Required,
        _ => HttpTokensState::Optional,
    };
    InstanceMetadataOptions {
        http_endpoint: InstanceMetadataState::Enabled,
        http_put_response_hop_limit: AWS_METADATA_HOP_LIMIT,
        http_tokens,
        instance_metadata_tags: InstanceMetadataState::Disabled,
    }
}

fn apply_placement(spec: &mut AWSMachineSpec, placement: &PlacementOptions) {
    spec.tenancy = placement.tenancy.clone();

    if let Some(reservation) = &placement.capacity_reservation {
        spec.capacity_reservation_id = reservation.id.clone();
        spec.market_type = match reservation.market_type {
            Some(PoolMarketType::CapacityBlock) => Some(MarketType::CapacityBlock),
            Some(PoolMarketType::OnDemand) => Some(MarketType::OnDemand),
            None if placement.tenancy != AWS_TENANCY_HOST && reservation.id.is_some() => {
                Some(MarketType::CapacityBlock)
            }
            None => None,
        };
        spec.capacity_reservation_preference = reservation.preference.clone();
    }

    if let Some(spot) = &placement.spot_market_options {
        spec.spot_market_options = Some(SpotMarketOptions {
            max_price: spot.max_price.clone(),
        });
        spec.market_type = Some(MarketType::Spot);
    }
}

/// Reject placement combinations EC2 refuses
///
/// Spot instances cannot launch into a capacity reservation and need the
/// default tenancy. The builder does not call this; reconcilers run it
/// before building so the error surfaces as a condition.
pub fn validate_aws_platform(node_pool: &NodePool) -> Result<()> {
    let platform = aws_platform(node_pool)?;
    let Some(placement) = &platform.placement else {
        return Ok(());
    };
    if placement.spot_market_options.is_none() {
        return Ok(());
    }
    let tenancy_ok = placement.tenancy.is_empty() || placement.tenancy == "default";
    if !tenancy_ok || placement.capacity_reservation.is_some() {
        return Err(Error::invalid_input_for_field(
            "spec.platform.aws.placement",
            SPOT_PLACEMENT_CONFLICT,
        ));
    }
    Ok(())
}
