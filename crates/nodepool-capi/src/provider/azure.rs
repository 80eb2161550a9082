//! Azure machine templates (CAPZ)
//!
//! Translates a NodePool's Azure block into an `AzureMachineTemplateSpec`.
//! Unlike AWS, everything the machine needs lives on the NodePool; the
//! HostedCluster is only consulted by the image-gallery helper.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::{failure_domain, subnet_name_from_id};
use crate::api::azure::{
    AzureMachineSpec, AzureMachineTemplateResource, AzureMachineTemplateSpec, BootDiagnostics,
    Diagnostics, DiffDiskSettings, DiskEncryptionSetParameters, Image, ManagedDiskParameters,
    NetworkInterface, OSDisk, SecurityProfile, UserAssignedIdentity, UserManagedBootDiagnostics,
};
use crate::api::azure::AzureMarketplaceImage as MarketplaceImageRef;
use crate::constants::{
    AZURE_ENCRYPTION_AT_HOST_ENABLED, AZURE_EPHEMERAL_CACHING_TYPE,
    AZURE_EPHEMERAL_DIFF_DISK_OPTION, AZURE_MARKETPLACE_MIN_VERSION,
    AZURE_USER_ASSIGNED_IDENTITY, AZURE_USER_MANAGED_DIAGNOSTICS,
};
use crate::ssh::generate_ssh_public_key;
use nodepool_common::crd::{
    AzureMarketplaceImage, AzureNodePoolPlatform, AzureVmImageType, DiskPersistence,
    HostedCluster, HyperVGeneration, NodePool,
};
use nodepool_common::release::{stream_arch, ReleaseImage};
use nodepool_common::{Error, Result};

/// Returned when the selected image source is missing
pub const IMAGE_REQUIRED: &str =
    "either ImageID or AzureMarketplace needs to be provided for the Azure machine";

fn azure_platform(node_pool: &NodePool) -> Result<&AzureNodePoolPlatform> {
    node_pool.spec.platform.azure.as_ref().ok_or_else(|| {
        Error::invalid_input_for_field(
            "spec.platform.azure",
            "NodePool has no Azure platform configuration",
        )
    })
}

/// Build the AzureMachineTemplate spec for a NodePool
///
/// `existing_ssh_key` is the key of the template currently in use; when it is
/// empty a fresh key is generated from the OS CSPRNG.
pub fn azure_machine_template_spec(
    node_pool: &NodePool,
    existing_ssh_key: Option<&str>,
) -> Result<AzureMachineTemplateSpec> {
    azure_machine_template_spec_with_rng(node_pool, existing_ssh_key, &mut OsRng)
}

/// Build the AzureMachineTemplate spec with an explicit entropy source
pub fn azure_machine_template_spec_with_rng<R: RngCore + CryptoRng>(
    node_pool: &NodePool,
    existing_ssh_key: Option<&str>,
    rng: &mut R,
) -> Result<AzureMachineTemplateSpec> {
    let platform = azure_platform(node_pool)?;

    let subnet_name = subnet_name_from_id(&platform.subnet_id).map_err(|e| {
        Error::invalid_input_for_field(
            "spec.platform.azure.subnetID",
            format!("failed to determine subnet name for Azure machine: {e}"),
        )
    })?;

    let image = boot_image(platform)?;

    let mut os_disk = OSDisk {
        disk_size_gb: Some(platform.os_disk.size_gib),
        managed_disk: Some(ManagedDiskParameters {
            storage_account_type: platform.os_disk.disk_storage_account_type.clone(),
            disk_encryption_set: (!platform.os_disk.encryption_set_id.is_empty()).then(|| {
                DiskEncryptionSetParameters {
                    id: platform.os_disk.encryption_set_id.clone(),
                }
            }),
        }),
        ..Default::default()
    };
    // Ephemeral OS disks only support read-only caching
    if platform.os_disk.persistence == Some(DiskPersistence::Ephemeral) {
        os_disk.caching_type = AZURE_EPHEMERAL_CACHING_TYPE.to_string();
        os_disk.diff_disk_settings = Some(DiffDiskSettings {
            option: AZURE_EPHEMERAL_DIFF_DISK_OPTION.to_string(),
        });
    }

    let mut spec = AzureMachineSpec {
        vm_size: platform.vm_size.clone(),
        failure_domain: failure_domain(&platform.availability_zone),
        image: Some(image),
        os_disk,
        network_interfaces: vec![NetworkInterface {
            subnet_name: subnet_name.to_string(),
        }],
        ..Default::default()
    };

    if !platform.machine_identity_id.is_empty() {
        spec.identity = Some(AZURE_USER_ASSIGNED_IDENTITY.to_string());
        spec.user_assigned_identities = vec![UserAssignedIdentity {
            provider_id: platform.machine_identity_id.clone(),
        }];
    }

    if platform.encryption_at_host == AZURE_ENCRYPTION_AT_HOST_ENABLED {
        spec.security_profile = Some(SecurityProfile {
            encryption_at_host: Some(true),
        });
    }

    if let Some(diagnostics) = platform
        .diagnostics
        .as_ref()
        .filter(|d| !d.storage_account_type.is_empty())
    {
        let user_managed = (diagnostics.storage_account_type == AZURE_USER_MANAGED_DIAGNOSTICS)
            .then(|| UserManagedBootDiagnostics {
                storage_account_uri: diagnostics
                    .user_managed
                    .as_ref()
                    .map(|u| u.storage_account_uri.clone())
                    .unwrap_or_default(),
            });
        spec.diagnostics = Some(Diagnostics {
            boot: Some(BootDiagnostics {
                storage_account_type: diagnostics.storage_account_type.clone(),
                user_managed,
            }),
        });
    }

    spec.ssh_public_key = match existing_ssh_key.filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => {
            debug!(pool = %node_pool.name_or_empty(), "generating ssh key for Azure machine template");
            generate_ssh_public_key(rng)?
        }
    };

    Ok(AzureMachineTemplateSpec {
        template: AzureMachineTemplateResource { spec },
    })
}

fn boot_image(platform: &AzureNodePoolPlatform) -> Result<Image> {
    let image = match platform.image.type_ {
        AzureVmImageType::ImageId => platform
            .image
            .image_id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| Image {
                id: Some(id.clone()),
                marketplace: None,
            }),
        AzureVmImageType::AzureMarketplace => {
            platform.image.azure_marketplace.as_ref().map(|m| Image {
                id: None,
                marketplace: Some(MarketplaceImageRef {
                    publisher: m.publisher.clone(),
                    offer: m.offer.clone(),
                    sku: m.sku.clone(),
                    version: m.version.clone(),
                    third_party_image: false,
                }),
            })
        }
    };
    image.ok_or_else(|| Error::invalid_input_for_field("spec.platform.azure.image", IMAGE_REQUIRED))
}

/// Marketplace image published by the release for a pool without an image
///
/// Returns `None` when the pool already names an image id or a complete
/// marketplace image, when the release predates marketplace publishing, or
/// when the release carries no marketplace metadata. The caller stores the
/// result on the pool with the image type switched to `AzureMarketplace`.
pub fn default_marketplace_image(
    node_pool: &NodePool,
    release_image: &ReleaseImage,
) -> Result<Option<AzureMarketplaceImage>> {
    let platform = azure_platform(node_pool)?;
    let image = &platform.image;

    if image.image_id.is_some() {
        return Ok(None);
    }
    if image
        .azure_marketplace
        .as_ref()
        .is_some_and(AzureMarketplaceImage::is_complete)
    {
        return Ok(None);
    }

    if release_image.semver()? < AZURE_MARKETPLACE_MIN_VERSION {
        return Ok(None);
    }

    let Some(metadata) = &release_image.stream_metadata else {
        return Ok(None);
    };
    let arch = stream_arch(&node_pool.spec.arch);
    let arch_data = metadata.architectures.get(arch).ok_or_else(|| {
        Error::not_found_kind(
            "architecture",
            format!(
                "failed to get Azure Marketplace metadata: architecture {arch} not found in stream metadata"
            ),
        )
    })?;

    let Some(offers) = arch_data
        .rhcos
        .marketplace
        .azure
        .no_purchase_plan
        .as_ref()
        .filter(|o| !o.is_empty())
    else {
        return Ok(None);
    };

    let generation = image
        .azure_marketplace
        .as_ref()
        .and_then(|m| m.image_generation)
        .unwrap_or_default();
    let (selected, label) = match generation {
        HyperVGeneration::Gen1 => (&offers.hyper_v_gen1, "Gen1"),
        HyperVGeneration::Gen2 => (&offers.hyper_v_gen2, "Gen2"),
    };
    let selected = selected.clone().ok_or_else(|| {
        Error::not_found_kind(
            "image",
            format!("no Azure Marketplace image available for {arch} generation {label}"),
        )
    })?;

    debug!(
        pool = %node_pool.name_or_empty(),
        arch = %arch,
        generation = %label,
        sku = %selected.sku,
        "defaulted Azure Marketplace image from release"
    );
    Ok(Some(selected))
}

/// Image id of the cluster's RHCOS image gallery
///
/// Clusters whose pools do not select an image boot from a gallery named
/// after the infra id, which is the last `-` separated segment of the
/// cluster's resource group.
pub fn boot_image_gallery_id(hosted_cluster: &HostedCluster) -> Result<String> {
    let azure = hosted_cluster.spec.platform.azure.as_ref().ok_or_else(|| {
        Error::invalid_input_for_field(
            "spec.platform.azure",
            "HostedCluster has no Azure platform configuration",
        )
    })?;
    let infra_id = azure
        .resource_group
        .rsplit('-')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::invalid_input_for_field(
                "spec.platform.azure.resourceGroup",
                format!(
                    "failed to derive infra id from resource group \"{}\"",
                    azure.resource_group
                ),
            )
        })?;
    Ok(format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/galleries/{infra_id}/images/{infra_id}/versions/1.0.0",
        azure.subscription_id, azure.resource_group
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodepool_common::crd::{
        AzureNodePoolOsDisk, AzurePlatformSpec, AzureVmImage, Diagnostics as PoolDiagnostics,
        HostedClusterSpec, NodePoolPlatform, NodePoolSpec, PlatformSpec, PlatformType,
        UserManagedDiagnostics,
    };
    use nodepool_common::release::{
        AzureMarketplaceGenerations, CoreOSArchitecture, CoreOSStreamMetadata,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    const SUBNET_ID: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/workers";
    const SSH_KEY: &str = "c3NoLXJzYSBBQUFB";

    // =========================================================================
    // Test Fixtures
    // =========================================================================

    fn marketplace() -> AzureMarketplaceImage {
        AzureMarketplaceImage {
            publisher: "azureopenshift".to_string(),
            offer: "aro4".to_string(),
            sku: "aro_419".to_string(),
            version: "419.6.20250523".to_string(),
            image_generation: None,
        }
    }

    fn pool_platform() -> AzureNodePoolPlatform {
        AzureNodePoolPlatform {
            vm_size: "Standard_D4s_v3".to_string(),
            subnet_id: SUBNET_ID.to_string(),
            image: AzureVmImage {
                type_: AzureVmImageType::ImageId,
                image_id: Some("/subscriptions/sub/images/rhcos".to_string()),
                azure_marketplace: None,
            },
            os_disk: AzureNodePoolOsDisk {
                size_gib: 120,
                disk_storage_account_type: "Premium_LRS".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn node_pool(platform: AzureNodePoolPlatform) -> NodePool {
        NodePool::new(
            "workers",
            NodePoolSpec {
                arch: "amd64".to_string(),
                platform: NodePoolPlatform {
                    type_: PlatformType::Azure,
                    azure: Some(platform),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn build(platform: AzureNodePoolPlatform) -> Result<AzureMachineSpec> {
        azure_machine_template_spec(&node_pool(platform), Some(SSH_KEY)).map(|s| s.template.spec)
    }

    // =========================================================================
    // Story: required fields
    // =========================================================================

    #[test]
    fn image_id_pool() {
        let spec = build(pool_platform()).expect("spec should build");
        assert_eq!(spec.vm_size, "Standard_D4s_v3");
        assert_eq!(spec.os_disk.disk_size_gb, Some(120));
        assert_eq!(
            spec.os_disk.managed_disk,
            Some(ManagedDiskParameters {
                storage_account_type: "Premium_LRS".to_string(),
                disk_encryption_set: None,
            })
        );
        assert_eq!(
            spec.network_interfaces,
            vec![NetworkInterface {
                subnet_name: "workers".to_string()
            }]
        );
        assert_eq!(spec.failure_domain, None);
        assert_eq!(
            spec.image,
            Some(Image {
                id: Some("/subscriptions/sub/images/rhcos".to_string()),
                marketplace: None,
            })
        );
        assert_eq!(spec.ssh_public_key, SSH_KEY);
        assert_eq!(spec.identity, None);
        assert_eq!(spec.security_profile, None);
        assert_eq!(spec.diagnostics, None);
        assert!(spec.os_disk.caching_type.is_empty());
    }

    #[test]
    fn availability_zone_becomes_failure_domain() {
        let spec = build(AzureNodePoolPlatform {
            availability_zone: "2".to_string(),
            ..pool_platform()
        })
        .expect("spec should build");
        assert_eq!(spec.failure_domain.as_deref(), Some("2"));
    }

    /// Story: a subnet id that ends at "/subnets/" has no subnet name
    #[test]
    fn story_bad_subnet_is_invalid_input() {
        let subnet_id =
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/";
        let err = build(AzureNodePoolPlatform {
            subnet_id: subnet_id.to_string(),
            ..pool_platform()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert_eq!(
            err.to_string(),
            format!(
                "failed to determine subnet name for Azure machine: failed to parse subnet name from \"{subnet_id}\""
            )
        );
    }

    #[test]
    fn missing_selected_image_is_invalid_input() {
        let mut platform = pool_platform();
        platform.image = AzureVmImage {
            type_: AzureVmImageType::AzureMarketplace,
            image_id: Some("/subscriptions/sub/images/rhcos".to_string()),
            azure_marketplace: None,
        };
        let err = build(platform).unwrap_err();
        assert_eq!(err.to_string(), IMAGE_REQUIRED);

        let mut platform = pool_platform();
        platform.image.image_id = None;
        assert_eq!(build(platform).unwrap_err().to_string(), IMAGE_REQUIRED);
    }

    // =========================================================================
    // Story: optional features
    // =========================================================================

    /// Story: ephemeral disk, managed identity, marketplace image, encryption
    /// set and managed diagnostics all land in the machine spec
    #[test]
    fn story_full_featured_pool() {
        let platform = AzureNodePoolPlatform {
            image: AzureVmImage {
                type_: AzureVmImageType::AzureMarketplace,
                image_id: None,
                azure_marketplace: Some(marketplace()),
            },
            os_disk: AzureNodePoolOsDisk {
                size_gib: 30,
                disk_storage_account_type: "Standard_LRS".to_string(),
                encryption_set_id: "testDES_ID".to_string(),
                persistence: Some(DiskPersistence::Ephemeral),
            },
            machine_identity_id: "/subscriptions/sub/identities/worker".to_string(),
            encryption_at_host: "Enabled".to_string(),
            diagnostics: Some(PoolDiagnostics {
                storage_account_type: "Managed".to_string(),
                user_managed: None,
            }),
            ..pool_platform()
        };
        let spec = build(platform).expect("spec should build");

        assert_eq!(spec.os_disk.caching_type, "ReadOnly");
        assert_eq!(
            spec.os_disk.diff_disk_settings,
            Some(DiffDiskSettings {
                option: "Local".to_string()
            })
        );
        assert_eq!(
            spec.os_disk
                .managed_disk
                .and_then(|m| m.disk_encryption_set)
                .map(|d| d.id),
            Some("testDES_ID".to_string())
        );
        assert_eq!(spec.identity.as_deref(), Some("UserAssigned"));
        assert_eq!(
            spec.user_assigned_identities,
            vec![UserAssignedIdentity {
                provider_id: "/subscriptions/sub/identities/worker".to_string()
            }]
        );
        let image = spec.image.expect("image");
        assert_eq!(image.id, None);
        assert_eq!(
            image.marketplace,
            Some(MarketplaceImageRef {
                publisher: "azureopenshift".to_string(),
                offer: "aro4".to_string(),
                sku: "aro_419".to_string(),
                version: "419.6.20250523".to_string(),
                third_party_image: false,
            })
        );
        assert_eq!(
            spec.security_profile,
            Some(SecurityProfile {
                encryption_at_host: Some(true)
            })
        );
        let boot = spec.diagnostics.and_then(|d| d.boot).expect("boot diagnostics");
        assert_eq!(boot.storage_account_type, "Managed");
        assert_eq!(boot.user_managed, None);
    }

    #[test]
    fn user_managed_diagnostics_carry_storage_account() {
        let spec = build(AzureNodePoolPlatform {
            diagnostics: Some(PoolDiagnostics {
                storage_account_type: "UserManaged".to_string(),
                user_managed: Some(UserManagedDiagnostics {
                    storage_account_uri: "https://diag.blob.core.windows.net".to_string(),
                }),
            }),
            ..pool_platform()
        })
        .expect("spec should build");
        let boot = spec.diagnostics.and_then(|d| d.boot).expect("boot diagnostics");
        assert_eq!(
            boot.user_managed.map(|u| u.storage_account_uri).as_deref(),
            Some("https://diag.blob.core.windows.net")
        );
    }

    #[test]
    fn empty_diagnostics_type_is_ignored() {
        let spec = build(AzureNodePoolPlatform {
            diagnostics: Some(PoolDiagnostics::default()),
            ..pool_platform()
        })
        .expect("spec should build");
        assert_eq!(spec.diagnostics, None);
    }

    // =========================================================================
    // Story: ssh key
    // =========================================================================

    /// Story: without an existing key the builder generates one from the injected rng
    #[test]
    fn story_ssh_key_generated_when_absent() {
        let np = node_pool(pool_platform());
        let first = azure_machine_template_spec_with_rng(&np, Some(""), &mut StdRng::seed_from_u64(1))
            .expect("spec should build");
        let second = azure_machine_template_spec_with_rng(&np, None, &mut StdRng::seed_from_u64(1))
            .expect("spec should build");
        assert!(!first.template.spec.ssh_public_key.is_empty());
        assert_eq!(first, second);
    }

    // =========================================================================
    // Story: marketplace defaulting
    // =========================================================================

    fn release(version: &str, offers: Option<AzureMarketplaceGenerations>) -> ReleaseImage {
        let mut arch = CoreOSArchitecture::default();
        arch.rhcos.marketplace.azure.no_purchase_plan = offers;
        ReleaseImage::new(
            version,
            Some(CoreOSStreamMetadata {
                stream: "rhcos".to_string(),
                architectures: BTreeMap::from([("x86_64".to_string(), arch)]),
            }),
        )
    }

    fn offers() -> AzureMarketplaceGenerations {
        AzureMarketplaceGenerations {
            hyper_v_gen1: Some(AzureMarketplaceImage {
                sku: "aro_420_gen1".to_string(),
                ..marketplace()
            }),
            hyper_v_gen2: Some(AzureMarketplaceImage {
                sku: "aro_420".to_string(),
                ..marketplace()
            }),
        }
    }

    fn marketplace_pool(image: Option<AzureMarketplaceImage>) -> NodePool {
        node_pool(AzureNodePoolPlatform {
            image: AzureVmImage {
                type_: AzureVmImageType::AzureMarketplace,
                image_id: None,
                azure_marketplace: image,
            },
            ..pool_platform()
        })
    }

    /// Story: a 4.20 release fills in the Gen2 no-purchase-plan image
    #[test]
    fn story_marketplace_defaults_from_release() {
        let image = default_marketplace_image(&marketplace_pool(None), &release("4.20.0", Some(offers())))
            .expect("defaulting should succeed")
            .expect("image should be defaulted");
        assert_eq!(image.sku, "aro_420");
    }

    #[test]
    fn marketplace_generation_selects_gen1() {
        let np = marketplace_pool(Some(AzureMarketplaceImage {
            image_generation: Some(HyperVGeneration::Gen1),
            ..Default::default()
        }));
        let image = default_marketplace_image(&np, &release("4.21.3", Some(offers())))
            .expect("defaulting should succeed")
            .expect("image should be defaulted");
        assert_eq!(image.sku, "aro_420_gen1");
    }

    #[test]
    fn marketplace_defaulting_skips() {
        // explicit image id
        let np = node_pool(pool_platform());
        assert_eq!(
            default_marketplace_image(&np, &release("4.20.0", Some(offers()))).expect("ok"),
            None
        );
        // complete marketplace image
        let np = marketplace_pool(Some(marketplace()));
        assert_eq!(
            default_marketplace_image(&np, &release("4.20.0", Some(offers()))).expect("ok"),
            None
        );
        // older release
        let np = marketplace_pool(None);
        assert_eq!(
            default_marketplace_image(&np, &release("4.19.9", Some(offers()))).expect("ok"),
            None
        );
        // no marketplace metadata
        assert_eq!(
            default_marketplace_image(&np, &release("4.20.0", None)).expect("ok"),
            None
        );
    }

    /// Story: nightlies and candidates of the first marketplace release
    /// keep the pool's image untouched
    ///
    /// Only the final 4.20.0 build is known to publish marketplace offers;
    /// a pre-release of it is treated like an older release.
    #[test]
    fn story_prerelease_of_minimum_release_is_not_defaulted() {
        let np = marketplace_pool(None);
        for version in ["4.20.0-0.nightly-2025-01-01-000000", "4.20.0-ec.2", "4.20.0-rc.1"] {
            assert_eq!(
                default_marketplace_image(&np, &release(version, Some(offers()))).expect("ok"),
                None,
                "{version} should not be defaulted"
            );
        }

        let image = default_marketplace_image(&np, &release("4.21.0-ec.2", Some(offers())))
            .expect("defaulting should succeed")
            .expect("later pre-release should be defaulted");
        assert_eq!(image.sku, "aro_420");
    }

    #[test]
    fn marketplace_defaulting_errors() {
        let np = marketplace_pool(None);
        let err = default_marketplace_image(&np, &release("not-a-version", Some(offers()))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));

        let mut arm = marketplace_pool(None);
        arm.spec.arch = "arm64".to_string();
        let err = default_marketplace_image(&arm, &release("4.20.0", Some(offers()))).unwrap_err();
        assert!(err.to_string().contains("architecture aarch64 not found"));

        let gen1_only = AzureMarketplaceGenerations {
            hyper_v_gen2: None,
            ..offers()
        };
        let err = default_marketplace_image(&np, &release("4.20.0", Some(gen1_only))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no Azure Marketplace image available for x86_64 generation Gen2"
        );
    }

    // =========================================================================
    // Story: image gallery
    // =========================================================================

    #[test]
    fn gallery_id_from_resource_group() {
        let hc = HostedCluster::new(
            "example",
            HostedClusterSpec {
                infra_id: "abc12".to_string(),
                platform: PlatformSpec {
                    type_: PlatformType::Azure,
                    azure: Some(AzurePlatformSpec {
                        subscription_id: "sub".to_string(),
                        resource_group: "example-abc12".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            },
        );
        assert_eq!(
            boot_image_gallery_id(&hc).expect("gallery id"),
            "/subscriptions/sub/resourceGroups/example-abc12/providers/Microsoft.Compute/galleries/abc12/images/abc12/versions/1.0.0"
        );

        let bare = HostedCluster::new("example", HostedClusterSpec::default());
        assert!(boot_image_gallery_id(&bare).is_err());
    }
}
