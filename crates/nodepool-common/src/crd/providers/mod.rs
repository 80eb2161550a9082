//! Provider-specific platform blocks of the HostedCluster and NodePool CRDs
//!
//! Each provider module holds the cluster-level and pool-level settings
//! consumed by the matching Cluster API provider:
//! - CAPA (AWS)
//! - CAPZ (Azure)
//! - CAPIBM (IBM Cloud PowerVS)

mod aws;
mod azure;
mod powervs;

pub use aws::{
    AwsNodePoolPlatform, AwsPlatformSpec, AwsPlatformStatus, CapacityReservationOptions,
    MarketType, PlacementOptions, SpotMarketOptions, Volume,
};
pub use azure::{
    AzureMarketplaceImage, AzureNodePoolOsDisk, AzureNodePoolPlatform, AzurePlatformSpec,
    AzureVmImage, AzureVmImageType, Diagnostics, DiskPersistence, HyperVGeneration,
    UserManagedDiagnostics,
};
pub use powervs::{
    PowerVSImageDeletePolicy, PowerVSNodePoolPlatform, PowerVSPlatformSpec, PowerVSProcessorType,
};
