//! Custom Resource Definitions consumed by the machine-template builders
//!
//! HostedCluster and NodePool are owned by the hosted control plane operator;
//! only the fields the builders read are modeled here.

mod hosted_cluster;
mod node_pool;
mod providers;
mod types;

pub use hosted_cluster::{
    HostedCluster, HostedClusterSpec, HostedClusterStatus, PlatformSpec, PlatformStatus,
};
pub use node_pool::{NodePool, NodePoolPlatform, NodePoolSpec};
pub use providers::{
    AwsNodePoolPlatform, AwsPlatformSpec, AwsPlatformStatus, AzureMarketplaceImage,
    AzureNodePoolOsDisk, AzureNodePoolPlatform, AzurePlatformSpec, AzureVmImage, AzureVmImageType,
    CapacityReservationOptions, Diagnostics, DiskPersistence, HyperVGeneration, MarketType,
    PlacementOptions, PowerVSImageDeletePolicy, PowerVSNodePoolPlatform, PowerVSPlatformSpec,
    PowerVSProcessorType, SpotMarketOptions, UserManagedDiagnostics, Volume,
};
pub use types::{
    AwsResourceReference, Filter, PlatformType, PowerVSResourceReference, Release, ResourceTag,
    Taint, TaintEffect,
};
