//! Cluster API machine templates for NodePools
//!
//! This crate provides:
//! - Builders that turn a NodePool into an AWS, Azure or PowerVS machine template spec
//! - Provider dispatch and hash-based template naming
//! - The scale-from-zero annotator for AWS pools and its instance type catalog
//! - OpenSSH public key generation for Azure machines

pub mod api;
pub mod autoscaler;
pub mod constants;
pub mod provider;
pub mod ssh;

// Re-export provider types
pub use provider::{
    aws_machine_template_spec, aws_template_name, azure_machine_template_spec,
    azure_machine_template_spec_with_rng, default_marketplace_image, machine_template_spec,
    powervs_image, powervs_machine_template_spec, template_name, validate_aws_platform,
    MachineTemplateSpec, TemplateInputs,
};

// Re-export autoscaler types
pub use autoscaler::{
    parse_taints_annotation, CachedInstanceTypes, InstanceTypeInfo, InstanceTypeProvider,
    ScaleFromZeroAnnotator,
};

#[cfg(test)]
pub use autoscaler::MockInstanceTypeProvider;
