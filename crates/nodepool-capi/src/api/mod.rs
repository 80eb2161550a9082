//! Cluster API infrastructure types produced by the template builders
//!
//! Only the fields the builders set are modeled. Maps are `BTreeMap`s so
//! serialized output is key-sorted.

pub mod aws;
pub mod azure;
pub mod powervs;

pub use aws::{AWSMachineTemplate, AWSMachineTemplateSpec, AWSMachineTemplateStatus};
pub use azure::{AzureMachineTemplate, AzureMachineTemplateSpec};
pub use powervs::{
    IBMPowerVSImage, IBMPowerVSImageSpec, IBMPowerVSMachineTemplate,
    IBMPowerVSMachineTemplateSpec,
};
