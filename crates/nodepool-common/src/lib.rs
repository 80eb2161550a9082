//! Common types for NodePool machine-template generation: CRDs, the release
//! image descriptor, and errors

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod release;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Annotation on a NodePool that switches EC2 instance metadata to IMDSv2-only
pub const EC2_INSTANCE_METADATA_HTTP_TOKENS_ANNOTATION: &str =
    "hypershift.openshift.io/ec2-instance-metadata-http-tokens";

/// Annotation on a HostedCluster that gives AWS machines a public IP
pub const AWS_MACHINE_PUBLIC_IPS_ANNOTATION: &str = "hypershift.openshift.io/aws-machine-public-ips";

/// Label/annotation key linking CAPI resources to their cluster
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";
