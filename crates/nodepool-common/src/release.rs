//! Parsed release image descriptor
//!
//! A release image carries a version and the RHCOS stream metadata: boot
//! images indexed by CPU architecture, then by provider, then by region.
//! Downloading and parsing the payload happens elsewhere; this module only
//! models the parsed document and the lookups the builders need.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::AzureMarketplaceImage;
use crate::{Error, Result};

/// Stream architecture the PowerVS builder reads boot images from
pub const PPC64LE_ARCH: &str = "ppc64le";

/// A parsed release image
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseImage {
    /// Semantic version of the release (e.g., "4.20.1")
    pub version: String,

    /// RHCOS stream metadata; absent for payloads that ship none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_metadata: Option<CoreOSStreamMetadata>,
}

/// RHCOS stream metadata
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSStreamMetadata {
    /// Stream name (e.g., "rhcos-4.20")
    #[serde(default)]
    pub stream: String,

    /// Per-architecture metadata keyed by stream architecture name
    #[serde(default)]
    pub architectures: BTreeMap<String, CoreOSArchitecture>,
}

/// Boot images of one CPU architecture
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSArchitecture {
    /// Provider image collections
    #[serde(default)]
    pub images: CoreOSImages,

    /// RHEL CoreOS extensions (Azure disk and marketplace images)
    #[serde(default, rename = "rhel-coreos-extensions")]
    pub rhcos: CoreOSExtensions,
}

/// Provider image collections of one architecture
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSImages {
    /// AMIs
    #[serde(default)]
    pub aws: CoreOSAWSImages,

    /// PowerVS images stored in IBM Cloud Object Storage
    #[serde(default)]
    pub powervs: CoreOSPowerVSImages,
}

/// AMIs keyed by AWS region
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSAWSImages {
    /// Region name to AMI
    #[serde(default)]
    pub regions: BTreeMap<String, CoreOSAWSImage>,
}

/// An AMI in one region
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSAWSImage {
    /// RHCOS build id
    #[serde(default)]
    pub release: String,
    /// AMI id
    #[serde(default)]
    pub image: String,
}

/// PowerVS images keyed by object-store region
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSPowerVSImages {
    /// Region name to image
    #[serde(default)]
    pub regions: BTreeMap<String, CoreOSPowerVSImage>,
}

/// A PowerVS boot image in one object-store region
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSPowerVSImage {
    /// RHCOS build id, also used as the imported image name
    #[serde(default)]
    pub release: String,
    /// Object key in the bucket
    #[serde(default)]
    pub object: String,
    /// Bucket holding the image
    #[serde(default)]
    pub bucket: String,
    /// Public URL of the object
    #[serde(default)]
    pub url: String,
}

/// RHEL CoreOS extensions of one architecture
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSExtensions {
    /// Azure VHD
    #[serde(default, rename = "azure-disk")]
    pub azure_disk: CoreOSAzureDisk,

    /// Marketplace images
    #[serde(default)]
    pub marketplace: CoreOSMarketplace,
}

/// Azure VHD location
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSAzureDisk {
    /// RHCOS build id
    #[serde(default)]
    pub release: String,
    /// Blob URL
    #[serde(default)]
    pub url: String,
}

/// Marketplace images per cloud
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreOSMarketplace {
    /// Azure Marketplace offers
    #[serde(default)]
    pub azure: AzureMarketplaceOffers,
}

/// Azure Marketplace offers published for a release
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AzureMarketplaceOffers {
    /// Images that need no purchase plan
    #[serde(default, rename = "no-purchase-plan", skip_serializing_if = "Option::is_none")]
    pub no_purchase_plan: Option<AzureMarketplaceGenerations>,
}

/// One marketplace image per Hyper-V generation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureMarketplaceGenerations {
    /// Generation 1 image
    #[serde(default, rename = "hyperVGen1", skip_serializing_if = "Option::is_none")]
    pub hyper_v_gen1: Option<AzureMarketplaceImage>,
    /// Generation 2 image
    #[serde(default, rename = "hyperVGen2", skip_serializing_if = "Option::is_none")]
    pub hyper_v_gen2: Option<AzureMarketplaceImage>,
}

impl AzureMarketplaceGenerations {
    /// True when neither generation is published
    pub fn is_empty(&self) -> bool {
        self.hyper_v_gen1.is_none() && self.hyper_v_gen2.is_none()
    }
}

/// Map a NodePool architecture to its stream architecture name
///
/// Unknown names pass through unchanged.
pub fn stream_arch(arch: &str) -> &str {
    match arch {
        "amd64" | "" => "x86_64",
        "arm64" => "aarch64",
        other => other,
    }
}

impl ReleaseImage {
    /// Create a release with a version and stream metadata
    pub fn new(version: impl Into<String>, stream_metadata: Option<CoreOSStreamMetadata>) -> Self {
        Self {
            version: version.into(),
            stream_metadata,
        }
    }

    /// Stream metadata for a stream architecture
    ///
    /// `display_arch` is the name used in the error message, so callers can
    /// report the architecture the user asked for rather than the alias.
    pub fn architecture(&self, stream_arch: &str, display_arch: &str) -> Result<&CoreOSArchitecture> {
        self.stream_metadata
            .as_ref()
            .and_then(|m| m.architectures.get(stream_arch))
            .ok_or_else(|| {
                Error::not_found_kind(
                    "architecture",
                    format!("couldn't find OS metadata for architecture {display_arch:?}"),
                )
            })
    }

    /// AMI for a region and NodePool architecture
    pub fn aws_ami(&self, region: &str, arch: &str) -> Result<String> {
        let arch_data = self.architecture(stream_arch(arch), arch)?;
        let region_data = arch_data.images.aws.regions.get(region).ok_or_else(|| {
            Error::not_found_kind(
                "region",
                format!("couldn't find AWS image for region {region:?}"),
            )
        })?;
        if region_data.image.is_empty() {
            return Err(Error::not_found_kind(
                "image",
                format!("release image metadata has no image for region {region:?}"),
            ));
        }
        Ok(region_data.image.clone())
    }

    /// Parse the version with its pre-release identifiers
    ///
    /// Build metadata after `+` is dropped.
    pub fn semver(&self) -> Result<ReleaseVersion> {
        self.version.parse()
    }
}

/// Semantic version of a release
///
/// Ordering follows semver precedence, so `4.20.0-ec.2` and
/// `4.20.0-0.nightly-2025-01-01-000000` both sort below `4.20.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseVersion {
    /// Major version component
    pub major: u64,
    /// Minor version component
    pub minor: u64,
    /// Patch version component
    pub patch: u64,
    /// Dot-separated pre-release identifiers, empty for a final release
    pub pre: Vec<String>,
}

impl ReleaseVersion {
    /// A final release version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
        }
    }

    /// True for nightlies, candidates and other pre-release builds
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl std::str::FromStr for ReleaseVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid_input_for_field("version", format!("failed to parse release version {s}"))
        };
        let without_build = s.split('+').next().unwrap_or_default();
        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (without_build, None),
        };

        let mut parts = core.split('.');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(invalid)
        };
        let (major, minor, patch) = (next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }

        let pre = match pre {
            Some(pre) => {
                let ids: Vec<String> = pre.split('.').map(str::to_string).collect();
                if ids.iter().any(|id| id.is_empty()) {
                    return Err(invalid());
                }
                ids
            }
            None => Vec::new(),
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_prerelease() {
            write!(f, "-{}", self.pre.join("."))?;
        }
        Ok(())
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    for (a, b) in self.pre.iter().zip(&other.pre) {
                        match compare_identifier(a, b) {
                            Ordering::Equal => continue,
                            ord => return ord,
                        }
                    }
                    self.pre.len().cmp(&other.pre.len())
                }
            })
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numeric identifiers sort numerically and below alphanumeric ones
fn compare_identifier(a: &str, b: &str) -> Ordering {
    let numeric = |id: &str| {
        if id.bytes().all(|c| c.is_ascii_digit()) {
            id.parse::<u64>().ok()
        } else {
            None
        }
    };
    match (numeric(a), numeric(b)) {
        // "01" and "1" are unequal under Eq
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
