//! Instance type catalog
//!
//! The scale-from-zero annotator needs the resources of one machine before any
//! machine exists. They come from an [`InstanceTypeProvider`], typically
//! backed by EC2 `DescribeInstanceTypes`, whose raw records are normalized by
//! [`InstanceTypeInfo::from_raw`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use nodepool_common::{Error, Result};

/// Resources of one instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTypeInfo {
    /// Default vCPU count
    pub vcpu: i32,
    /// Memory in MiB
    pub memory_mb: i64,
    /// Total GPU count across all GPU devices
    pub gpu: i32,
    /// Kubernetes architecture name ("amd64" or "arm64")
    pub cpu_architecture: String,
}

/// Source of instance type information
///
/// Implementations may perform I/O. Dropping the returned future cancels the
/// lookup; timeouts are the implementation's concern.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstanceTypeProvider: Send + Sync {
    /// Look up an instance type (e.g. "m5.large")
    async fn get_instance_type_info(&self, instance_type: &str) -> Result<InstanceTypeInfo>;
}

// =============================================================================
// Raw EC2 records
// =============================================================================

/// An EC2 `InstanceTypeInfo` record as returned by `DescribeInstanceTypes`
///
/// Every field is optional on the wire; [`InstanceTypeInfo::from_raw`]
/// enforces which ones are required.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawInstanceType {
    /// Instance type name
    #[serde(rename = "InstanceType", default)]
    pub instance_type: Option<String>,
    /// vCPU information
    #[serde(rename = "VCpuInfo", default)]
    pub vcpu_info: Option<RawVCpuInfo>,
    /// Memory information
    #[serde(rename = "MemoryInfo", default)]
    pub memory_info: Option<RawMemoryInfo>,
    /// Processor information
    #[serde(rename = "ProcessorInfo", default)]
    pub processor_info: Option<RawProcessorInfo>,
    /// GPU information
    #[serde(rename = "GpuInfo", default)]
    pub gpu_info: Option<RawGpuInfo>,
}

/// vCPU information of an EC2 instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawVCpuInfo {
    /// Default vCPU count
    #[serde(rename = "DefaultVCpus", default)]
    pub default_vcpus: Option<i64>,
}

/// Memory information of an EC2 instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawMemoryInfo {
    /// Memory in MiB
    #[serde(rename = "SizeInMiB", default)]
    pub size_in_mib: Option<i64>,
}

/// Processor information of an EC2 instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawProcessorInfo {
    /// EC2 architecture names ("x86_64", "arm64", ...)
    #[serde(rename = "SupportedArchitectures", default)]
    pub supported_architectures: Vec<Option<String>>,
}

/// GPU information of an EC2 instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawGpuInfo {
    /// GPU devices
    #[serde(rename = "Gpus", default)]
    pub gpus: Vec<Option<RawGpuDevice>>,
}

/// One GPU device kind of an EC2 instance type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawGpuDevice {
    /// Number of devices of this kind
    #[serde(rename = "Count", default)]
    pub count: Option<i64>,
}

/// Total GPU count, skipping devices without a count
pub fn gpu_count(gpu_info: Option<&RawGpuInfo>) -> i32 {
    gpu_info
        .map(|info| {
            info.gpus
                .iter()
                .flatten()
                .filter_map(|gpu| gpu.count)
                .sum::<i64>()
        })
        .unwrap_or_default()
        .try_into()
        .unwrap_or(i32::MAX)
}

/// Kubernetes architecture for an EC2 architecture name
fn kubernetes_arch(ec2_arch: &str) -> Option<&'static str> {
    match ec2_arch {
        "x86_64" | "x86_64_mac" => Some("amd64"),
        "arm64" | "arm64_mac" => Some("arm64"),
        _ => None,
    }
}

impl InstanceTypeInfo {
    /// Normalize a raw EC2 record
    ///
    /// The first supported architecture is the one reported.
    pub fn from_raw(raw: &RawInstanceType) -> Result<Self> {
        let invalid = |msg: String| Error::internal_with_context("catalog", msg);

        let name = raw
            .instance_type
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid("instance type name is missing".to_string()))?;

        let vcpu = raw
            .vcpu_info
            .as_ref()
            .and_then(|v| v.default_vcpus)
            .ok_or_else(|| invalid(format!("missing vCPU information for instance type {name}")))?;
        let vcpu = i32::try_from(vcpu)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| invalid(format!("invalid vCPU count {vcpu} for instance type {name}")))?;

        let memory_mb = raw
            .memory_info
            .as_ref()
            .and_then(|m| m.size_in_mib)
            .ok_or_else(|| invalid(format!("missing memory information for instance type {name}")))?;
        if memory_mb <= 0 {
            return Err(invalid(format!(
                "invalid memory size {memory_mb} for instance type {name}"
            )));
        }

        let ec2_arch = raw
            .processor_info
            .as_ref()
            .and_then(|p| p.supported_architectures.first())
            .ok_or_else(|| {
                invalid(format!("missing CPU architecture information for instance type {name}"))
            })?
            .as_deref()
            .ok_or_else(|| invalid(format!("CPU architecture is nil for instance type {name}")))?;
        let cpu_architecture = kubernetes_arch(ec2_arch).ok_or_else(|| {
            invalid(format!(
                "unsupported CPU architecture {ec2_arch} for instance type {name}"
            ))
        })?;

        Ok(Self {
            vcpu,
            memory_mb,
            gpu: gpu_count(raw.gpu_info.as_ref()),
            cpu_architecture: cpu_architecture.to_string(),
        })
    }
}

// =============================================================================
// Caching
// =============================================================================

/// Memoizing wrapper around an [`InstanceTypeProvider`]
///
/// Only successful lookups are cached, so a throttled or failed request is
/// retried on the next call.
pub struct CachedInstanceTypes<P> {
    inner: P,
    cache: DashMap<String, InstanceTypeInfo>,
}

impl<P: InstanceTypeProvider> CachedInstanceTypes<P> {
    /// Wrap a provider with an empty cache
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Cached entry for an instance type, if any
    pub fn cached(&self, instance_type: &str) -> Option<InstanceTypeInfo> {
        self.cache.get(instance_type).map(|entry| entry.value().clone())
    }

    /// Number of cached instance types
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl<P: InstanceTypeProvider> InstanceTypeProvider for CachedInstanceTypes<P> {
    async fn get_instance_type_info(&self, instance_type: &str) -> Result<InstanceTypeInfo> {
        if let Some(info) = self.cached(instance_type) {
            return Ok(info);
        }

        let info = self.inner.get_instance_type_info(instance_type).await?;
        debug!(
            instance_type = %instance_type,
            vcpu = info.vcpu,
            memory_mb = info.memory_mb,
            "caching instance type"
        );
        self.cache.insert(instance_type.to_string(), info.clone());
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m5_large() -> InstanceTypeInfo {
        InstanceTypeInfo {
            vcpu: 2,
            memory_mb: 8192,
            gpu: 0,
            cpu_architecture: "amd64".to_string(),
        }
    }

    fn raw(name: &str, arch: &str, vcpu: i64, memory_mb: i64) -> RawInstanceType {
        RawInstanceType {
            instance_type: Some(name.to_string()),
            vcpu_info: Some(RawVCpuInfo {
                default_vcpus: Some(vcpu),
            }),
            memory_info: Some(RawMemoryInfo {
                size_in_mib: Some(memory_mb),
            }),
            processor_info: Some(RawProcessorInfo {
                supported_architectures: vec![Some(arch.to_string())],
            }),
            gpu_info: None,
        }
    }

    fn gpus(counts: &[Option<i64>]) -> RawGpuInfo {
        RawGpuInfo {
            gpus: counts.iter().map(|c| Some(RawGpuDevice { count: *c })).collect(),
        }
    }

    // =========================================================================
    // Raw record normalization
    // =========================================================================

    #[test]
    fn gpu_count_sums_devices() {
        assert_eq!(gpu_count(None), 0);
        assert_eq!(gpu_count(Some(&RawGpuInfo::default())), 0);
        assert_eq!(gpu_count(Some(&gpus(&[Some(4)]))), 4);
        assert_eq!(gpu_count(Some(&gpus(&[Some(8), Some(6)]))), 14);
        assert_eq!(gpu_count(Some(&gpus(&[Some(6), None]))), 6);

        let with_missing_device = RawGpuInfo {
            gpus: vec![None, Some(RawGpuDevice { count: Some(6) })],
        };
        assert_eq!(gpu_count(Some(&with_missing_device)), 6);
    }

    #[test]
    fn normalizes_describe_instance_types_record() {
        let json = r#"{
            "InstanceType": "g5.xlarge",
            "VCpuInfo": {"DefaultVCpus": 4},
            "MemoryInfo": {"SizeInMiB": 16384},
            "ProcessorInfo": {"SupportedArchitectures": ["x86_64"]},
            "GpuInfo": {"Gpus": [{"Count": 1}]}
        }"#;
        let raw: RawInstanceType = serde_json::from_str(json).expect("record should parse");
        assert_eq!(
            InstanceTypeInfo::from_raw(&raw).expect("record should normalize"),
            InstanceTypeInfo {
                vcpu: 4,
                memory_mb: 16384,
                gpu: 1,
                cpu_architecture: "amd64".to_string(),
            }
        );
    }

    #[test]
    fn arm_instance_reports_arm64() {
        let info = InstanceTypeInfo::from_raw(&raw("m6g.large", "arm64", 2, 8192))
            .expect("record should normalize");
        assert_eq!(info.cpu_architecture, "arm64");
    }

    #[test]
    fn incomplete_records_are_rejected() {
        let cases = [
            (
                RawInstanceType {
                    instance_type: None,
                    ..raw("m5.large", "x86_64", 2, 8192)
                },
                "instance type name is missing",
            ),
            (
                RawInstanceType {
                    vcpu_info: None,
                    ..raw("m5.large", "x86_64", 2, 8192)
                },
                "missing vCPU information",
            ),
            (raw("m5.large", "x86_64", 0, 8192), "invalid vCPU count"),
            (
                RawInstanceType {
                    memory_info: Some(RawMemoryInfo::default()),
                    ..raw("m5.large", "x86_64", 2, 8192)
                },
                "missing memory information",
            ),
            (raw("m5.large", "x86_64", 2, 0), "invalid memory size"),
            (
                RawInstanceType {
                    processor_info: None,
                    ..raw("m5.large", "x86_64", 2, 8192)
                },
                "missing CPU architecture information",
            ),
            (
                RawInstanceType {
                    processor_info: Some(RawProcessorInfo {
                        supported_architectures: vec![None],
                    }),
                    ..raw("m5.large", "x86_64", 2, 8192)
                },
                "CPU architecture is nil",
            ),
            (raw("m5.large", "i386", 2, 8192), "unsupported CPU architecture"),
        ];

        for (record, expected) in cases {
            let err = InstanceTypeInfo::from_raw(&record).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected {expected:?} in {err}"
            );
        }
    }

    // =========================================================================
    // Caching
    // =========================================================================

    #[tokio::test]
    async fn successful_lookups_are_cached() {
        let mut provider = MockInstanceTypeProvider::new();
        provider
            .expect_get_instance_type_info()
            .withf(|instance_type| instance_type == "m5.large")
            .times(1)
            .returning(|_| Ok(m5_large()));

        let cache = CachedInstanceTypes::new(provider);
        assert!(cache.is_empty());

        let first = cache
            .get_instance_type_info("m5.large")
            .await
            .expect("lookup should succeed");
        let second = cache
            .get_instance_type_info("m5.large")
            .await
            .expect("cached lookup should succeed");

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cached("m5.large"), Some(m5_large()));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let mut provider = MockInstanceTypeProvider::new();
        provider
            .expect_get_instance_type_info()
            .times(2)
            .returning(|_| Err(Error::internal_with_context("catalog", "throttled")));

        let cache = CachedInstanceTypes::new(provider);
        assert!(cache.get_instance_type_info("m5.large").await.is_err());
        assert!(cache.get_instance_type_info("m5.large").await.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn clear_forces_a_fresh_lookup() {
        let mut provider = MockInstanceTypeProvider::new();
        provider
            .expect_get_instance_type_info()
            .times(2)
            .returning(|_| Ok(m5_large()));

        let cache = CachedInstanceTypes::new(provider);
        cache
            .get_instance_type_info("m5.large")
            .await
            .expect("lookup should succeed");
        cache.clear();
        cache
            .get_instance_type_info("m5.large")
            .await
            .expect("lookup should succeed");
    }
}
