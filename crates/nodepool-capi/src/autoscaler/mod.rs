//! Scale-from-zero capacity annotations
//!
//! The cluster autoscaler can only scale a MachineDeployment up from zero
//! replicas if it knows what one machine looks like. CAPA reports that in
//! `AWSMachineTemplate.status.capacity`; until it does, the annotator writes
//! the same information as annotations the autoscaler understands:
//!
//! - `machine.openshift.io/vCPU`, `machine.openshift.io/memoryMb`,
//!   `machine.openshift.io/GPU`
//! - `capacity.cluster-autoscaler.kubernetes.io/labels` (`k=v,...`)
//! - `capacity.cluster-autoscaler.kubernetes.io/taints` (`key=value:effect,...`)
//!
//! Once native capacity shows up the annotations are removed again.

mod instancetype;

pub use instancetype::{
    gpu_count, CachedInstanceTypes, InstanceTypeInfo, InstanceTypeProvider, RawGpuDevice,
    RawGpuInfo, RawInstanceType, RawMemoryInfo, RawProcessorInfo, RawVCpuInfo,
};

#[cfg(test)]
pub use instancetype::MockInstanceTypeProvider;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::AWSMachineTemplate;
use crate::constants::{
    ARCH_LABEL, CPU_ANNOTATION, GPU_ANNOTATION, LABELS_ANNOTATION, MEMORY_ANNOTATION,
    SCALE_FROM_ZERO_ANNOTATIONS, TAINTS_ANNOTATION,
};
use nodepool_common::crd::{NodePool, Taint, TaintEffect};
use nodepool_common::{Error, Result};

/// Writes scale-from-zero annotations for AWS pools
#[derive(Clone, Default)]
pub struct ScaleFromZeroAnnotator {
    provider: Option<Arc<dyn InstanceTypeProvider>>,
}

impl ScaleFromZeroAnnotator {
    /// Create an annotator; without a provider it only removes annotations
    pub fn new(provider: Option<Arc<dyn InstanceTypeProvider>>) -> Self {
        Self { provider }
    }

    /// True when an instance type provider is configured
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Bring the scale-from-zero annotations in line with the template
    ///
    /// The only suspension point is the provider lookup. Provider errors are
    /// returned unchanged and leave `annotations` untouched.
    pub async fn annotate(
        &self,
        node_pool: &NodePool,
        annotations: &mut BTreeMap<String, String>,
        template: &AWSMachineTemplate,
    ) -> Result<()> {
        let pool = node_pool.name_or_empty();

        if template
            .status
            .as_ref()
            .is_some_and(|status| !status.capacity.is_empty())
        {
            let before = annotations.len();
            for key in SCALE_FROM_ZERO_ANNOTATIONS {
                annotations.remove(key);
            }
            if annotations.len() != before {
                info!(pool = %pool, "template reports capacity, removed scale-from-zero annotations");
            }
            return Ok(());
        }

        let Some(provider) = &self.provider else {
            debug!(pool = %pool, "no instance type provider, skipping scale-from-zero annotations");
            return Ok(());
        };

        let instance_type = template.spec.template.spec.instance_type.as_str();
        if instance_type.is_empty() {
            return Err(Error::invalid_input_for_field(
                "spec.template.spec.instanceType",
                "AWSMachineTemplate has no instance type",
            ));
        }

        let instance = provider.get_instance_type_info(instance_type).await?;

        let before = annotations.clone();
        annotations.insert(CPU_ANNOTATION.to_string(), instance.vcpu.to_string());
        annotations.insert(MEMORY_ANNOTATION.to_string(), instance.memory_mb.to_string());
        annotations.insert(GPU_ANNOTATION.to_string(), instance.gpu.to_string());
        annotations.insert(
            LABELS_ANNOTATION.to_string(),
            encode_labels(&instance.cpu_architecture, &node_pool.spec.node_labels),
        );
        match encode_taints(&node_pool.spec.taints) {
            Some(taints) => {
                annotations.insert(TAINTS_ANNOTATION.to_string(), taints);
            }
            None => {
                annotations.remove(TAINTS_ANNOTATION);
            }
        }

        if *annotations != before {
            info!(
                pool = %pool,
                instance_type = %instance_type,
                vcpu = instance.vcpu,
                memory_mb = instance.memory_mb,
                gpu = instance.gpu,
                "updated scale-from-zero annotations"
            );
        }
        Ok(())
    }
}

/// Encode node labels as a sorted `k=v` list
///
/// The architecture label is added first so pool labels override it.
pub fn encode_labels(arch: &str, node_labels: &BTreeMap<String, String>) -> String {
    let mut labels = BTreeMap::from([(ARCH_LABEL.to_string(), arch.to_string())]);
    labels.extend(node_labels.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(",")
}

/// Encode taints as a sorted `key=value:effect` list; `None` for no taints
pub fn encode_taints(taints: &[Taint]) -> Option<String> {
    if taints.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = taints
        .iter()
        .map(|t| format!("{}={}:{}", t.key, t.value, t.effect))
        .collect();
    parts.sort();
    Some(parts.join(","))
}

/// Decode a taints annotation
///
/// Accepts both `key=value:effect` and `key:effect`; an empty annotation
/// decodes to no taints.
pub fn parse_taints_annotation(value: &str) -> Result<Vec<Taint>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(|entry| {
            let invalid = || {
                Error::invalid_input_for_field(
                    TAINTS_ANNOTATION,
                    format!("invalid taint {entry:?}, expected key=value:effect"),
                )
            };
            let (key_value, effect) = entry.rsplit_once(':').ok_or_else(invalid)?;
            let (key, value) = key_value.split_once('=').unwrap_or((key_value, ""));
            if key.is_empty() {
                return Err(invalid());
            }
            let effect: TaintEffect = effect.parse()?;
            Ok(Taint::new(key, value, effect))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::aws::{AWSMachineSpec, AWSMachineTemplateResource};
    use crate::api::{AWSMachineTemplateSpec, AWSMachineTemplateStatus};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use mockall::predicate::eq;
    use nodepool_common::crd::NodePoolSpec;

    // =========================================================================
    // Test Fixtures
    // =========================================================================

    fn template(instance_type: &str) -> AWSMachineTemplate {
        AWSMachineTemplate::new(
            "workers-1a2b3c4d",
            AWSMachineTemplateSpec {
                template: AWSMachineTemplateResource {
                    spec: AWSMachineSpec {
                        instance_type: instance_type.to_string(),
                        ..Default::default()
                    },
                },
            },
        )
    }

    fn template_with_capacity() -> AWSMachineTemplate {
        let mut t = template("m5.large");
        t.status = Some(AWSMachineTemplateStatus {
            capacity: BTreeMap::from([
                ("cpu".to_string(), Quantity("2".to_string())),
                ("memory".to_string(), Quantity("8Gi".to_string())),
            ]),
        });
        t
    }

    fn node_pool(labels: &[(&str, &str)], taints: Vec<Taint>) -> NodePool {
        NodePool::new(
            "workers",
            NodePoolSpec {
                node_labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                taints,
                ..Default::default()
            },
        )
    }

    fn m5_large() -> InstanceTypeInfo {
        InstanceTypeInfo {
            vcpu: 2,
            memory_mb: 8192,
            gpu: 0,
            cpu_architecture: "amd64".to_string(),
        }
    }

    fn annotator_returning(info: InstanceTypeInfo, calls: usize) -> ScaleFromZeroAnnotator {
        let mut provider = MockInstanceTypeProvider::new();
        provider
            .expect_get_instance_type_info()
            .with(eq("m5.large"))
            .times(calls)
            .returning(move |_| Ok(info.clone()));
        ScaleFromZeroAnnotator::new(Some(Arc::new(provider)))
    }

    fn workaround_annotations() -> BTreeMap<String, String> {
        SCALE_FROM_ZERO_ANNOTATIONS
            .iter()
            .map(|k| (k.to_string(), "stale".to_string()))
            .collect()
    }

    // =========================================================================
    // Story: annotations from the catalog
    // =========================================================================

    /// Story: an m5.large pool with one label and one taint gets all five
    /// annotations
    #[tokio::test]
    async fn story_annotations_from_instance_type() {
        let annotator = annotator_returning(m5_large(), 1);
        let np = node_pool(
            &[("pool", "p1")],
            vec![Taint::new("dedicated", "gpu", TaintEffect::NoSchedule)],
        );
        let mut annotations = BTreeMap::new();

        annotator
            .annotate(&np, &mut annotations, &template("m5.large"))
            .await
            .expect("annotation should succeed");

        assert_eq!(
            annotations,
            BTreeMap::from([
                ("machine.openshift.io/vCPU".to_string(), "2".to_string()),
                ("machine.openshift.io/memoryMb".to_string(), "8192".to_string()),
                ("machine.openshift.io/GPU".to_string(), "0".to_string()),
                (
                    "capacity.cluster-autoscaler.kubernetes.io/labels".to_string(),
                    "kubernetes.io/arch=amd64,pool=p1".to_string()
                ),
                (
                    "capacity.cluster-autoscaler.kubernetes.io/taints".to_string(),
                    "dedicated=gpu:NoSchedule".to_string()
                ),
            ])
        );
    }

    #[tokio::test]
    async fn unrelated_annotations_are_kept() {
        let annotator = annotator_returning(m5_large(), 1);
        let mut annotations =
            BTreeMap::from([("hypershift.openshift.io/nodePool".to_string(), "clusters/workers".to_string())]);

        annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template("m5.large"))
            .await
            .expect("annotation should succeed");

        assert_eq!(
            annotations.get("hypershift.openshift.io/nodePool").map(String::as_str),
            Some("clusters/workers")
        );
        assert_eq!(annotations.len(), 5);
    }

    /// Story: removing the last taint from a pool removes the annotation
    #[tokio::test]
    async fn story_no_taints_removes_annotation() {
        let annotator = annotator_returning(m5_large(), 1);
        let mut annotations = workaround_annotations();

        annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template("m5.large"))
            .await
            .expect("annotation should succeed");

        assert!(!annotations.contains_key(TAINTS_ANNOTATION));
        assert_eq!(
            annotations.get(LABELS_ANNOTATION).map(String::as_str),
            Some("kubernetes.io/arch=amd64")
        );
    }

    #[tokio::test]
    async fn annotating_twice_is_idempotent() {
        let annotator = annotator_returning(m5_large(), 2);
        let np = node_pool(
            &[("zone", "b"), ("pool", "p1")],
            vec![
                Taint::new("b", "", TaintEffect::NoExecute),
                Taint::new("a", "x", TaintEffect::PreferNoSchedule),
            ],
        );

        let mut once = BTreeMap::new();
        annotator
            .annotate(&np, &mut once, &template("m5.large"))
            .await
            .expect("annotation should succeed");
        let mut twice = once.clone();
        annotator
            .annotate(&np, &mut twice, &template("m5.large"))
            .await
            .expect("annotation should succeed");

        assert_eq!(once, twice);
        assert_eq!(
            once.get(TAINTS_ANNOTATION).map(String::as_str),
            Some("a=x:PreferNoSchedule,b=:NoExecute")
        );
    }

    // =========================================================================
    // Story: native capacity and disabled annotator
    // =========================================================================

    /// Story: once CAPA reports capacity every workaround annotation goes away
    /// and the catalog is not consulted
    #[tokio::test]
    async fn story_native_capacity_wins() {
        let annotator = annotator_returning(m5_large(), 0);
        let mut annotations = workaround_annotations();
        annotations.insert("other".to_string(), "kept".to_string());

        annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template_with_capacity())
            .await
            .expect("annotation should succeed");

        assert_eq!(
            annotations,
            BTreeMap::from([("other".to_string(), "kept".to_string())])
        );
    }

    #[tokio::test]
    async fn native_capacity_cleans_up_without_provider() {
        let annotator = ScaleFromZeroAnnotator::new(None);
        let mut annotations = workaround_annotations();

        annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template_with_capacity())
            .await
            .expect("annotation should succeed");

        assert!(annotations.is_empty());
    }

    #[tokio::test]
    async fn disabled_annotator_leaves_annotations_alone() {
        let annotator = ScaleFromZeroAnnotator::new(None);
        assert!(!annotator.is_enabled());
        let mut annotations = workaround_annotations();

        annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template("m5.large"))
            .await
            .expect("annotation should succeed");

        assert_eq!(annotations, workaround_annotations());
    }

    // =========================================================================
    // Story: failures
    // =========================================================================

    #[tokio::test]
    async fn empty_instance_type_is_invalid_input() {
        let annotator = annotator_returning(m5_large(), 0);
        let mut annotations = BTreeMap::new();

        let err = annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template(""))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(annotations.is_empty());
    }

    #[tokio::test]
    async fn provider_errors_propagate_unchanged() {
        let mut provider = MockInstanceTypeProvider::new();
        provider
            .expect_get_instance_type_info()
            .times(1)
            .returning(|instance_type| {
                Err(Error::not_found_kind(
                    "instance type",
                    format!("instance type {instance_type} not found"),
                ))
            });
        let annotator = ScaleFromZeroAnnotator::new(Some(Arc::new(provider)));
        let mut annotations = BTreeMap::new();

        let err = annotator
            .annotate(&node_pool(&[], vec![]), &mut annotations, &template("m5.large"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::not_found_kind("instance type", "instance type m5.large not found")
        );
        assert!(annotations.is_empty());
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn labels_are_sorted_and_pool_labels_override_arch() {
        let labels = BTreeMap::from([
            ("zone".to_string(), "b".to_string()),
            ("app".to_string(), "web".to_string()),
        ]);
        assert_eq!(
            encode_labels("arm64", &labels),
            "app=web,kubernetes.io/arch=arm64,zone=b"
        );

        let override_arch = BTreeMap::from([(ARCH_LABEL.to_string(), "amd64".to_string())]);
        assert_eq!(encode_labels("arm64", &override_arch), "kubernetes.io/arch=amd64");
    }

    #[test]
    fn taints_round_trip() {
        let taints = vec![
            Taint::new("gpu", "", TaintEffect::NoSchedule),
            Taint::new("dedicated", "infra", TaintEffect::NoExecute),
            Taint::new("spot", "true", TaintEffect::PreferNoSchedule),
        ];
        let encoded = encode_taints(&taints).expect("taints should encode");
        assert_eq!(
            encoded,
            "dedicated=infra:NoExecute,gpu=:NoSchedule,spot=true:PreferNoSchedule"
        );

        let mut decoded = parse_taints_annotation(&encoded).expect("taints should decode");
        let mut expected = taints.clone();
        decoded.sort();
        expected.sort();
        assert_eq!(decoded, expected);
        assert_eq!(encode_taints(&[]), None);
    }

    #[test]
    fn two_field_taints_decode_with_empty_value() {
        assert_eq!(
            parse_taints_annotation("gpu:NoSchedule").expect("taint should decode"),
            vec![Taint::new("gpu", "", TaintEffect::NoSchedule)]
        );
        assert_eq!(parse_taints_annotation("").expect("empty"), Vec::<Taint>::new());
    }

    #[test]
    fn malformed_taints_are_invalid_input() {
        for bad in ["gpu", "=x:NoSchedule", "gpu=x:Sometimes", "a=b:NoSchedule,"] {
            let err = parse_taints_annotation(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidInput { .. }),
                "{bad:?} should be rejected"
            );
        }
    }
}
