//! Resource quantity arithmetic shared by the fit check and the predictor
//! feature vector.

use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Aggregated resource quantities for a pod request or a node budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceQuantities {
    /// CPU in millicores (1000 = 1 core)
    pub cpu_millicores: i64,
    /// Memory in bytes
    pub memory_bytes: i64,
    /// Pod slots (1 for a pod request, allocatable count for a node)
    pub pods: i64,
}

/// Binary suffixes accepted for memory quantities
const MEMORY_SUFFIXES: [(&str, i64); 3] = [("Ki", 1 << 10), ("Mi", 1 << 20), ("Gi", 1 << 30)];

impl ResourceQuantities {
    /// Parse a CPU quantity into millicores: millicore form ("500m") or
    /// whole/fractional cores ("2", "0.5")
    pub fn parse_cpu(s: &str) -> Result<i64, String> {
        match s.strip_suffix('m') {
            Some(milli) => milli
                .parse::<i64>()
                .map_err(|e| format!("invalid millicore quantity {s:?}: {e}")),
            None => s
                .parse::<f64>()
                .map(|cores| (cores * 1000.0) as i64)
                .map_err(|e| format!("invalid cpu quantity {s:?}: {e}")),
        }
    }

    /// Parse a memory quantity into bytes: plain bytes ("1024") or a
    /// binary suffix ("128Mi", "1Gi")
    pub fn parse_memory(s: &str) -> Result<i64, String> {
        let (number, scale) = MEMORY_SUFFIXES
            .iter()
            .find_map(|(suffix, scale)| s.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((s, 1));
        number
            .parse::<i64>()
            .map(|n| n * scale)
            .map_err(|e| format!("invalid memory quantity {s:?}: {e}"))
    }

    /// Read CPU, memory and pod count from a core/v1 resource map
    pub fn from_resource_map(resources: &BTreeMap<String, Quantity>) -> Self {
        let cpu_millicores = resources
            .get("cpu")
            .and_then(|q| Self::parse_cpu(&q.0).ok())
            .unwrap_or(0);

        let memory_bytes = resources
            .get("memory")
            .and_then(|q| Self::parse_memory(&q.0).ok())
            .unwrap_or(0);

        let pods = resources
            .get("pods")
            .and_then(|q| q.0.parse::<i64>().ok())
            .unwrap_or(0);

        Self {
            cpu_millicores,
            memory_bytes,
            pods,
        }
    }

    /// CPU in whole cores, for the predictor feature vector
    pub fn cpu_cores(&self) -> f64 {
        self.cpu_millicores as f64 / 1000.0
    }

    pub fn add(&mut self, other: &ResourceQuantities) {
        self.cpu_millicores += other.cpu_millicores;
        self.memory_bytes += other.memory_bytes;
        self.pods += other.pods;
    }
}

fn sum_containers(
    pod: &Pod,
    pick: impl Fn(&k8s_openapi::api::core::v1::ResourceRequirements) -> Option<&BTreeMap<String, Quantity>>,
) -> ResourceQuantities {
    let mut total = ResourceQuantities {
        pods: 1,
        ..Default::default()
    };
    let Some(spec) = &pod.spec else {
        return total;
    };
    for container in &spec.containers {
        if let Some(map) = container.resources.as_ref().and_then(&pick) {
            total.add(&ResourceQuantities {
                pods: 0,
                ..ResourceQuantities::from_resource_map(map)
            });
        }
    }
    total
}

/// Total resource requests of a pod (one pod slot plus container sums)
pub fn pod_requests(pod: &Pod) -> ResourceQuantities {
    sum_containers(pod, |r| r.requests.as_ref())
}

/// Total resource limits of a pod
pub fn pod_limits(pod: &Pod) -> ResourceQuantities {
    sum_containers(pod, |r| r.limits.as_ref())
}

/// Allocatable budget of a node; falls back to capacity when allocatable is
/// not reported
pub fn node_allocatable(node: &Node) -> ResourceQuantities {
    let status = node.status.as_ref();
    let map = status
        .and_then(|s| s.allocatable.as_ref())
        .or_else(|| status.and_then(|s| s.capacity.as_ref()));
    map.map(ResourceQuantities::from_resource_map)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec, ResourceRequirements};

    fn quantity_map(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        let mut map = BTreeMap::new();
        map.insert("cpu".to_string(), Quantity(cpu.to_string()));
        map.insert("memory".to_string(), Quantity(memory.to_string()));
        map
    }

    #[test]
    fn test_parse_cpu() {
        for (input, millicores) in [("1", 1000), ("2", 2000), ("0.5", 500), ("100m", 100)] {
            assert_eq!(ResourceQuantities::parse_cpu(input).unwrap(), millicores);
        }
        assert!(ResourceQuantities::parse_cpu("lots").is_err());
        assert!(ResourceQuantities::parse_cpu("1.5m").is_err());
    }

    #[test]
    fn test_parse_memory() {
        for (input, bytes) in [
            ("1024", 1024),
            ("1Ki", 1 << 10),
            ("128Mi", 128 << 20),
            ("1Gi", 1 << 30),
        ] {
            assert_eq!(ResourceQuantities::parse_memory(input).unwrap(), bytes);
        }
        assert!(ResourceQuantities::parse_memory("plenty").is_err());
    }

    #[test]
    fn test_pod_requests_sums_containers() {
        let mut pod = Pod::default();
        pod.spec = Some(PodSpec {
            containers: vec![
                Container {
                    resources: Some(ResourceRequirements {
                        requests: Some(quantity_map("250m", "128Mi")),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Container {
                    resources: Some(ResourceRequirements {
                        requests: Some(quantity_map("1", "1Gi")),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        let total = pod_requests(&pod);
        assert_eq!(total.cpu_millicores, 1250);
        assert_eq!(total.memory_bytes, 128 * 1024 * 1024 + 1024 * 1024 * 1024);
        assert_eq!(total.pods, 1);
    }

    #[test]
    fn test_node_allocatable_falls_back_to_capacity() {
        let mut node = Node::default();
        node.status = Some(Default::default());
        let mut capacity = quantity_map("4", "8Gi");
        capacity.insert("pods".to_string(), Quantity("32".to_string()));
        node.status.as_mut().unwrap().capacity = Some(capacity);

        let budget = node_allocatable(&node);
        assert_eq!(budget.cpu_millicores, 4000);
        assert_eq!(budget.pods, 32);
    }
}
