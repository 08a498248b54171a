use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type Labels = BTreeMap<String, String>;

/// The parts of a pod the reconciler needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecord {
    pub name: String,
    /// Empty until the pod has been assigned an address
    pub ip: String,
    pub node_name: String,
    pub labels: Labels,
}

impl PodRecord {
    pub fn from_k8s_pod(pod: &Pod) -> Self {
        let metadata = &pod.metadata;

        Self {
            name: metadata.name.clone().unwrap_or_default(),
            ip: pod
                .status
                .as_ref()
                .and_then(|s| s.pod_ip.clone())
                .unwrap_or_default(),
            node_name: pod
                .spec
                .as_ref()
                .and_then(|s| s.node_name.clone())
                .unwrap_or_default(),
            labels: metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Node name to node label set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLabelMap {
    inner: HashMap<String, Labels>,
}

impl NodeLabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_k8s_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        nodes
            .into_iter()
            .filter_map(|node| {
                let name = node.metadata.name.clone()?;
                Some((name, node.metadata.labels.clone().unwrap_or_default()))
            })
            .collect()
    }

    pub fn insert(&mut self, node_name: impl Into<String>, labels: Labels) {
        self.inner.insert(node_name.into(), labels);
    }

    pub fn get(&self, node_name: &str) -> Option<&Labels> {
        self.inner.get(node_name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, Labels)> for NodeLabelMap {
    fn from_iter<I: IntoIterator<Item = (String, Labels)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodSpec, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_pod_record_from_k8s_pod() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("qn-0".to_string()),
                namespace: Some("milvus".to_string()),
                labels: Some(labels(&[("component", "querynode")])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some("node-a".to_string()),
                ..Default::default()
            }),
            status: Some(PodStatus {
                pod_ip: Some("10.0.0.5".to_string()),
                ..Default::default()
            }),
        };

        let record = PodRecord::from_k8s_pod(&pod);
        assert_eq!(record.name, "qn-0");
        assert_eq!(record.ip, "10.0.0.5");
        assert_eq!(record.node_name, "node-a");
        assert_eq!(record.labels.get("component").map(String::as_str), Some("querynode"));
    }

    #[test]
    fn test_pending_pod_has_empty_fields() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("qn-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let record = PodRecord::from_k8s_pod(&pod);
        assert_eq!(record.name, "qn-1");
        assert!(record.ip.is_empty());
        assert!(record.node_name.is_empty());
        assert!(record.labels.is_empty());
    }

    #[test]
    fn test_node_label_map_from_nodes() {
        let nodes = vec![
            Node {
                metadata: ObjectMeta {
                    name: Some("node-a".to_string()),
                    labels: Some(labels(&[("zone", "us-1")])),
                    ..Default::default()
                },
                ..Default::default()
            },
            Node {
                metadata: ObjectMeta {
                    name: Some("node-b".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            Node::default(),
        ];

        let map = NodeLabelMap::from_k8s_nodes(&nodes);
        assert!(!map.is_empty());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("node-a"), Some(&labels(&[("zone", "us-1")])));
        assert_eq!(map.get("node-b"), Some(&Labels::new()));
        assert!(map.get("node-c").is_none());
    }

    #[test]
    fn test_node_label_map_empty() {
        assert!(NodeLabelMap::new().is_empty());
        assert!(NodeLabelMap::from_k8s_nodes(&[Node::default()]).is_empty());
    }
}
