use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use kube::api::{DynamicObject, TypeMeta};
use serde::Serialize;
use serde_json::{Map, Value};

use super::CustomKind;
use crate::crd::PHASE_COMPLETE;
use crate::errors::{ClusterError, ClusterResult};

/// Untyped tenant-scoped custom resource.
///
/// `fields` holds every top-level key other than `apiVersion`, `kind` and
/// `metadata`, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomResourceRecord {
    pub kind: CustomKind,
    pub namespace: String,
    pub name: Option<String>,
    pub generate_name: Option<String>,
    pub fields: Map<String, Value>,
}

impl CustomResourceRecord {
    /// Lower a typed resource into a record, keeping only the identity
    /// metadata.
    pub fn from_resource<K>(resource: &K) -> ClusterResult<Self>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let meta = resource.meta();
        let namespace = meta.namespace.clone().ok_or_else(|| {
            ClusterError::InvalidObject(format!(
                "{} has no namespace",
                K::kind(&())
            ))
        })?;
        let fields = match serde_json::to_value(resource)? {
            Value::Object(mut map) => {
                map.remove("apiVersion");
                map.remove("kind");
                map.remove("metadata");
                if map.get("status").is_some_and(Value::is_null) {
                    map.remove("status");
                }
                map
            }
            other => {
                return Err(ClusterError::InvalidObject(format!(
                    "{} serialized to non-object {other}",
                    K::kind(&())
                )));
            }
        };
        Ok(Self {
            kind: CustomKind::of::<K>(),
            namespace,
            name: meta.name.clone(),
            generate_name: meta.generate_name.clone(),
            fields,
        })
    }

    pub fn from_dynamic(kind: &CustomKind, obj: DynamicObject) -> Self {
        let fields = match obj.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.clone(),
            namespace: obj.metadata.namespace.unwrap_or_default(),
            name: obj.metadata.name,
            generate_name: obj.metadata.generate_name,
            fields,
        }
    }

    pub fn to_dynamic(&self) -> DynamicObject {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: self.kind.api_version(),
                kind: self.kind.kind.clone(),
            }),
            metadata: ObjectMeta {
                name: self.name.clone(),
                generate_name: self.generate_name.clone(),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            data: Value::Object(self.fields.clone()),
        }
    }

    /// `status.phase` as reported by the reconciling controller.
    pub fn phase(&self) -> Option<&str> {
        self.fields
            .get("status")
            .and_then(|s| s.get("phase"))
            .and_then(Value::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.phase()
            .is_some_and(|p| p.eq_ignore_ascii_case(PHASE_COMPLETE))
    }

    pub fn set_phase(&mut self, phase: &str) {
        let status = self
            .fields
            .entry("status")
            .or_insert_with(|| Value::Object(Map::new()));
        if !status.is_object() {
            *status = Value::Object(Map::new());
        }
        if let Value::Object(s) = status {
            s.insert("phase".into(), Value::String(phase.to_string()));
        }
    }
}
