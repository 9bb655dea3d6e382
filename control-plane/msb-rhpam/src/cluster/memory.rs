//! In-process [`ClusterClient`] for tests and the `memory` backend.
//!
//! Follows API-server semantics closely enough for the pipelines: names are
//! unique per kind and namespace, `generateName` gets a suffix, namespaced
//! creates need a live namespace, and deleting a namespace removes its
//! contents (immediately, or later when deletion is held).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::{
    ClusterClient, CustomKind, CustomResourceRecord, DesiredObject,
    ResourceKind,
};
use crate::errors::{ClusterError, ClusterResult};

/// Most recent calls kept in the journal; older entries are dropped.
pub const JOURNAL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Exists,
    List,
    Delete,
}

/// Failure injected in place of a call's normal outcome.
#[derive(Debug, Clone)]
pub enum Fault {
    Api { code: u16, reason: String },
    Transport(String),
    /// Sleep before serving the call normally.
    Delay(Duration),
}

impl Fault {
    pub fn api(code: u16, reason: &str) -> Self {
        Fault::Api {
            code,
            reason: reason.to_string(),
        }
    }

    pub fn transport(message: &str) -> Self {
        Fault::Transport(message.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
    pub succeeded: bool,
}

type Key = (ResourceKind, String, String);

struct Stored {
    seq: u64,
    object: DesiredObject,
}

struct FaultRule {
    verb: Verb,
    kind: ResourceKind,
    fault: Fault,
    remaining: u32,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Stored>,
    terminating: BTreeSet<String>,
    hold_namespace_deletion: bool,
    faults: Vec<FaultRule>,
    journal: VecDeque<JournalEntry>,
    seq: u64,
}

impl State {
    fn take_fault(&mut self, verb: Verb, kind: &ResourceKind) -> Option<Fault> {
        let rule = self
            .faults
            .iter_mut()
            .find(|r| r.verb == verb && &r.kind == kind && r.remaining > 0)?;
        rule.remaining -= 1;
        Some(rule.fault.clone())
    }

    fn record(
        &mut self,
        verb: Verb,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
        succeeded: bool,
    ) {
        if self.journal.len() >= JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        self.journal.push_back(JournalEntry {
            verb,
            kind: kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            succeeded,
        });
    }

    fn namespace_live(&self, ns: &str) -> Result<(), ClusterError> {
        let key = ns_key(ns);
        if !self.objects.contains_key(&key) {
            return Err(ClusterError::not_found(&ResourceKind::Namespace, ns));
        }
        if self.terminating.contains(ns) {
            return Err(ClusterError::Api {
                code: 403,
                reason: "Forbidden".into(),
                message: format!(
                    "unable to create new content in namespace {ns} because it is being terminated"
                ),
            });
        }
        Ok(())
    }

    fn insert(&mut self, object: &DesiredObject) -> ClusterResult<String> {
        let kind = object.kind();
        let namespace = object.namespace();
        if !kind.is_cluster_scoped() {
            let ns = namespace.ok_or_else(|| {
                ClusterError::InvalidObject(format!(
                    "{kind} requires a namespace"
                ))
            })?;
            self.namespace_live(ns)?;
        }
        let name = match (object.name(), object.generate_name()) {
            (Some(n), _) => n.to_string(),
            (None, Some(prefix)) => format!("{prefix}{:05x}", self.seq + 1),
            (None, None) => {
                return Err(ClusterError::InvalidObject(format!(
                    "{kind} has neither name nor generateName"
                )));
            }
        };
        let key = key_for(&kind, namespace, &name);
        if self.objects.contains_key(&key) {
            return Err(ClusterError::already_exists(&kind, &name));
        }
        let mut stored = object.clone();
        stored.assign_name(&name);
        self.seq += 1;
        let seq = self.seq;
        self.objects.insert(key, Stored { seq, object: stored });
        Ok(name)
    }

    fn purge_namespace(&mut self, ns: &str) {
        self.objects
            .retain(|(kind, obj_ns, name), _| match kind {
                ResourceKind::Namespace => name != ns,
                k if k.is_cluster_scoped() => true,
                _ => obj_ns != ns,
            });
        self.terminating.remove(ns);
    }
}

fn ns_key(ns: &str) -> Key {
    (ResourceKind::Namespace, String::new(), ns.to_string())
}

fn key_for(kind: &ResourceKind, namespace: Option<&str>, name: &str) -> Key {
    let ns = if kind.is_cluster_scoped() {
        String::new()
    } else {
        namespace.unwrap_or_default().to_string()
    };
    (kind.clone(), ns, name.to_string())
}

/// Injected API failures classify the way real API server answers do.
fn fault_error(fault: Fault, kind: &ResourceKind, name: &str) -> Option<ClusterError> {
    match fault {
        Fault::Api { code: 404, .. } => Some(ClusterError::not_found(kind, name)),
        Fault::Api { code: 409, reason } if reason == "AlreadyExists" => {
            Some(ClusterError::already_exists(kind, name))
        }
        Fault::Api { code, reason } => Some(ClusterError::Api {
            code,
            message: format!("injected {reason}"),
            reason,
        }),
        Fault::Transport(msg) => Some(ClusterError::Transport(msg)),
        Fault::Delay(_) => None,
    }
}

#[derive(Clone, Default)]
pub struct MemoryClusterClient {
    state: Arc<RwLock<State>>,
}

impl MemoryClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` matching calls fail (or stall) with `fault`.
    pub async fn inject_fault(
        &self,
        verb: Verb,
        kind: ResourceKind,
        fault: Fault,
        times: u32,
    ) {
        self.state.write().await.faults.push(FaultRule {
            verb,
            kind,
            fault,
            remaining: times,
        });
    }

    /// While held, deleted namespaces stay visible as terminating.
    pub async fn hold_namespace_deletion(&self, hold: bool) {
        self.state.write().await.hold_namespace_deletion = hold;
    }

    /// Complete a held namespace deletion, removing everything inside it.
    pub async fn finish_namespace_deletion(&self, namespace: &str) {
        let mut st = self.state.write().await;
        if st.terminating.contains(namespace) {
            st.purge_namespace(namespace);
        }
    }

    pub async fn is_terminating(&self, namespace: &str) -> bool {
        self.state.read().await.terminating.contains(namespace)
    }

    /// Play the reconciling controller: set `status.phase` on a record.
    pub async fn set_phase(
        &self,
        kind: &CustomKind,
        namespace: &str,
        name: &str,
        phase: &str,
    ) -> bool {
        let key = key_for(&ResourceKind::Custom(kind.clone()), Some(namespace), name);
        let mut st = self.state.write().await;
        match st.objects.get_mut(&key) {
            Some(Stored {
                object: DesiredObject::Custom(rec),
                ..
            }) => {
                rec.set_phase(phase);
                true
            }
            _ => false,
        }
    }

    pub async fn get(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<DesiredObject> {
        let st = self.state.read().await;
        st.objects
            .get(&key_for(kind, namespace, name))
            .map(|s| s.object.clone())
    }

    /// Stored objects in creation order.
    pub async fn objects(&self) -> Vec<DesiredObject> {
        let st = self.state.read().await;
        let mut all: Vec<&Stored> = st.objects.values().collect();
        all.sort_by_key(|s| s.seq);
        all.into_iter().map(|s| s.object.clone()).collect()
    }

    /// Recorded calls, oldest first.
    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.state.read().await.journal.iter().cloned().collect()
    }

    pub async fn calls(&self, verb: Verb) -> usize {
        self.state
            .read()
            .await
            .journal
            .iter()
            .filter(|e| e.verb == verb)
            .count()
    }

    /// Consume a pending fault. Delays are slept off without the lock held.
    async fn check_fault(
        &self,
        verb: Verb,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<()> {
        let fault = {
            let mut st = self.state.write().await;
            let fault = st.take_fault(verb, kind);
            if let Some(f) = &fault {
                if !matches!(f, Fault::Delay(_)) {
                    st.record(verb, kind, namespace, name, false);
                }
            }
            fault
        };
        match fault {
            None => Ok(()),
            Some(Fault::Delay(d)) => {
                trace!(?verb, %kind, name, delay_ms = d.as_millis() as u64, "injected delay");
                tokio::time::sleep(d).await;
                Ok(())
            }
            Some(f) => match fault_error(f, kind, name) {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }
}

#[async_trait]
impl ClusterClient for MemoryClusterClient {
    async fn create(&self, object: &DesiredObject) -> ClusterResult<String> {
        let kind = object.kind();
        let namespace = object.namespace().map(str::to_string);
        let requested = object.display_name();
        self.check_fault(Verb::Create, &kind, namespace.as_deref(), &requested)
            .await?;

        let mut st = self.state.write().await;
        let result = st.insert(object);

        let logged = result.as_deref().unwrap_or(requested.as_str()).to_string();
        st.record(
            Verb::Create,
            &kind,
            namespace.as_deref(),
            &logged,
            result.is_ok(),
        );
        if let Ok(name) = &result {
            debug!(%kind, %name, "memory: created");
        }
        result
    }

    async fn exists(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<bool> {
        self.check_fault(Verb::Exists, kind, namespace, name).await?;
        let mut st = self.state.write().await;
        let found = st.objects.contains_key(&key_for(kind, namespace, name));
        st.record(Verb::Exists, kind, namespace, name, true);
        Ok(found)
    }

    async fn list_custom(
        &self,
        kind: &CustomKind,
        namespace: &str,
    ) -> ClusterResult<Vec<CustomResourceRecord>> {
        let rk = ResourceKind::Custom(kind.clone());
        self.check_fault(Verb::List, &rk, Some(namespace), "").await?;
        let mut st = self.state.write().await;
        let mut found: Vec<&Stored> = st
            .objects
            .iter()
            .filter(|((k, ns, _), _)| k == &rk && ns == namespace)
            .map(|(_, s)| s)
            .collect();
        found.sort_by_key(|s| s.seq);
        let records: Vec<CustomResourceRecord> = found
            .into_iter()
            .filter_map(|s| match &s.object {
                DesiredObject::Custom(rec) => Some(rec.clone()),
                _ => None,
            })
            .collect();
        st.record(Verb::List, &rk, Some(namespace), "", true);
        Ok(records)
    }

    async fn delete(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<()> {
        self.check_fault(Verb::Delete, kind, namespace, name).await?;
        let mut st = self.state.write().await;
        let key = key_for(kind, namespace, name);
        let result = if !st.objects.contains_key(&key) {
            Err(ClusterError::not_found(kind, name))
        } else if *kind == ResourceKind::Namespace {
            if st.hold_namespace_deletion {
                st.terminating.insert(name.to_string());
            } else {
                st.purge_namespace(name);
            }
            Ok(())
        } else {
            st.objects.remove(&key);
            Ok(())
        };
        st.record(Verb::Delete, kind, namespace, name, result.is_ok());
        result
    }
}
