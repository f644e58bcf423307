//! The domain event produced by the watcher for every observed state change.

use serde::{Deserialize, Serialize};

/// Kinds that are not scoped to a namespace.
const CLUSTER_SCOPED_KINDS: [&str; 7] = [
    "Namespace",
    "Node",
    "ClusterRole",
    "ClusterRoleBinding",
    "PersistentVolume",
    "StorageClass",
    "CustomResourceDefinition",
];

/// One observed Kubernetes resource state transition.
///
/// Events are immutable once built; handlers only ever see a shared reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatemonitorEvent {
    /// Resource type (e.g., "Pod", "Deployment").
    pub kind: String,
    /// Resource name.
    pub name: String,
    /// Resource namespace, empty for cluster-scoped resources.
    #[serde(default)]
    pub namespace: String,
    /// The action that triggered the event ("create", "update", "delete", ...).
    pub reason: String,
    /// Severity category, usually one of "Normal", "Warning" or "Danger".
    pub status: String,
    /// Pre-rendered diff between the old and new resource state.
    #[serde(default)]
    pub diff_marshalled: String,
}

impl StatemonitorEvent {
    /// Returns the human-readable summary of this event.
    pub fn message(&self) -> String {
        if self.namespace.is_empty() || CLUSTER_SCOPED_KINDS.contains(&self.kind.as_str()) {
            format!(
                "A `{}` `{}` has been `{}`",
                self.kind, self.name, self.reason
            )
        } else {
            format!(
                "A `{}` in namespace `{}` has been `{}`:\n`{}`",
                self.kind, self.namespace, self.reason, self.name
            )
        }
    }

    /// The labelled fields every handler shows, in display order.
    pub fn facts(&self) -> [(&'static str, &str); 5] {
        [
            ("Type", self.kind.as_str()),
            ("Name", self.name.as_str()),
            ("Action", self.reason.as_str()),
            ("Namespace", self.namespace.as_str()),
            ("Status", self.status.as_str()),
        ]
    }

    /// Parses the status string. Unknown statuses yield `None`.
    pub fn severity(&self) -> Option<Status> {
        Status::parse(&self.status)
    }
}

/// The three statuses handlers know how to color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Normal,
    Warning,
    Danger,
}

impl Status {
    /// Exact, case-sensitive match against the wire names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Normal" => Some(Status::Normal),
            "Warning" => Some(Status::Warning),
            "Danger" => Some(Status::Danger),
            _ => None,
        }
    }
}
