//! In-memory cluster model the demo levels operate on.
//!
//! Start and stop requests are applied by a background job after a short
//! delay, the way a real cluster acknowledges a transition some time after
//! the request was accepted. Each job fires a completion handle when done.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use clush_core::{CompletionSignal, completion_channel};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub agent: String,
    pub node: String,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Online,
    Standby,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Online => f.write_str("online"),
            NodeState::Standby => f.write_str("standby"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ClusterState {
    pub nodes: BTreeMap<String, NodeState>,
    pub resources: BTreeMap<String, Resource>,
    pub properties: BTreeMap<String, String>,
}

/// Shared handle to the cluster state, stored as a context extension.
#[derive(Debug, Clone)]
pub struct Cluster {
    state: Arc<Mutex<ClusterState>>,
    latency: Duration,
}

impl Cluster {
    pub fn new(state: ClusterState, latency: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            latency,
        }
    }

    /// Two nodes and a handful of resources.
    pub fn demo(latency: Duration) -> Self {
        let mut state = ClusterState::default();
        for node in ["node1", "node2"] {
            state.nodes.insert(node.to_string(), NodeState::Online);
        }
        for (name, agent, node, running) in [
            ("vip", "ocf:heartbeat:IPaddr2", "node1", true),
            ("web", "ocf:heartbeat:apache", "node1", true),
            ("db", "ocf:heartbeat:pgsql", "node2", false),
        ] {
            state.resources.insert(
                name.to_string(),
                Resource {
                    agent: agent.to_string(),
                    node: node.to_string(),
                    running,
                },
            );
        }
        state
            .properties
            .insert("stonith-enabled".into(), "true".into());
        Self::new(state, latency)
    }

    pub fn lock(&self) -> MutexGuard<'_, ClusterState> {
        // A poisoned lock only means a job panicked mid-update; the maps are
        // still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn resource_names(&self) -> Vec<String> {
        self.lock().resources.keys().cloned().collect()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.lock().nodes.keys().cloned().collect()
    }

    /// Request a resource state change. The change is applied by a background
    /// job; the returned signal fires when it has been.
    pub fn set_running(&self, name: &str, running: bool) -> Option<CompletionSignal> {
        if !self.lock().resources.contains_key(name) {
            return None;
        }
        let (handle, signal) = completion_channel();
        let state = Arc::clone(&self.state);
        let latency = self.latency;
        let name = name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let applied = {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                let ClusterState {
                    nodes, resources, ..
                } = &mut *state;
                match resources.get_mut(&name) {
                    Some(rsc) if running && nodes.get(&rsc.node) == Some(&NodeState::Standby) => {
                        Err(format!("{name}: its node is in standby"))
                    }
                    Some(rsc) => {
                        rsc.running = running;
                        Ok(())
                    }
                    None => Err(format!("{name} disappeared")),
                }
            };
            match applied {
                Ok(()) => {
                    debug!(resource = %name, running, "Resource transition applied");
                    handle.complete();
                }
                Err(message) => handle.fail(message),
            }
        });
        Some(signal)
    }

    /// Apply property changes in a background job.
    pub fn apply_properties(&self, changes: Vec<(String, String)>) -> CompletionSignal {
        let (handle, signal) = completion_channel();
        let state = Arc::clone(&self.state);
        let latency = self.latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                state.properties.extend(changes);
            }
            handle.complete();
        });
        signal
    }
}
