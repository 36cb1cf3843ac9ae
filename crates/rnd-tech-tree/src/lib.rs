//! Technology state machine for the research economy.
//!
//! Tracks per-node unlock status and pays for unlocks out of the science
//! ledger.
//!
//! # Overview
//!
//! Nodes are registered at load time via [`TechTree::register`], each after
//! its prerequisites, so the registration order is a topological order and
//! a cyclic prerequisite graph cannot be represented. Every node is in one
//! of three [`TechState`]s:
//!
//! - **Locked**: at least one prerequisite is not yet researched.
//! - **Available**: every prerequisite is researched; the node can be bought.
//! - **Researched**: the node's cost was paid.
//!
//! [`TechTree::unlock`] moves a node from Available to Researched, debiting
//! the ledger in the same step, and then re-derives availability so every
//! dependent whose last outstanding prerequisite was this node becomes
//! Available. Availability is derived, never stored independently of the
//! researched set, which is what makes [`TechTree::refresh_availability`]
//! idempotent.

use rnd_core::id::{PartId, TechId};
use rnd_core::ledger::{CurrencyLedger, TransactionReason, can_afford};
use rnd_core::mode::GameMode;
use rnd_core::parts::{AvailablePart, PartCatalog};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

// ---------------------------------------------------------------------------
// Node definition
// ---------------------------------------------------------------------------

/// A technology tree entry. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechNode {
    pub id: TechId,

    /// Human-readable name.
    pub title: String,

    pub description: String,

    /// Science cost paid on unlock.
    pub cost: f64,

    /// Nodes that must all be researched before this one becomes available.
    pub prerequisites: Vec<TechId>,
}

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Unlock status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TechState {
    #[default]
    Locked,
    Available,
    Researched,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the tech tree for the host's UI and contract systems.
#[derive(Debug, Clone, PartialEq)]
pub enum TechEvent {
    /// A node's last outstanding prerequisite was researched.
    NodeAvailable { node: TechId },

    /// A node was bought.
    NodeResearched { node: TechId, cost: f64 },

    /// A node was forced back to Locked by an administrative reset.
    NodeReset { node: TechId },

    /// The host should redraw its tech tree.
    RefreshRequested,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while registering nodes.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("duplicate tech node id: {0}")]
    DuplicateNode(TechId),

    #[error("prerequisite {prereq} for tech node {node} does not exist")]
    InvalidPrerequisite { node: TechId, prereq: TechId },

    #[error("tech node {node} has an invalid cost ({cost})")]
    InvalidCost { node: TechId, cost: f64 },
}

/// Why an unlock was rejected. A rejected unlock leaves all state unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnlockError {
    #[error("tech node {0} does not exist")]
    UnknownNode(TechId),

    #[error("tech node {0} is already researched")]
    AlreadyResearched(TechId),

    #[error("tech node {node} has unmet prerequisites: {missing:?}")]
    PrereqsUnmet { node: TechId, missing: Vec<TechId> },

    #[error("tech node {node} costs {cost}, balance is {balance}")]
    InsufficientFunds { node: TechId, cost: f64, balance: f64 },
}

/// A successful unlock.
#[derive(Debug, Clone, PartialEq)]
pub struct Unlocked {
    pub node: TechId,
    /// Amount debited from the ledger (zero when science is disabled).
    pub cost_paid: f64,
    /// Dependents that became available as a result.
    pub newly_available: Vec<TechId>,
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// Node definitions plus their runtime state.
#[derive(Debug, Clone, Default)]
pub struct TechTree {
    nodes: HashMap<TechId, TechNode>,

    /// Registration order. Prerequisites always precede their dependents.
    order: Vec<TechId>,

    states: HashMap<TechId, TechState>,

    /// Reverse prerequisite edges.
    dependents: HashMap<TechId, Vec<TechId>>,

    /// Events emitted since last drain.
    events: Vec<TechEvent>,
}

impl TechTree {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration API --

    /// Register a node. Its prerequisites must already be registered.
    pub fn register(&mut self, node: TechNode) -> Result<(), TreeError> {
        let id = node.id.clone();

        if self.nodes.contains_key(&id) {
            return Err(TreeError::DuplicateNode(id));
        }
        if !(node.cost >= 0.0 && node.cost.is_finite()) {
            return Err(TreeError::InvalidCost { node: id, cost: node.cost });
        }
        for prereq in &node.prerequisites {
            if !self.nodes.contains_key(prereq) {
                return Err(TreeError::InvalidPrerequisite {
                    node: id,
                    prereq: prereq.clone(),
                });
            }
        }

        for prereq in &node.prerequisites {
            self.dependents
                .entry(prereq.clone())
                .or_default()
                .push(id.clone());
        }
        let state = if self.all_researched(&node.prerequisites) {
            TechState::Available
        } else {
            TechState::Locked
        };
        self.states.insert(id.clone(), state);
        self.order.push(id.clone());
        self.nodes.insert(id, node);
        Ok(())
    }

    // -- Query API --

    pub fn node(&self, id: &str) -> Option<&TechNode> {
        self.nodes.get(id)
    }

    /// Unknown nodes are Locked.
    pub fn state(&self, id: &str) -> TechState {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// Node title, empty for unknown nodes.
    pub fn title(&self, id: &str) -> &str {
        self.nodes.get(id).map(|n| n.title.as_str()).unwrap_or("")
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TechNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_researched(&self, id: &str) -> bool {
        self.state(id) == TechState::Researched
    }

    /// Prerequisites of `id` that are not yet researched.
    pub fn missing_prerequisites(&self, id: &str) -> Vec<TechId> {
        self.nodes
            .get(id)
            .map(|n| {
                n.prerequisites
                    .iter()
                    .filter(|p| !self.is_researched(p.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the part's tech node is researched. Parts that need no
    /// research are always available.
    pub fn part_tech_available(&self, part: &AvailablePart) -> bool {
        match &part.tech_required {
            Some(tech) => self.is_researched(tech.as_str()),
            None => true,
        }
    }

    /// True when every objective tag is provided by at least one part whose
    /// tech is researched.
    pub fn researched_valid_contract_objectives(
        &self,
        objectives: &[String],
        parts: &PartCatalog,
    ) -> bool {
        objectives.iter().all(|objective| {
            parts.iter().any(|part| {
                part.contract_objectives.iter().any(|o| o == objective)
                    && self.part_tech_available(part)
            })
        })
    }

    // -- Unlock --

    /// Research a node: Available to Researched, paying its cost.
    ///
    /// The affordability check, debit, and state change happen together;
    /// on any rejection nothing is changed.
    pub fn unlock(
        &mut self,
        id: &str,
        ledger: &mut dyn CurrencyLedger,
        mode: GameMode,
    ) -> Result<Unlocked, UnlockError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| UnlockError::UnknownNode(TechId::from(id)))?;

        if self.state(id) == TechState::Researched {
            return Err(UnlockError::AlreadyResearched(node.id.clone()));
        }
        let missing = self.missing_prerequisites(id);
        if !missing.is_empty() {
            return Err(UnlockError::PrereqsUnmet {
                node: node.id.clone(),
                missing,
            });
        }
        let balance = ledger.balance();
        if !can_afford(balance, node.cost, mode) {
            return Err(UnlockError::InsufficientFunds {
                node: node.id.clone(),
                cost: node.cost,
                balance,
            });
        }

        let node_id = node.id.clone();
        let cost_paid = if mode.science_enabled() { node.cost } else { 0.0 };
        // Committed before the debit: a ledger that calls back in must see
        // the node as Researched.
        self.states.insert(node_id.clone(), TechState::Researched);
        self.events.push(TechEvent::NodeResearched {
            node: node_id.clone(),
            cost: cost_paid,
        });
        let newly_available = self.refresh_availability();
        if cost_paid > 0.0 {
            ledger.debit(cost_paid, TransactionReason::TechResearch);
        }
        tracing::info!(target: "rnd", node = %node_id, cost = cost_paid, "tech researched");

        Ok(Unlocked {
            node: node_id,
            cost_paid,
            newly_available,
        })
    }

    /// Re-derive Locked/Available for every node that is not researched.
    /// Returns the nodes that became available. Running it again without
    /// any intervening change returns nothing and changes nothing.
    pub fn refresh_availability(&mut self) -> Vec<TechId> {
        let mut newly_available = Vec::new();
        for id in &self.order {
            let current = self.states.get(id).copied().unwrap_or_default();
            if current == TechState::Researched {
                continue;
            }
            let prerequisites = self
                .nodes
                .get(id)
                .map(|n| n.prerequisites.as_slice())
                .unwrap_or_default();
            let derived = if self.all_researched(prerequisites) {
                TechState::Available
            } else {
                TechState::Locked
            };
            if derived != current {
                if derived == TechState::Available {
                    newly_available.push(id.clone());
                }
                self.states.insert(id.clone(), derived);
            }
        }
        for node in &newly_available {
            self.events
                .push(TechEvent::NodeAvailable { node: node.clone() });
        }
        newly_available
    }

    // -- Administrative reset --

    /// Force a node and everything downstream of it back to Locked, then
    /// re-derive availability. Returns the nodes that lost their research.
    /// The reset node itself becomes Available again if its own
    /// prerequisites are still researched.
    pub fn reset_node(&mut self, id: &str) -> Vec<TechId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut affected = vec![node.id.clone()];
        let mut seen: HashSet<TechId> = affected.iter().cloned().collect();
        let mut queue: VecDeque<TechId> = affected.iter().cloned().collect();
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents.get(&current).into_iter().flatten() {
                if seen.insert(dependent.clone()) {
                    affected.push(dependent.clone());
                    queue.push_back(dependent.clone());
                }
            }
        }

        let mut reset = Vec::new();
        for node in affected {
            if self.states.insert(node.clone(), TechState::Locked) == Some(TechState::Researched) {
                self.events.push(TechEvent::NodeReset { node: node.clone() });
                reset.push(node);
            }
        }
        tracing::info!(target: "rnd", node = id, reset = reset.len(), "tech node reset");
        self.refresh_availability();
        reset
    }

    /// Forget all research.
    pub fn reset_all(&mut self) {
        for state in self.states.values_mut() {
            *state = TechState::Locked;
        }
        self.refresh_availability();
        self.events.clear();
    }

    /// Ask the host to redraw its tech tree.
    pub fn request_refresh(&mut self) {
        self.events.push(TechEvent::RefreshRequested);
    }

    // -- Persistence --

    /// State of every node, keyed by id.
    pub fn records(&self) -> BTreeMap<String, TechState> {
        self.order
            .iter()
            .map(|id| (id.to_string(), self.state(id.as_str())))
            .collect()
    }

    /// Restore node states. Researched nodes are taken verbatim; missing
    /// keys mean Locked, and availability is re-derived afterwards.
    pub fn restore(&mut self, records: &BTreeMap<String, TechState>) {
        for id in &self.order {
            let state = records.get(id.as_str()).copied().unwrap_or_default();
            self.states.insert(id.clone(), state);
        }
        for (id, state) in records {
            if !self.nodes.contains_key(id.as_str()) {
                tracing::warn!(target: "rnd", node = %id, "ignoring state for unknown tech node");
            } else if *state == TechState::Researched {
                let missing = self.missing_prerequisites(id);
                if !missing.is_empty() {
                    tracing::warn!(target: "rnd", node = %id, ?missing, "restored research with unmet prerequisites");
                }
            }
        }
        self.refresh_availability();
        self.events.clear();
    }

    // -- Event API --

    /// Drain all pending events. Returns events and clears the internal list.
    pub fn drain_events(&mut self) -> Vec<TechEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get a read-only view of pending events.
    pub fn pending_events(&self) -> &[TechEvent] {
        &self.events
    }

    // -- Internal helpers --

    fn all_researched(&self, ids: &[TechId]) -> bool {
        ids.iter().all(|p| self.is_researched(p.as_str()))
    }
}

/// Parts grouped by the tech node that unlocks them, in tree order.
/// Parts with no (or an unknown) node are collected under `None`.
pub fn parts_by_node<'a>(
    tree: &TechTree,
    parts: &'a PartCatalog,
) -> (Vec<(TechId, Vec<&'a PartId>)>, Vec<&'a PartId>) {
    let mut assigned: Vec<(TechId, Vec<&PartId>)> =
        tree.iter().map(|n| (n.id.clone(), Vec::new())).collect();
    let mut unassigned = Vec::new();
    for part in parts.iter() {
        let slot = part
            .tech_required
            .as_ref()
            .and_then(|t| assigned.iter_mut().find(|(id, _)| id == t));
        match slot {
            Some((_, list)) => list.push(&part.id),
            None => unassigned.push(&part.id),
        }
    }
    (assigned, unassigned)
}

// ===========================================================================
// Tests
// ===========================================================================
