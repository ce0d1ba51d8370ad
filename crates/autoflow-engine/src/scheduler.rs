use std::collections::{BTreeMap, HashMap, VecDeque};

use futures::stream::{FuturesUnordered, StreamExt};
use petgraph::graph::NodeIndex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use autoflow_core::config::JoinMode;
use autoflow_core::types::{ActionContext, NodeExecutionState, NodeProgress, RunId, SkipReason};

use crate::evaluator::{Evaluation, NodeOutcome, OutcomeEvaluator};
use crate::graph::{should_transmit, Node, WorkflowGraph};
use crate::resolver::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Ready,
    Running,
    Settled,
}

/// What the scheduler hands back once nothing is runnable.
#[derive(Debug)]
pub struct ScheduleOutcome {
    /// Final state of every node, keyed by id.
    pub states: HashMap<String, NodeExecutionState>,
    pub cancelled: bool,
}

/// Inputs shared by every node of one run.
pub struct RunScope<'a> {
    pub run_id: &'a RunId,
    pub trigger_extras: &'a BTreeMap<String, String>,
    pub cancel: &'a CancellationToken,
}

/// Drives a run over a validated graph.
///
/// The scheduler is the only writer of slot, counter and state tables.
/// Action futures are polled concurrently, but their completions are applied
/// one at a time from the loop.
pub struct GraphScheduler<'g> {
    graph: &'g WorkflowGraph,
    join_mode: JoinMode,
    max_parallel: usize,
    slots: Vec<Slot>,
    /// Incoming edges not yet signalled.
    pending: Vec<usize>,
    /// Referenced nodes not yet settled. Delays readiness, never arms.
    waiting_refs: Vec<usize>,
    /// Received at least one transmitting edge.
    armed: Vec<bool>,
    /// Has a predecessor that actually executed.
    reached: Vec<bool>,
    ready: VecDeque<NodeIndex>,
    states: HashMap<String, NodeExecutionState>,
}

impl<'g> GraphScheduler<'g> {
    pub fn new(graph: &'g WorkflowGraph, join_mode: JoinMode, max_parallel: usize) -> Self {
        let n = graph.len();
        let pending = graph.node_indices().map(|idx| graph.in_degree(idx)).collect();
        let waiting_refs = graph
            .node_indices()
            .map(|idx| graph.references_of(idx).len())
            .collect();
        Self {
            graph,
            join_mode,
            max_parallel: max_parallel.max(1),
            slots: vec![Slot::Pending; n],
            pending,
            waiting_refs,
            armed: vec![false; n],
            reached: vec![false; n],
            ready: VecDeque::new(),
            states: HashMap::with_capacity(n),
        }
    }

    /// Run until no node is ready or running, or until `scope.cancel` fires.
    pub async fn run<F>(
        mut self,
        evaluator: &OutcomeEvaluator,
        triggers: &[NodeIndex],
        scope: RunScope<'_>,
        on_progress: &mut F,
    ) -> ScheduleOutcome
    where
        F: FnMut(&Node, &NodeProgress),
    {
        let graph = self.graph;
        self.seed(triggers, on_progress);

        let mut in_flight = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            while in_flight.len() < self.max_parallel && !scope.cancel.is_cancelled() {
                let Some(idx) = self.ready.pop_front() else {
                    break;
                };
                let node = graph.node_at(idx);
                self.slots[idx.index()] = Slot::Running;
                on_progress(node, &NodeProgress::Running);

                let predecessors = graph
                    .predecessors(idx)
                    .into_iter()
                    .map(|p| graph.node_at(p).id.as_str())
                    .collect();
                let ctx = RunContext::new(scope.trigger_extras, &self.states)
                    .with_predecessors(predecessors);
                match evaluator.prepare(node, &ctx) {
                    Evaluation::Settled(outcome) => self.complete(idx, outcome, on_progress),
                    Evaluation::Action {
                        action_type,
                        params,
                    } => {
                        debug!(node_id = %node.id, action = %action_type, "Starting action");
                        let action_ctx =
                            ActionContext::new(scope.run_id.clone(), graph.workflow_id(), &node.id)
                                .with_cancel(scope.cancel.clone());
                        let fut = evaluator.run_action(action_type, params, action_ctx);
                        in_flight.push(async move { (idx, fut.await) });
                    }
                }
            }

            if scope.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = scope.cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                Some((idx, outcome)) = in_flight.next() => {
                    self.complete(idx, outcome, on_progress);
                }
            }
        }

        // Dropping pending futures aborts their actions
        drop(in_flight);

        let leftover = if cancelled {
            SkipReason::Cancelled
        } else {
            SkipReason::Unreachable
        };
        for idx in graph.node_indices() {
            if self.slots[idx.index()] != Slot::Settled {
                self.settle(idx, NodeExecutionState::skipped(leftover), on_progress);
            }
        }

        ScheduleOutcome {
            states: self.states,
            cancelled,
        }
    }

    /// Make selected triggers ready and settle everything that can never run.
    fn seed<F>(&mut self, triggers: &[NodeIndex], on_progress: &mut F)
    where
        F: FnMut(&Node, &NodeProgress),
    {
        let graph = self.graph;
        for idx in graph.node_indices() {
            if self.slots[idx.index()] != Slot::Pending {
                continue;
            }
            let node = graph.node_at(idx);
            if node.is_trigger() {
                if triggers.contains(&idx) {
                    self.slots[idx.index()] = Slot::Ready;
                    self.ready.push_back(idx);
                } else {
                    self.skip(idx, SkipReason::TriggerNotSelected, on_progress);
                }
            } else if self.pending[idx.index()] == 0 {
                self.skip(idx, SkipReason::Unreachable, on_progress);
            }
        }
    }

    /// Settle an evaluated node, then gate its outgoing edges.
    fn complete<F>(&mut self, idx: NodeIndex, outcome: NodeOutcome, on_progress: &mut F)
    where
        F: FnMut(&Node, &NodeProgress),
    {
        let signals: Vec<(NodeIndex, bool)> = self
            .graph
            .outgoing_at(idx)
            .map(|(target, edge)| (target, should_transmit(edge.gate, &outcome)))
            .collect();
        self.settle(idx, outcome.into_state(), on_progress);
        self.propagate(signals, true, on_progress);
    }

    /// Settle a node without running it. Its edges signal as non-transmitting.
    fn skip<F>(&mut self, idx: NodeIndex, reason: SkipReason, on_progress: &mut F)
    where
        F: FnMut(&Node, &NodeProgress),
    {
        self.settle(idx, NodeExecutionState::skipped(reason), on_progress);
        let signals = self.graph.outgoing_at(idx).map(|(t, _)| (t, false)).collect();
        self.propagate(signals, false, on_progress);
    }

    fn settle<F>(&mut self, idx: NodeIndex, state: NodeExecutionState, on_progress: &mut F)
    where
        F: FnMut(&Node, &NodeProgress),
    {
        let graph = self.graph;
        let node = graph.node_at(idx);
        self.slots[idx.index()] = Slot::Settled;
        on_progress(node, &NodeProgress::Settled(state.clone()));
        self.states.insert(node.id.clone(), state);

        for &reader in graph.referenced_by(idx) {
            let r = reader.index();
            self.waiting_refs[r] = self.waiting_refs[r].saturating_sub(1);
            if self.slots[r] == Slot::Pending && self.can_start(reader) {
                self.slots[r] = Slot::Ready;
                self.ready.push_back(reader);
            }
        }
    }

    /// Armed, joined according to the join mode, and every referenced node settled.
    fn can_start(&self, idx: NodeIndex) -> bool {
        let i = idx.index();
        let joined = match self.join_mode {
            JoinMode::Any if !self.graph.node_at(idx).joins_all_inputs() => true,
            _ => self.pending[i] == 0,
        };
        self.armed[i] && joined && self.waiting_refs[i] == 0
    }

    /// Deliver edge signals, cascading skips through a worklist.
    fn propagate<F>(&mut self, signals: Vec<(NodeIndex, bool)>, executed: bool, on_progress: &mut F)
    where
        F: FnMut(&Node, &NodeProgress),
    {
        let graph = self.graph;
        let mut work: VecDeque<(NodeIndex, bool, bool)> = signals
            .into_iter()
            .map(|(target, transmits)| (target, transmits, executed))
            .collect();

        while let Some((target, transmits, executed)) = work.pop_front() {
            let t = target.index();
            self.pending[t] = self.pending[t].saturating_sub(1);
            if executed {
                self.reached[t] = true;
            }
            if self.slots[t] != Slot::Pending {
                continue;
            }
            if transmits {
                self.armed[t] = true;
            }

            if self.can_start(target) {
                self.slots[t] = Slot::Ready;
                self.ready.push_back(target);
            } else if self.pending[t] == 0 && !self.armed[t] {
                let reason = if self.reached[t] {
                    SkipReason::GateNotSatisfied
                } else {
                    SkipReason::Unreachable
                };
                self.settle(target, NodeExecutionState::skipped(reason), on_progress);
                work.extend(graph.outgoing_at(target).map(|(next, _)| (next, false, false)));
            }
        }
    }
}
