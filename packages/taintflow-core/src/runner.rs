/* Per-unit tabulation.
 *
 * A runner owns the worklist and path-edge set of one analysis unit and
 * drives the IFDS tabulation over it: sequent edges inside a method,
 * call-to-return edges across opaque calls, and entry/exit composition
 * through summary edges. Calls into other units are not followed; the
 * runner emits an event seeding the other unit's runner and subscribes to
 * that callee's summary edges instead.
 *
 * Path edges are deduplicated on the full (entry vertex, vertex) pair, so
 * a callee entered twice with the same entry fact runs its fixpoint once;
 * later callers compose with the recorded summary edges.
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::analyzer::{Analyzer, Event};
use crate::error::AnalysisError;
use crate::ifds::edge::{Edge, EdgeOf, FactOf, Vertex, VertexOf};
use crate::ifds::unit::{UnitId, UnitResolver};
use crate::ir::{ApplicationGraph, IrTraits};

/// Summary edges published across units, keyed by the callee method.
pub type SharedSummaries<T> =
    Arc<DashMap<<T as IrTraits>::Method, FxHashSet<EdgeOf<T>>>>;

pub struct UnitRunner<'a, T: IrTraits, G> {
    ir: &'a T,
    graph: &'a G,
    analyzer: Box<dyn Analyzer<T> + 'a>,
    unit_resolver: &'a dyn UnitResolver<T::Method>,
    unit: UnitId,
    path_edges: FxHashSet<EdgeOf<T>>,
    worklist: VecDeque<EdgeOf<T>>,
    /// Summary edges of this unit's methods, keyed by entry vertex.
    summary_edges: FxHashMap<VertexOf<T>, FxHashSet<VertexOf<T>>>,
    /// Caller path edges waiting at a callee entry vertex of this unit.
    caller_edges: FxHashMap<VertexOf<T>, FxHashSet<EdgeOf<T>>>,
    /// Cross-unit callees this runner waits on: entry vertex plus the
    /// caller path edge to compose with incoming summary edges.
    subscriptions: FxHashMap<T::Method, FxHashSet<(VertexOf<T>, EdgeOf<T>)>>,
    events: Vec<Event<T>>,
    /// Fixpoint starts per (method, entry fact); dedup keeps each at 1.
    fixpoint_starts: FxHashMap<(T::Method, FactOf<T>), u64>,
    summaries: SharedSummaries<T>,
    poisoned: bool,
}

impl<'a, T, G> UnitRunner<'a, T, G>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
{
    pub fn new(
        ir: &'a T,
        graph: &'a G,
        analyzer: Box<dyn Analyzer<T> + 'a>,
        unit_resolver: &'a dyn UnitResolver<T::Method>,
        unit: UnitId,
        summaries: SharedSummaries<T>,
    ) -> Self {
        Self {
            ir,
            graph,
            analyzer,
            unit_resolver,
            unit,
            path_edges: FxHashSet::default(),
            worklist: VecDeque::new(),
            summary_edges: FxHashMap::default(),
            caller_edges: FxHashMap::default(),
            subscriptions: FxHashMap::default(),
            events: Vec::new(),
            fixpoint_starts: FxHashMap::default(),
            summaries,
            poisoned: false,
        }
    }

    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// Seeds the method's entry vertices with its start facts.
    pub fn add_start(&mut self, method: &T::Method) -> Result<(), AnalysisError> {
        let facts = self.analyzer.flow().start_facts(method)?;
        for entry in self.graph.entry_points(method) {
            for fact in &facts {
                let vertex = Vertex::new(entry.clone(), fact.clone());
                self.seed_entry(method, vertex)?;
            }
        }
        Ok(())
    }

    /// Accepts an edge routed from another runner. Entry self-loops start
    /// a fixpoint; anything else is propagated as-is.
    pub fn submit_edge(&mut self, edge: EdgeOf<T>) -> Result<(), AnalysisError> {
        if edge.from == edge.to {
            let method = self.graph.method_of(&edge.from.statement);
            self.seed_entry(&method, edge.from)
        } else {
            self.propagate(edge).map(|_| ())
        }
    }

    fn seed_entry(
        &mut self,
        method: &T::Method,
        vertex: VertexOf<T>,
    ) -> Result<(), AnalysisError> {
        let fact = vertex.fact.clone();
        if self.propagate(Edge::entry_loop(vertex))? {
            *self
                .fixpoint_starts
                .entry((method.clone(), fact))
                .or_insert(0) += 1;
        }
        Ok(())
    }

    /// Works the worklist down to empty or until the deadline passes.
    /// An error poisons the runner; edges found so far stay valid.
    pub fn drain(&mut self, deadline: Option<Instant>) -> Result<(), AnalysisError> {
        while let Some(edge) = self.worklist.pop_front() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.worklist.push_front(edge);
                debug!(unit = %self.unit, "deadline reached, fixpoint left incomplete");
                return Ok(());
            }
            if let Err(err) = self.step(&edge) {
                self.poisoned = true;
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<Event<T>> {
        std::mem::take(&mut self.events)
    }

    /// Composes a cross-unit summary edge with this runner's subscribed
    /// call sites.
    pub fn on_summary_edge(&mut self, summary: &EdgeOf<T>) -> Result<(), AnalysisError> {
        if self.poisoned {
            return Ok(());
        }
        let method = self.graph.method_of(&summary.from.statement);
        let Some(subscribers) = self.subscriptions.get(&method) else {
            return Ok(());
        };
        let subscribers: Vec<_> = subscribers.iter().cloned().collect();
        for (start_vertex, caller_edge) in subscribers {
            if start_vertex == summary.from {
                if let Err(err) = self.handle_summary_edge(&caller_edge, summary) {
                    self.poisoned = true;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub fn is_quiescent(&self) -> bool {
        self.poisoned || self.worklist.is_empty()
    }

    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    pub fn path_edge_count(&self) -> usize {
        self.path_edges.len()
    }

    pub fn path_edges(&self) -> impl Iterator<Item = &EdgeOf<T>> {
        self.path_edges.iter()
    }

    /// How many fixpoints were started for the entry fact; stays at 1 no
    /// matter how many call sites enter with it.
    pub fn fixpoint_count(&self, method: &T::Method, fact: &FactOf<T>) -> u64 {
        self.fixpoint_starts
            .get(&(method.clone(), fact.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn propagate(&mut self, edge: EdgeOf<T>) -> Result<bool, AnalysisError> {
        let method = self.graph.method_of(&edge.from.statement);
        let edge_unit = self.unit_resolver.resolve(&method);
        if edge_unit != self.unit {
            return Err(AnalysisError::ForeignEdge {
                runner_unit: self.unit.clone(),
                edge_unit,
            });
        }
        if !self.path_edges.insert(edge.clone()) {
            return Ok(false);
        }
        trace!(unit = %self.unit, edge = ?edge, "new path edge");
        let events = self.analyzer.handle_new_edge(&edge)?;
        self.events.extend(events);
        self.worklist.push_back(edge);
        Ok(true)
    }

    fn step(&mut self, edge: &EdgeOf<T>) -> Result<(), AnalysisError> {
        let stmt = edge.to.statement.clone();
        let fact = edge.to.fact.clone();

        if self.ir.call_expr(&stmt).is_some() {
            return self.step_call(edge, &stmt, &fact);
        }

        let method = self.graph.method_of(&stmt);
        if self.graph.exit_points(&method).contains(&stmt) {
            return self.step_exit(edge);
        }

        for next in self.graph.successors(&stmt) {
            let facts = self.analyzer.flow().sequent(&stmt, &next, &fact)?;
            for fact in facts {
                self.propagate(Edge::new(
                    edge.from.clone(),
                    Vertex::new(next.clone(), fact),
                ))?;
            }
        }
        Ok(())
    }

    fn step_call(
        &mut self,
        edge: &EdgeOf<T>,
        call: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<(), AnalysisError> {
        for return_site in self.graph.successors(call) {
            let facts = self.analyzer.flow().call_to_return(call, &return_site, fact)?;
            for fact in facts {
                self.propagate(Edge::new(
                    edge.from.clone(),
                    Vertex::new(return_site.clone(), fact),
                ))?;
            }
        }

        for callee in self.graph.callees(call) {
            let start_facts = self.analyzer.flow().call_to_start(call, &callee, fact)?;
            if start_facts.is_empty() {
                continue;
            }
            let callee_unit = self.unit_resolver.resolve(&callee);
            if callee_unit == UnitId::Unknown {
                trace!(callee = %callee, "callee has no unit, not entered");
                continue;
            }
            let local = callee_unit == self.unit;
            for entry in self.graph.entry_points(&callee) {
                for start_fact in &start_facts {
                    let start_vertex = Vertex::new(entry.clone(), start_fact.clone());
                    if local {
                        self.enter_local_callee(edge, &callee, start_vertex)?;
                    } else {
                        self.enter_external_callee(edge, &callee, start_vertex)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn enter_local_callee(
        &mut self,
        caller_edge: &EdgeOf<T>,
        callee: &T::Method,
        start_vertex: VertexOf<T>,
    ) -> Result<(), AnalysisError> {
        self.caller_edges
            .entry(start_vertex.clone())
            .or_default()
            .insert(caller_edge.clone());
        self.seed_entry(callee, start_vertex.clone())?;

        // Summaries recorded before this caller arrived.
        let ends: Vec<VertexOf<T>> = self
            .summary_edges
            .get(&start_vertex)
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for end in ends {
            let summary = Edge::new(start_vertex.clone(), end);
            self.handle_summary_edge(caller_edge, &summary)?;
        }
        Ok(())
    }

    fn enter_external_callee(
        &mut self,
        caller_edge: &EdgeOf<T>,
        callee: &T::Method,
        start_vertex: VertexOf<T>,
    ) -> Result<(), AnalysisError> {
        let events = self
            .analyzer
            .handle_cross_unit_call(&caller_edge.to, &start_vertex)?;
        self.events.extend(events);
        self.subscriptions
            .entry(callee.clone())
            .or_default()
            .insert((start_vertex.clone(), caller_edge.clone()));

        // Summaries the other unit already published.
        let summaries = Arc::clone(&self.summaries);
        let published: Vec<EdgeOf<T>> = summaries
            .get(callee)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|summary| summary.from == start_vertex)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for summary in published {
            self.handle_summary_edge(caller_edge, &summary)?;
        }
        Ok(())
    }

    fn step_exit(&mut self, edge: &EdgeOf<T>) -> Result<(), AnalysisError> {
        self.summary_edges
            .entry(edge.from.clone())
            .or_default()
            .insert(edge.to.clone());

        let callers: Vec<EdgeOf<T>> = self
            .caller_edges
            .get(&edge.from)
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for caller_edge in callers {
            self.handle_summary_edge(&caller_edge, edge)?;
        }
        Ok(())
    }

    fn handle_summary_edge(
        &mut self,
        caller_edge: &EdgeOf<T>,
        summary: &EdgeOf<T>,
    ) -> Result<(), AnalysisError> {
        let call = caller_edge.to.statement.clone();
        for return_site in self.graph.successors(&call) {
            let facts = self.analyzer.flow().exit_to_return(
                &call,
                &return_site,
                &summary.to.statement,
                &summary.to.fact,
            )?;
            for fact in facts {
                self.propagate(Edge::new(
                    caller_edge.from.clone(),
                    Vertex::new(return_site.clone(), fact),
                ))?;
            }
        }
        Ok(())
    }
}
