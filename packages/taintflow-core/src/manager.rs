/* Analysis orchestration.
 *
 * The manager partitions reachable methods into units, gives each unit a
 * runner, and alternates parallel drain rounds with sequential event
 * routing: summary edges are published to the shared store and replayed
 * into subscribed runners, cross-unit edges are handed to the runner
 * owning their unit, findings are collected. The fixpoint is reached when
 * every runner is quiescent after a routing pass.
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, info, trace};

use crate::analyzer::{Analyzer, Event, Finding, NullnessAnalyzer, TaintAnalyzer};
use crate::config::TaintConfigProvider;
use crate::error::AnalysisError;
use crate::ifds::edge::{EdgeOf, FactOf};
use crate::ifds::unit::{UnitId, UnitResolver};
use crate::ir::{ApplicationGraph, IrTraits};
use crate::runner::{SharedSummaries, UnitRunner};

type AnalyzerFactory<'a, T> = Box<dyn Fn() -> Box<dyn Analyzer<T> + 'a> + 'a>;

pub struct Manager<'a, T: IrTraits, G> {
    ir: &'a T,
    graph: &'a G,
    unit_resolver: &'a dyn UnitResolver<T::Method>,
    analyzer_factory: AnalyzerFactory<'a, T>,
    runners: Vec<UnitRunner<'a, T, G>>,
    runner_index: FxHashMap<UnitId, usize>,
    summaries: SharedSummaries<T>,
    findings: Vec<Finding<T>>,
}

impl<'a, T, G> Manager<'a, T, G>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
{
    pub fn new(
        ir: &'a T,
        graph: &'a G,
        unit_resolver: &'a dyn UnitResolver<T::Method>,
        analyzer_factory: AnalyzerFactory<'a, T>,
    ) -> Self {
        Self {
            ir,
            graph,
            unit_resolver,
            analyzer_factory,
            runners: Vec::new(),
            runner_index: FxHashMap::default(),
            summaries: Arc::new(DashMap::default()),
            findings: Vec::new(),
        }
    }

    /// Taint analysis over the rules of `config`.
    pub fn taint<C>(
        ir: &'a T,
        graph: &'a G,
        config: &'a C,
        unit_resolver: &'a dyn UnitResolver<T::Method>,
    ) -> Self
    where
        C: TaintConfigProvider<T::Method>,
    {
        Self::new(
            ir,
            graph,
            unit_resolver,
            Box::new(move || Box::new(TaintAnalyzer::new(ir, graph, config))),
        )
    }

    /// Null-dereference analysis; `config` may refine it with cleaner and
    /// source rules.
    pub fn nullness<C>(
        ir: &'a T,
        graph: &'a G,
        config: &'a C,
        unit_resolver: &'a dyn UnitResolver<T::Method>,
    ) -> Self
    where
        C: TaintConfigProvider<T::Method>,
    {
        Self::new(
            ir,
            graph,
            unit_resolver,
            Box::new(move || Box::new(NullnessAnalyzer::new(ir, graph, config))),
        )
    }

    /// Runs the analysis from the seed methods and returns the findings.
    ///
    /// With a timeout, runners stop draining once the deadline passes and
    /// whatever was found until then is returned; without one, the call
    /// ends only at the global fixpoint.
    pub fn analyze(
        &mut self,
        seeds: &[T::Method],
        timeout: Option<Duration>,
    ) -> Result<Vec<Finding<T>>, AnalysisError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        for unit in self.reachable_units(seeds) {
            self.new_runner(unit)?;
        }

        for seed in seeds {
            let unit = self.unit_resolver.resolve(seed);
            if unit == UnitId::Unknown {
                debug!(method = %seed, "seed has no unit, skipped");
                continue;
            }
            let Some(&index) = self.runner_index.get(&unit) else {
                continue;
            };
            let runner = &mut self.runners[index];
            if let Err(err) = runner.add_start(seed) {
                error!(method = %seed, error = %err, "seeding failed");
                runner.poison();
            }
        }

        loop {
            self.runners.par_iter_mut().for_each(|runner| {
                if let Err(err) = runner.drain(deadline) {
                    error!(unit = %runner.unit(), error = %err, "unit analysis aborted");
                }
            });

            let mut events = Vec::new();
            for runner in &mut self.runners {
                events.append(&mut runner.take_events());
            }
            for event in events {
                self.route(event);
            }

            let out_of_time = deadline.is_some_and(|d| Instant::now() >= d);
            if out_of_time || self.runners.iter().all(UnitRunner::is_quiescent) {
                if out_of_time {
                    info!("timeout reached, returning partial results");
                }
                break;
            }
        }

        Ok(std::mem::take(&mut self.findings))
    }

    fn route(&mut self, event: Event<T>) {
        match event {
            Event::NewSummaryEdge { edge } => {
                let method = self.graph.method_of(&edge.from.statement);
                let inserted = self
                    .summaries
                    .entry(method)
                    .or_default()
                    .insert(edge.clone());
                if !inserted {
                    return;
                }
                for runner in &mut self.runners {
                    if let Err(err) = runner.on_summary_edge(&edge) {
                        error!(unit = %runner.unit(), error = %err, "unit analysis aborted");
                    }
                }
            }
            Event::NewFinding { finding } => self.findings.push(finding),
            Event::EdgeForOtherRunner { edge } => {
                let method = self.graph.method_of(&edge.from.statement);
                let unit = self.unit_resolver.resolve(&method);
                if unit == UnitId::Unknown {
                    trace!(method = %method, "edge targets a unit-less method, dropped");
                    return;
                }
                let Some(&index) = self.runner_index.get(&unit) else {
                    trace!(unit = %unit, "no runner for unit, edge dropped");
                    return;
                };
                let runner = &mut self.runners[index];
                if let Err(err) = runner.submit_edge(edge) {
                    error!(unit = %runner.unit(), error = %err, "unit analysis aborted");
                    runner.poison();
                }
            }
        }
    }

    /// Units of all methods reachable from the seeds through analyzable
    /// calls, unit-less methods excluded.
    fn reachable_units(&self, seeds: &[T::Method]) -> Vec<UnitId> {
        let mut units = Vec::new();
        let mut seen_units: FxHashSet<UnitId> = FxHashSet::default();
        let mut visited: FxHashSet<T::Method> = FxHashSet::default();
        let mut queue: VecDeque<T::Method> = seeds.iter().cloned().collect();
        while let Some(method) = queue.pop_front() {
            if !visited.insert(method.clone()) {
                continue;
            }
            let unit = self.unit_resolver.resolve(&method);
            if unit == UnitId::Unknown {
                debug!(method = %method, "method has no unit, excluded");
                continue;
            }
            if seen_units.insert(unit.clone()) {
                units.push(unit);
            }
            for stmt in self.graph.statements_of(&method) {
                for callee in self.graph.callees(&stmt) {
                    if !visited.contains(&callee) {
                        queue.push_back(callee);
                    }
                }
            }
        }
        units
    }

    fn new_runner(&mut self, unit: UnitId) -> Result<(), AnalysisError> {
        if self.runner_index.contains_key(&unit) {
            return Err(AnalysisError::RunnerExists { unit });
        }
        let runner = UnitRunner::new(
            self.ir,
            self.graph,
            (self.analyzer_factory)(),
            self.unit_resolver,
            unit.clone(),
            Arc::clone(&self.summaries),
        );
        self.runner_index.insert(unit, self.runners.len());
        self.runners.push(runner);
        Ok(())
    }

    pub fn path_edge_count(&self, unit: &UnitId) -> Option<usize> {
        self.runner_index
            .get(unit)
            .map(|&index| self.runners[index].path_edge_count())
    }

    pub fn total_path_edges(&self) -> usize {
        self.runners.iter().map(UnitRunner::path_edge_count).sum()
    }

    /// Summary edges published for the method so far.
    pub fn summaries_for(&self, method: &T::Method) -> Vec<EdgeOf<T>> {
        self.summaries
            .get(method)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// How many fixpoints ran for the method entered with the fact.
    pub fn fixpoint_count(&self, method: &T::Method, fact: &FactOf<T>) -> u64 {
        let unit = self.unit_resolver.resolve(method);
        self.runner_index
            .get(&unit)
            .map(|&index| self.runners[index].fixpoint_count(method, fact))
            .unwrap_or(0)
    }
}
