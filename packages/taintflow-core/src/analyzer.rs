/* Analyzers
 *
 * An analyzer owns the flow-function space of one analysis and inspects
 * every new path edge the runner discovers, turning edges at interesting
 * points into events: summary edges at exit points, findings at sinks,
 * and cross-unit edges at calls that leave the runner's unit.
 */

use std::fmt;

use taintflow_config::{SinkRule, TaintRule};

use crate::config::condition::FactAwareConditionEvaluator;
use crate::config::resolvers::CallPositionResolver;
use crate::config::TaintConfigProvider;
use crate::error::AnalysisError;
use crate::flow::{FlowFunctions, NullnessFlowFunctions, TaintFlowFunctions};
use crate::ifds::edge::{EdgeOf, VertexOf};
use crate::ifds::fact::TaintFact;
use crate::ifds::Edge;
use crate::ir::{ApplicationGraph, IrTraits};

/// What a runner tells its manager about a new path edge.
pub enum Event<T: IrTraits> {
    /// The edge reached an exit point; other units may compose with it.
    NewSummaryEdge { edge: EdgeOf<T> },
    /// A sink was hit.
    NewFinding { finding: Finding<T> },
    /// Seed for the runner owning the callee's unit.
    EdgeForOtherRunner { edge: EdgeOf<T> },
}

impl<T: IrTraits> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NewSummaryEdge { edge } => {
                f.debug_struct("NewSummaryEdge").field("edge", edge).finish()
            }
            Event::NewFinding { finding } => {
                f.debug_struct("NewFinding").field("finding", finding).finish()
            }
            Event::EdgeForOtherRunner { edge } => f
                .debug_struct("EdgeForOtherRunner")
                .field("edge", edge)
                .finish(),
        }
    }
}

/// A reported vulnerability: a marked fact reaching a sink.
pub struct Finding<T: IrTraits> {
    /// Method containing the sink statement.
    pub method: T::Method,
    /// The sink vertex: statement plus the offending fact.
    pub sink: VertexOf<T>,
    pub message: String,
    /// The sink rule that fired; `None` for built-in sinks such as null
    /// dereferences.
    pub rule: Option<SinkRule>,
}

impl<T: IrTraits> Clone for Finding<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            sink: self.sink.clone(),
            message: self.message.clone(),
            rule: self.rule.clone(),
        }
    }
}

impl<T: IrTraits> fmt::Debug for Finding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finding")
            .field("method", &self.method)
            .field("sink", &self.sink)
            .field("message", &self.message)
            .field("rule", &self.rule)
            .finish()
    }
}

/// Analysis-specific behavior plugged into a runner.
pub trait Analyzer<T: IrTraits>: Send {
    fn flow(&self) -> &dyn FlowFunctions<T>;

    /// Inspects a freshly discovered path edge.
    fn handle_new_edge(&self, edge: &EdgeOf<T>) -> Result<Vec<Event<T>>, AnalysisError>;

    /// Reacts to a call into another unit; the returned events seed the
    /// callee's runner.
    fn handle_cross_unit_call(
        &self,
        caller: &VertexOf<T>,
        callee_start: &VertexOf<T>,
    ) -> Result<Vec<Event<T>>, AnalysisError>;
}

fn summary_edge_event<T, G>(graph: &G, edge: &EdgeOf<T>) -> Option<Event<T>>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
{
    let method = graph.method_of(&edge.from.statement);
    if graph.exit_points(&method).contains(&edge.to.statement) {
        Some(Event::NewSummaryEdge { edge: edge.clone() })
    } else {
        None
    }
}

fn cross_unit_seed<T: IrTraits>(callee_start: &VertexOf<T>) -> Vec<Event<T>> {
    vec![Event::EdgeForOtherRunner {
        edge: Edge::entry_loop(callee_start.clone()),
    }]
}

/// Taint analysis: sinks are `MethodSink` rules firing at call sites.
pub struct TaintAnalyzer<'a, T, G, C> {
    ir: &'a T,
    graph: &'a G,
    config: &'a C,
    flow: TaintFlowFunctions<'a, T, G, C>,
}

impl<'a, T, G, C> TaintAnalyzer<'a, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    pub fn new(ir: &'a T, graph: &'a G, config: &'a C) -> Self {
        Self {
            ir,
            graph,
            config,
            flow: TaintFlowFunctions::new(ir, graph, config),
        }
    }
}

impl<T, G, C> Analyzer<T> for TaintAnalyzer<'_, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    fn flow(&self) -> &dyn FlowFunctions<T> {
        &self.flow
    }

    fn handle_new_edge(&self, edge: &EdgeOf<T>) -> Result<Vec<Event<T>>, AnalysisError> {
        let mut events = Vec::new();
        events.extend(summary_edge_event(self.graph, edge));

        let TaintFact::Tainted(fact) = &edge.to.fact else {
            return Ok(events);
        };
        let stmt = &edge.to.statement;
        let Some(call_expr) = self.ir.call_expr(stmt) else {
            return Ok(events);
        };
        let rules = self.config.rules_for(&call_expr.callee);
        if rules.is_empty() {
            return Ok(events);
        }

        let resolver = CallPositionResolver::new(self.ir, stmt)?;
        let conditions = FactAwareConditionEvaluator::new(self.ir, &resolver, fact);
        for rule in &rules {
            let TaintRule::MethodSink(sink) = rule else {
                continue;
            };
            if conditions.evaluate(&sink.condition)? {
                let message = if sink.note.is_empty() {
                    format!("{} mark reaches sink", fact.mark)
                } else {
                    sink.note.clone()
                };
                events.push(Event::NewFinding {
                    finding: Finding {
                        method: self.graph.method_of(stmt),
                        sink: edge.to.clone(),
                        message,
                        rule: Some(sink.clone()),
                    },
                });
            }
        }
        Ok(events)
    }

    fn handle_cross_unit_call(
        &self,
        _caller: &VertexOf<T>,
        callee_start: &VertexOf<T>,
    ) -> Result<Vec<Event<T>>, AnalysisError> {
        Ok(cross_unit_seed(callee_start))
    }
}

/// Nullness analysis: the sink is a dereference of a possibly-null path.
pub struct NullnessAnalyzer<'a, T, G, C> {
    ir: &'a T,
    graph: &'a G,
    flow: NullnessFlowFunctions<'a, T, G, C>,
}

impl<'a, T, G, C> NullnessAnalyzer<'a, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    pub fn new(ir: &'a T, graph: &'a G, config: &'a C) -> Self {
        Self {
            ir,
            graph,
            flow: NullnessFlowFunctions::new(ir, graph, config),
        }
    }
}

impl<T, G, C> Analyzer<T> for NullnessAnalyzer<'_, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    fn flow(&self) -> &dyn FlowFunctions<T> {
        &self.flow
    }

    fn handle_new_edge(&self, edge: &EdgeOf<T>) -> Result<Vec<Event<T>>, AnalysisError> {
        let mut events = Vec::new();
        events.extend(summary_edge_event(self.graph, edge));

        if let TaintFact::Tainted(fact) = &edge.to.fact {
            if fact.is_nullness()
                && self.ir.is_dereferenced_at(&fact.path, &edge.to.statement)
            {
                events.push(Event::NewFinding {
                    finding: Finding {
                        method: self.graph.method_of(&edge.to.statement),
                        sink: edge.to.clone(),
                        message: format!("possible null dereference of {}", fact.path),
                        rule: None,
                    },
                });
            }
        }
        Ok(events)
    }

    fn handle_cross_unit_call(
        &self,
        _caller: &VertexOf<T>,
        callee_start: &VertexOf<T>,
    ) -> Result<Vec<Event<T>>, AnalysisError> {
        Ok(cross_unit_seed(callee_start))
    }
}
