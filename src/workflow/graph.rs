//! graph.rs
//!
//! Directed graph of named stages. A stage reads the shared state and
//! returns a partial update; the engine merges it, records the visit and
//! follows the stage's edge.

use std::collections::HashMap;

use crate::logger::RunLog;
use crate::state::{StateUpdate, WorkflowState};

/// Hard ceiling on stage executions per run.
pub const DEFAULT_MAX_STEPS: usize = 256;

pub type StageFn<'a> = Box<dyn Fn(&WorkflowState, &mut RunLog) -> StateUpdate + 'a>;
pub type RouteFn<'a> = Box<dyn Fn(&WorkflowState) -> &'static str + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stage(&'static str),
    End,
}

pub enum Edge<'a> {
    Always(Target),
    /// The route names an outcome; `targets` maps outcomes to successors.
    Branch {
        route: RouteFn<'a>,
        targets: HashMap<&'static str, Target>,
    },
}

pub struct Graph<'a> {
    stages: HashMap<&'static str, StageFn<'a>>,
    edges: HashMap<&'static str, Edge<'a>>,
    entry: Option<&'static str>,
    max_steps: usize,
}

impl<'a> Graph<'a> {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn stage(
        mut self,
        name: &'static str,
        f: impl Fn(&WorkflowState, &mut RunLog) -> StateUpdate + 'a,
    ) -> Self {
        self.stages.insert(name, Box::new(f));
        self
    }

    pub fn edge(mut self, from: &'static str, to: Target) -> Self {
        self.edges.insert(from, Edge::Always(to));
        self
    }

    pub fn branch(
        mut self,
        from: &'static str,
        route: impl Fn(&WorkflowState) -> &'static str + 'a,
        targets: &[(&'static str, Target)],
    ) -> Self {
        self.edges.insert(
            from,
            Edge::Branch {
                route: Box::new(route),
                targets: targets.iter().copied().collect(),
            },
        );
        self
    }

    pub fn entry(mut self, name: &'static str) -> Self {
        self.entry = Some(name);
        self
    }

    pub fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    /// Every stage has an edge and every edge points at a known stage.
    pub fn validate(&self) -> Result<(), String> {
        let entry = self.entry.ok_or("graph has no entry stage")?;
        if !self.stages.contains_key(entry) {
            return Err(format!("entry stage `{entry}` is not defined"));
        }

        for name in self.stages.keys() {
            if !self.edges.contains_key(name) {
                return Err(format!("stage `{name}` has no outgoing edge"));
            }
        }

        for (from, edge) in &self.edges {
            if !self.stages.contains_key(from) {
                return Err(format!("edge from unknown stage `{from}`"));
            }

            let targets: Vec<Target> = match edge {
                Edge::Always(t) => vec![*t],
                Edge::Branch { targets, .. } => targets.values().copied().collect(),
            };

            for t in targets {
                if let Target::Stage(to) = t {
                    if !self.stages.contains_key(to) {
                        return Err(format!("edge `{from}` -> `{to}` targets an unknown stage"));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn run(&self, mut state: WorkflowState, run: &mut RunLog) -> Result<WorkflowState, String> {
        self.validate()?;

        let mut current = self.entry.ok_or("graph has no entry stage")?;
        let mut steps = 0usize;

        loop {
            if steps >= self.max_steps {
                return Err(format!(
                    "workflow exceeded {} stage executions (last: `{current}`)",
                    self.max_steps
                ));
            }
            steps += 1;

            let stage = self
                .stages
                .get(current)
                .ok_or_else(|| format!("unknown stage `{current}`"))?;

            let update = stage(&state, &mut *run);
            state.merge(update);
            state.visited.push(current);

            let next = match self.edges.get(current) {
                Some(Edge::Always(t)) => *t,
                Some(Edge::Branch { route, targets }) => {
                    let outcome = route(&state);
                    *targets.get(outcome).ok_or_else(|| {
                        format!("stage `{current}` routed to unmapped outcome `{outcome}`")
                    })?
                }
                None => return Err(format!("stage `{current}` has no outgoing edge")),
            };

            match next {
                Target::Stage(name) => current = name,
                Target::End => return Ok(state),
            }
        }
    }
}

impl Default for Graph<'_> {
    fn default() -> Self {
        Self::new()
    }
}
