//! Dependency graph builder and deletion-order resolver.
//!
//! Given the tables eligible for deletion and the foreign keys between them,
//! [`build_plan`] produces a [`DeletionPlan`]: an order in which every child
//! table is deleted no later than the parents it references, plus the
//! [`CycleGroup`]s for which no such order exists.
//!
//! Tables are first partitioned into strongly connected components. The
//! condensation of the graph is acyclic, so components are released in
//! rounds: a component becomes deletable once every component referencing it
//! has been placed. Singleton components contribute their table to the order;
//! larger components are reported as cycle groups and left out of it. Ordered
//! tables that a cycle group references are listed as cycle parents. Ties
//! within a round are broken by input order, so the same input always yields
//! the same plan.

pub mod scc;

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::schema::{Relationship, Table};

/// Two or more tables that reference each other, directly or transitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleGroup {
    /// Members, in input order.
    pub tables: Vec<Table>,
    /// Index into [`DeletionPlan::order`] before which the group would have
    /// been deleted had it been orderable.
    pub position: usize,
}

impl CycleGroup {
    pub fn contains(&self, table: &Table) -> bool {
        self.tables.contains(table)
    }
}

/// One step of a plan: a single orderable table or an unresolved group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep<'a> {
    Table(&'a Table),
    Cycle(&'a CycleGroup),
}

/// The output of [`build_plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    /// Tables safe to delete from in this order. Excludes cycle members.
    pub order: Vec<Table>,
    /// Unresolved cycle groups, ordered by position.
    pub cycles: Vec<CycleGroup>,
    /// Relationships whose parent and child sit in the same cycle group.
    pub cyclic_relationships: Vec<Relationship>,
    /// Tables of [`order`](Self::order) that a cycle group references,
    /// directly or transitively. While the group keeps its rows these
    /// tables cannot be emptied either.
    pub cycle_parents: Vec<Table>,
}

impl DeletionPlan {
    /// `true` when every table made it into [`order`](Self::order).
    pub fn is_complete(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Tables and cycle groups interleaved in deletion order.
    pub fn steps(&self) -> Vec<PlanStep<'_>> {
        let mut steps = Vec::with_capacity(self.order.len() + self.cycles.len());
        let mut cycles = self.cycles.iter().peekable();
        for (i, table) in self.order.iter().enumerate() {
            while let Some(group) = cycles.next_if(|g| g.position == i) {
                steps.push(PlanStep::Cycle(group));
            }
            steps.push(PlanStep::Table(table));
        }
        steps.extend(cycles.map(PlanStep::Cycle));
        steps
    }

    /// [`order`](Self::order) without [`cycle_parents`](Self::cycle_parents):
    /// what can be emptied while every cycle group is left alone.
    pub fn independent_order(&self) -> Vec<Table> {
        self.order
            .iter()
            .filter(|t| !self.cycle_parents.contains(t))
            .cloned()
            .collect()
    }

    /// Every table, cycle members included, in deletion order. Only safe to
    /// execute with the cyclic constraints suspended.
    pub fn full_order(&self) -> Vec<Table> {
        let mut tables = Vec::new();
        for step in self.steps() {
            match step {
                PlanStep::Table(t) => tables.push(t.clone()),
                PlanStep::Cycle(g) => tables.extend(g.tables.iter().cloned()),
            }
        }
        tables
    }
}

/// Compute the deletion plan for `tables`.
///
/// Relationships referencing a table outside `tables` are ignored, as are
/// self-references. Several constraints between the same parent and child
/// collapse to one edge. Duplicate tables keep their first position.
pub fn build_plan(tables: &[Table], relationships: &[Relationship]) -> DeletionPlan {
    let mut index: HashMap<&Table, usize> = HashMap::with_capacity(tables.len());
    let mut nodes: Vec<&Table> = Vec::with_capacity(tables.len());
    for table in tables {
        if !index.contains_key(table) {
            index.insert(table, nodes.len());
            nodes.push(table);
        }
    }
    let n = nodes.len();

    // parents[c] = tables c holds a foreign key toward
    let mut parents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut edges: Vec<(usize, usize, &Relationship)> = Vec::new();
    for rel in relationships {
        if rel.is_self_reference() {
            continue;
        }
        let (Some(&p), Some(&c)) = (index.get(&rel.parent), index.get(&rel.child)) else {
            continue;
        };
        parents[c].insert(p);
        edges.push((p, c, rel));
    }

    let successors: Vec<Vec<usize>> = parents.iter().map(|s| s.iter().copied().collect()).collect();
    let mut components = scc::strongly_connected(&successors);
    // members are sorted, so [0] is the earliest input position
    components.sort_unstable_by_key(|c| c[0]);

    let mut component_of = vec![0usize; n];
    for (k, members) in components.iter().enumerate() {
        for &m in members {
            component_of[m] = k;
        }
    }

    let k = components.len();
    let mut comp_parents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); k];
    let mut comp_children: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); k];
    for (c, ps) in parents.iter().enumerate() {
        for &p in ps {
            let (cc, cp) = (component_of[c], component_of[p]);
            if cc != cp {
                comp_parents[cc].insert(cp);
                comp_children[cp].insert(cc);
            }
        }
    }

    let mut pending: Vec<usize> = comp_children.iter().map(BTreeSet::len).collect();
    let mut plan = DeletionPlan::default();
    let mut ready: Vec<usize> = (0..k).filter(|&c| pending[c] == 0).collect();

    while !ready.is_empty() {
        let mut next = Vec::new();
        for &comp in &ready {
            let members = &components[comp];
            if let [only] = members.as_slice() {
                plan.order.push(nodes[*only].clone());
            } else {
                plan.cycles.push(CycleGroup {
                    tables: members.iter().map(|&m| nodes[m].clone()).collect(),
                    position: plan.order.len(),
                });
            }
            for &parent in &comp_parents[comp] {
                pending[parent] -= 1;
                if pending[parent] == 0 {
                    next.push(parent);
                }
            }
        }
        next.sort_unstable();
        ready = next;
    }

    let mut held = vec![false; k];
    let mut frontier: Vec<usize> = (0..k).filter(|&c| components[c].len() > 1).collect();
    while let Some(comp) = frontier.pop() {
        for &parent in &comp_parents[comp] {
            if !held[parent] {
                held[parent] = true;
                frontier.push(parent);
            }
        }
    }
    let cycle_parents: Vec<Table> = plan
        .order
        .iter()
        .filter(|t| held[component_of[index[*t]]])
        .cloned()
        .collect();
    plan.cycle_parents = cycle_parents;

    let mut seen: HashSet<&Relationship> = HashSet::new();
    for (p, c, rel) in edges {
        let comp = component_of[p];
        if comp == component_of[c] && components[comp].len() > 1 && seen.insert(rel) {
            plan.cyclic_relationships.push(rel.clone());
        }
    }

    tracing::debug!(
        tables = n,
        ordered = plan.order.len(),
        cycles = plan.cycles.len(),
        "built deletion plan"
    );

    plan
}
