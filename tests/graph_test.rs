use std::collections::HashMap;

use checkpoint::{build_plan, Relationship, Table};

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn numbered(n: usize) -> Vec<Table> {
    (0..n).map(|i| Table::new(Some("app"), format!("t{i:03}"))).collect()
}

/// Random acyclic schema: a table only references tables with a lower index.
fn random_dag(seed: u64, n: usize, edges: usize) -> (Vec<Table>, Vec<Relationship>) {
    let mut rng = Lcg(seed);
    let tables = numbered(n);
    let mut relationships = Vec::with_capacity(edges);
    for _ in 0..edges {
        let child = rng.below(n as u64 - 1) as usize + 1;
        let parent = rng.below(child as u64) as usize;
        relationships.push(Relationship::new(
            tables[parent].clone(),
            tables[child].clone(),
            None,
        ));
    }

    // Shuffle the input so order is not simply index order.
    let mut shuffled = tables.clone();
    for i in (1..shuffled.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        shuffled.swap(i, j);
    }
    (shuffled, relationships)
}

fn positions(order: &[Table]) -> HashMap<&Table, usize> {
    order.iter().enumerate().map(|(i, t)| (t, i)).collect()
}

#[test]
fn random_acyclic_schemas_delete_children_first() {
    for seed in 1..=50 {
        let (tables, relationships) = random_dag(seed, 40, 90);
        let plan = build_plan(&tables, &relationships);

        assert!(plan.is_complete(), "seed {seed} reported a cycle");
        assert_eq!(plan.order.len(), tables.len(), "seed {seed}");

        let at = positions(&plan.order);
        for rel in &relationships {
            assert!(
                at[&rel.child] < at[&rel.parent],
                "seed {seed}: {rel} deleted in the wrong order"
            );
        }
    }
}

#[test]
fn same_input_yields_same_plan() {
    for seed in [7, 42, 1234] {
        let (tables, relationships) = random_dag(seed, 60, 150);
        let first = build_plan(&tables, &relationships);
        let second = build_plan(&tables, &relationships);
        assert_eq!(first, second);
    }
}

#[test]
fn edge_order_does_not_change_the_plan() {
    let (tables, mut relationships) = random_dag(99, 30, 60);
    let forward = build_plan(&tables, &relationships);
    relationships.reverse();
    let backward = build_plan(&tables, &relationships);
    assert_eq!(forward.order, backward.order);
}

#[test]
fn self_references_are_ignored_in_random_schemas() {
    let (tables, mut relationships) = random_dag(5, 25, 40);
    let without = build_plan(&tables, &relationships);
    for table in tables.iter().step_by(3) {
        relationships.push(Relationship::new(table.clone(), table.clone(), None));
    }
    let with = build_plan(&tables, &relationships);
    assert_eq!(without.order, with.order);
    assert!(with.cycles.is_empty());
}

#[test]
fn cycle_members_never_reach_the_order() {
    let (tables, mut relationships) = random_dag(11, 30, 50);
    // Close a loop t010 -> t011 -> t012 -> t010.
    let t = |i: usize| Table::new(Some("app"), format!("t{i:03}"));
    relationships.push(Relationship::new(t(10), t(11), None));
    relationships.push(Relationship::new(t(11), t(12), None));
    relationships.push(Relationship::new(t(12), t(10), None));

    let plan = build_plan(&tables, &relationships);

    let cyclic: Vec<&Table> = plan.cycles.iter().flat_map(|g| &g.tables).collect();
    assert!(cyclic.contains(&&t(10)));
    assert!(cyclic.contains(&&t(11)));
    assert!(cyclic.contains(&&t(12)));
    for table in &cyclic {
        assert!(!plan.order.contains(*table));
    }
    assert_eq!(plan.order.len() + cyclic.len(), tables.len());

    // Whatever was ordered still respects every non-cyclic reference.
    let at = positions(&plan.order);
    for rel in &relationships {
        if let (Some(c), Some(p)) = (at.get(&rel.child), at.get(&rel.parent)) {
            assert!(c < p, "{rel} deleted in the wrong order");
        }
    }
    // Nothing left behind references a table that would be emptied.
    let kept: Vec<&Table> = cyclic.iter().copied().chain(&plan.cycle_parents).collect();
    let independent = plan.independent_order();
    for rel in &relationships {
        if kept.contains(&&rel.child) {
            assert!(!independent.contains(&rel.parent), "{rel} parent would be emptied");
        }
    }

    assert!(plan
        .cyclic_relationships
        .iter()
        .all(|rel| plan.cycles.iter().any(|g| g.contains(&rel.child) && g.contains(&rel.parent))));
}

#[test]
fn full_order_keeps_every_table_and_every_reference() {
    let (tables, mut relationships) = random_dag(23, 30, 50);
    let t = |i: usize| Table::new(Some("app"), format!("t{i:03}"));
    relationships.push(Relationship::new(t(20), t(5), None));

    let plan = build_plan(&tables, &relationships);
    let full = plan.full_order();
    assert_eq!(full.len(), tables.len());

    let at = positions(&full);
    for rel in &relationships {
        let cyclic = plan
            .cycles
            .iter()
            .any(|g| g.contains(&rel.child) && g.contains(&rel.parent));
        if !cyclic {
            assert!(at[&rel.child] < at[&rel.parent], "{rel} out of order");
        }
    }
}
