//! Strongly connected components (Tarjan), iterative so that long foreign-key
//! chains cannot exhaust the call stack.

const UNVISITED: usize = usize::MAX;

/// Partition the nodes `0..successors.len()` into strongly connected
/// components. Each component's members are sorted ascending; components are
/// returned in reverse topological order of the condensation.
pub fn strongly_connected(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = successors.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // (node, position of the next successor to visit)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (node, pos) = *frame;

            if pos == 0 && index[node] == UNVISITED {
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }

            if let Some(&succ) = successors[node].get(pos) {
                frame.1 += 1;
                if index[succ] == UNVISITED {
                    frames.push((succ, 0));
                } else if on_stack[succ] {
                    lowlink[node] = lowlink[node].min(index[succ]);
                }
                continue;
            }

            frames.pop();

            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }

            if let Some(&(caller, _)) = frames.last() {
                lowlink[caller] = lowlink[caller].min(lowlink[node]);
            }
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut components: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        components.sort();
        components
    }

    #[test]
    fn acyclic_graph_has_singleton_components() {
        // 0 -> 1 -> 2, 0 -> 2
        let succ = vec![vec![1, 2], vec![2], vec![]];
        let comps = strongly_connected(&succ);
        assert_eq!(sorted(comps), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn three_cycle_is_one_component() {
        // 0 -> 1 -> 2 -> 0, 3 isolated
        let succ = vec![vec![1], vec![2], vec![0], vec![]];
        let comps = strongly_connected(&succ);
        assert_eq!(sorted(comps), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn separate_cycles_are_separate_components() {
        // 0 <-> 1, 2 <-> 3, 1 -> 2
        let succ = vec![vec![1], vec![0, 2], vec![3], vec![2]];
        let comps = strongly_connected(&succ);
        assert_eq!(sorted(comps.clone()), vec![vec![0, 1], vec![2, 3]]);
        // reverse topological: the sink {2,3} is emitted first
        assert_eq!(comps[0], vec![2, 3]);
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 100_000;
        let succ: Vec<Vec<usize>> = (0..n)
            .map(|i| if i + 1 < n { vec![i + 1] } else { vec![] })
            .collect();
        let comps = strongly_connected(&succ);
        assert_eq!(comps.len(), n);
    }
}
