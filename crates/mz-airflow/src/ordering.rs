//! Reverse Cuthill-McKee reordering of the airflow unknowns.

use std::collections::{BTreeSet, VecDeque};

use mz_network::Network;

/// Compute an RCM permutation of the unknowns.
///
/// `unknown_map[node] = Some(eq)` for non-Ambient nodes. Returns `perm` with
/// `perm[new] = old`: the unknown formerly at equation `old` moves to `new`.
/// Start vertex is a minimum-degree node; BFS visits neighbours in ascending
/// degree; the Cuthill-McKee order is reversed at the end. Disconnected
/// unknowns are appended so the permutation stays total.
pub fn rcm_ordering(network: &Network, unknown_map: &[Option<usize>], n: usize) -> Vec<usize> {
    if n <= 1 {
        return (0..n).collect();
    }

    // Adjacency over unknowns; BTreeSet keeps neighbour iteration
    // deterministic and deduplicates parallel links.
    let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for link in network.links() {
        if let (Some(a), Some(b)) = (unknown_map[link.from], unknown_map[link.to]) {
            if a != b {
                adj[a].insert(b);
                adj[b].insert(a);
            }
        }
    }

    let start = (0..n).min_by_key(|&i| adj[i].len()).unwrap_or(0);

    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited[start] = true;

    while let Some(v) = queue.pop_front() {
        order.push(v);
        let mut neighbours: Vec<usize> = adj[v].iter().copied().filter(|&u| !visited[u]).collect();
        neighbours.sort_by_key(|&u| adj[u].len());
        for u in neighbours {
            visited[u] = true;
            queue.push_back(u);
        }
    }

    for i in 0..n {
        if !visited[i] {
            order.push(i);
        }
    }

    order.reverse();
    order
}

/// Invert a `perm[new] = old` permutation into `inv[old] = new`.
pub fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new, &old) in perm.iter().enumerate() {
        inv[old] = new;
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_elements::PowerLawOrifice;
    use mz_network::{NetworkBuilder, NodeKind};

    fn chain_network(rooms: usize) -> Network {
        let mut b = NetworkBuilder::new();
        let amb = b.add_node("Out", NodeKind::Ambient);
        let mut prev = amb;
        for i in 0..rooms {
            let r = b.add_node(format!("Room{i}"), NodeKind::Normal);
            b.node_mut(r).volume = 30.0;
            b.add_link(
                format!("l{i}"),
                prev,
                r,
                1.0,
                PowerLawOrifice::new(0.003, 0.65).unwrap().into(),
            );
            prev = r;
        }
        b.build().unwrap()
    }

    fn unknown_map(network: &Network) -> (Vec<Option<usize>>, usize) {
        let mut map = vec![None; network.node_count()];
        let mut eq = 0;
        for (i, node) in network.nodes().iter().enumerate() {
            if !node.is_known_pressure() {
                map[i] = Some(eq);
                eq += 1;
            }
        }
        (map, eq)
    }

    #[test]
    fn permutation_is_total() {
        let net = chain_network(6);
        let (map, n) = unknown_map(&net);
        let perm = rcm_ordering(&net, &map, n);
        let mut sorted = perm.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn chain_stays_banded() {
        // On a path graph RCM must keep neighbours adjacent: bandwidth 1.
        let net = chain_network(8);
        let (map, n) = unknown_map(&net);
        let perm = rcm_ordering(&net, &map, n);
        let inv = invert_permutation(&perm);

        let mut max_band = 0usize;
        for link in net.links() {
            if let (Some(a), Some(b)) = (map[link.from], map[link.to]) {
                max_band = max_band.max(inv[a].abs_diff(inv[b]));
            }
        }
        assert_eq!(max_band, 1);
    }

    #[test]
    fn inverse_round_trips() {
        let perm = vec![2, 0, 3, 1];
        let inv = invert_permutation(&perm);
        for (new, &old) in perm.iter().enumerate() {
            assert_eq!(inv[old], new);
        }
    }

    #[test]
    fn single_unknown_is_identity() {
        let net = chain_network(1);
        let (map, n) = unknown_map(&net);
        assert_eq!(rcm_ordering(&net, &map, n), vec![0]);
    }
}
