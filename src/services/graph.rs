use crate::keyring::{parse_graph_line, GraphRecord, KeyId, KeyringError};
use std::collections::HashMap;
use tracing::warn;

/// Hop histogram cutoff for individual key reports.
pub const MAX_HOPS: usize = 30;

/// Signature graph over the preprocessed keyring.
///
/// Edges run in both directions: `signers[i]` holds the keys that signed key
/// `i`, `signed[i]` the keys that key `i` signed. MSD traversals walk signer
/// edges, so a BFS from key `i` yields, for every other key, the length of
/// the shortest signature chain ending at `i`.
pub struct SigGraph {
    pub ids: Vec<KeyId>,
    index: HashMap<KeyId, u32>,
    pub signers: Vec<Vec<u32>>,
    pub signed: Vec<Vec<u32>>,
}

impl SigGraph {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn node(&self, id: KeyId) -> Option<u32> {
        self.index.get(&id).copied()
    }

    /// Parses the preprocessed p/s line format.
    ///
    /// Two passes over the text, like the original import: the first pass
    /// registers every key, the second attaches signatures. Signatures by
    /// keys absent from the file are dropped with a warning.
    pub fn parse(text: &str) -> Result<SigGraph, KeyringError> {
        let mut ids = Vec::new();
        let mut index = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if let Some(GraphRecord::Key(id)) = parse_graph_line(line, lineno + 1)? {
                index.entry(id).or_insert_with(|| {
                    ids.push(id);
                    ids.len() as u32 - 1
                });
            }
        }
        if ids.is_empty() {
            return Err(KeyringError::EmptyGraph);
        }

        let mut signers = vec![Vec::new(); ids.len()];
        let mut signed = vec![Vec::new(); ids.len()];
        let mut current: Option<u32> = None;
        let mut dropped = 0u64;
        for (lineno, line) in text.lines().enumerate() {
            match parse_graph_line(line, lineno + 1)? {
                Some(GraphRecord::Key(id)) => current = index.get(&id).copied(),
                Some(GraphRecord::Signer(id)) => {
                    let Some(dst) = current else {
                        return Err(KeyringError::MalformedRecord {
                            line: lineno + 1,
                            reason: "signature before any key record".to_string(),
                        });
                    };
                    match index.get(&id) {
                        Some(&src) => {
                            signers[dst as usize].push(src);
                            signed[src as usize].push(dst);
                        }
                        None => dropped += 1,
                    }
                }
                None => {}
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped signatures from keys outside the graph");
        }

        Ok(SigGraph {
            ids,
            index,
            signers,
            signed,
        })
    }
}

pub struct SccResult {
    /// Component root node per key.
    pub component: Vec<u32>,
    /// Root of the largest component (the strong set).
    pub strong_root: u32,
    pub strong_size: u32,
    /// Size per component root.
    pub sizes: HashMap<u32, u32>,
}

/// Tarjan over signer edges, iterative to survive deep signature chains.
pub fn strongly_connected_components(adj: &[Vec<u32>]) -> SccResult {
    let n = adj.len();
    let mut dfsnum = vec![0u32; n];
    let mut lownum = vec![0u32; n];
    let mut component = vec![0u32; n];
    let mut removed = vec![false; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut call: Vec<(u32, usize)> = Vec::new();
    let mut next = 0u32;
    let mut sizes: HashMap<u32, u32> = HashMap::new();

    for start in 0..n as u32 {
        if dfsnum[start as usize] != 0 {
            continue;
        }
        next += 1;
        dfsnum[start as usize] = next;
        lownum[start as usize] = next;
        stack.push(start);
        call.push((start, 0));

        while let Some(frame) = call.last_mut() {
            let v = frame.0 as usize;
            if frame.1 < adj[v].len() {
                let w = adj[v][frame.1] as usize;
                frame.1 += 1;
                if removed[w] {
                    continue;
                }
                if dfsnum[w] == 0 {
                    next += 1;
                    dfsnum[w] = next;
                    lownum[w] = next;
                    stack.push(w as u32);
                    call.push((w as u32, 0));
                } else if dfsnum[w] < lownum[v] {
                    lownum[v] = dfsnum[w];
                }
            } else {
                call.pop();
                if let Some(parent) = call.last() {
                    let p = parent.0 as usize;
                    if lownum[v] < lownum[p] {
                        lownum[p] = lownum[v];
                    }
                }
                if lownum[v] == dfsnum[v] {
                    let mut size = 0u32;
                    while let Some(w) = stack.pop() {
                        component[w as usize] = v as u32;
                        removed[w as usize] = true;
                        size += 1;
                        if w as usize == v {
                            break;
                        }
                    }
                    sizes.insert(v as u32, size);
                }
            }
        }
    }

    // Largest component wins; ties break toward the smaller root so runs
    // are deterministic.
    let (strong_root, strong_size) = sizes
        .iter()
        .map(|(&root, &size)| (root, size))
        .max_by_key(|&(root, size)| (size, std::cmp::Reverse(root)))
        .unwrap_or((0, 0));

    SccResult {
        component,
        strong_root,
        strong_size,
        sizes,
    }
}

/// Marks every key reachable from the strong set along signed-key edges.
///
/// This is the MSD target set: the keys the strong set has (transitively)
/// signed, strong-set members included.
pub fn reachable_from_strong(g: &SigGraph, scc: &SccResult) -> Vec<bool> {
    let mut reachable = vec![false; g.len()];
    let mut stack: Vec<u32> = Vec::new();
    for node in 0..g.len() as u32 {
        if scc.component[node as usize] == scc.strong_root {
            reachable[node as usize] = true;
            stack.push(node);
        }
    }
    while let Some(v) = stack.pop() {
        for &w in &g.signed[v as usize] {
            if !reachable[w as usize] {
                reachable[w as usize] = true;
                stack.push(w);
            }
        }
    }
    reachable
}

/// Per-key MSD computation output.
pub struct MsdResult {
    pub node: u32,
    pub msd: f64,
    /// Histogram of strong-set members by hop count, capped at MAX_HOPS.
    pub hops: Vec<u32>,
    pub hop_high: u32,
    /// Strong-set keys at the highest hop count.
    pub farthest: Vec<u32>,
    pub in_strong_set: bool,
    pub in_degree: u32,
    pub out_degree: u32,
    pub cross_degree: u32,
    pub in_degree_strong: u32,
    pub out_degree_strong: u32,
    pub cross_degree_strong: u32,
}

/// BFS from `node` along signer edges; the mean of the resulting distances
/// over strong-set members is the key's MSD.
///
/// Every strong-set member reaches every key in the reachable set, so all
/// distances summed here are finite.
pub fn mean_shortest_distance(g: &SigGraph, node: u32, strong: &[bool], strong_size: u32) -> MsdResult {
    let mut dist = vec![u32::MAX; g.len()];
    let mut queue = std::collections::VecDeque::new();
    dist[node as usize] = 0;
    queue.push_back(node);
    while let Some(v) = queue.pop_front() {
        let len = dist[v as usize];
        for &w in &g.signers[v as usize] {
            if len + 1 < dist[w as usize] {
                dist[w as usize] = len + 1;
                queue.push_back(w);
            }
        }
    }

    let mut total = 0u64;
    let mut hops = vec![0u32; MAX_HOPS];
    let mut hop_high = 0u32;
    let mut farthest: Vec<u32> = Vec::new();
    for i in 0..g.len() as u32 {
        if !strong[i as usize] {
            continue;
        }
        let d = dist[i as usize];
        total += u64::from(d);
        if (d as usize) < MAX_HOPS {
            hops[d as usize] += 1;
        }
        if d > hop_high {
            hop_high = d;
            farthest.clear();
        }
        if d == hop_high {
            farthest.push(i);
        }
    }

    let msd = if strong_size > 1 {
        total as f64 / f64::from(strong_size - 1)
    } else {
        0.0
    };

    let signers = &g.signers[node as usize];
    let signed = &g.signed[node as usize];
    let signed_set: std::collections::HashSet<u32> = signed.iter().copied().collect();
    let mut cross_degree = 0;
    let mut cross_degree_strong = 0;
    for &s in signers {
        if signed_set.contains(&s) {
            cross_degree += 1;
            if strong[s as usize] {
                cross_degree_strong += 1;
            }
        }
    }

    MsdResult {
        node,
        msd,
        hops,
        hop_high,
        farthest,
        in_strong_set: strong[node as usize],
        in_degree: signers.len() as u32,
        out_degree: signed.len() as u32,
        cross_degree,
        in_degree_strong: signers.iter().filter(|&&s| strong[s as usize]).count() as u32,
        out_degree_strong: signed.iter().filter(|&&s| strong[s as usize]).count() as u32,
        cross_degree_strong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Three keys in a signing cycle plus one leaf key signed by AAAA.
    const CYCLE_WITH_TAIL: &str = "\
p00000000AAAAAAAA
s00000000CCCCCCCC
p00000000BBBBBBBB
s00000000AAAAAAAA
p00000000CCCCCCCC
s00000000BBBBBBBB
p00000000DDDDDDDD
s00000000AAAAAAAA
";

    fn graph() -> SigGraph {
        SigGraph::parse(CYCLE_WITH_TAIL).unwrap()
    }

    #[test]
    fn parse_builds_both_edge_directions() {
        let g = graph();
        assert_eq!(g.len(), 4);
        let a = g.node("00000000AAAAAAAA".parse().unwrap()).unwrap();
        let d = g.node("00000000DDDDDDDD".parse().unwrap()).unwrap();
        assert_eq!(g.signers[d as usize], vec![a]);
        assert!(g.signed[a as usize].contains(&d));
    }

    #[test]
    fn cycle_is_the_strong_set() {
        let g = graph();
        let scc = strongly_connected_components(&g.signers);
        assert_eq!(scc.strong_size, 3);
        let d = g.node("00000000DDDDDDDD".parse().unwrap()).unwrap();
        assert_ne!(scc.component[d as usize], scc.strong_root);
    }

    #[test]
    fn leaf_is_reachable_from_strong_set() {
        let g = graph();
        let scc = strongly_connected_components(&g.signers);
        let reachable = reachable_from_strong(&g, &scc);
        assert_eq!(reachable.iter().filter(|&&r| r).count(), 4);
    }

    #[test]
    fn msd_values_match_hand_computation() {
        let g = graph();
        let scc = strongly_connected_components(&g.signers);
        let strong: Vec<bool> = scc
            .component
            .iter()
            .map(|&c| c == scc.strong_root)
            .collect();

        // In the 3-cycle every member sees distances {0, 1, 2}: MSD 1.5.
        let a = g.node("00000000AAAAAAAA".parse().unwrap()).unwrap();
        let ra = mean_shortest_distance(&g, a, &strong, scc.strong_size);
        assert!((ra.msd - 1.5).abs() < 1e-9);
        assert!(ra.in_strong_set);
        assert_eq!(ra.hop_high, 2);
        assert_eq!(ra.farthest.len(), 1);

        // The leaf D is signed only by A: distances 1 (A), 2 (C), 3 (B).
        let d = g.node("00000000DDDDDDDD".parse().unwrap()).unwrap();
        let rd = mean_shortest_distance(&g, d, &strong, scc.strong_size);
        assert!((rd.msd - 3.0).abs() < 1e-9);
        assert!(!rd.in_strong_set);
        assert_eq!(rd.in_degree, 1);
        assert_eq!(rd.out_degree, 0);
        assert_eq!(rd.in_degree_strong, 1);
    }

    #[test]
    fn mutual_signatures_count_as_cross_degree() {
        let text = "\
p0000000000000001
s0000000000000002
p0000000000000002
s0000000000000001
";
        let g = SigGraph::parse(text).unwrap();
        let scc = strongly_connected_components(&g.signers);
        assert_eq!(scc.strong_size, 2);
        let strong: Vec<bool> = scc
            .component
            .iter()
            .map(|&c| c == scc.strong_root)
            .collect();
        let r = mean_shortest_distance(&g, 0, &strong, scc.strong_size);
        assert_eq!(r.cross_degree, 1);
        assert_eq!(r.cross_degree_strong, 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            SigGraph::parse(""),
            Err(KeyringError::EmptyGraph)
        ));
    }
}
