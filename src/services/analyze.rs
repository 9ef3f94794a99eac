use crate::domain::models::{AnalysisSummary, MsdStats, ScanStats, StrongSetStats, TopKey};
use crate::services::graph::{
    mean_shortest_distance, reachable_from_strong, strongly_connected_components, MsdResult,
    SigGraph,
};
use crate::services::reports::{write_individual_report, write_msd_csv, write_msd_sorted};
use crate::services::storage::{load_key_names, load_scan_stats, period_dir, save_summary};
use rayon::prelude::*;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub struct AnalyzeOptions {
    pub period: String,
    /// Entries kept in the summary's best-connected list.
    pub top: usize,
    pub individual_reports: bool,
    pub flat_dirs: bool,
}

/// Runs the full strong-set analysis for one period.
///
/// Reads `preprocessed` (and the preprocess side tables, if present) from
/// `data_dir`, writes every artifact under `<output_dir>/<period>/` and
/// returns the summary that was persisted as `summary.json`.
pub fn run(data_dir: &Path, output_dir: &Path, opts: &AnalyzeOptions) -> anyhow::Result<AnalysisSummary> {
    let text = std::fs::read_to_string(data_dir.join("preprocessed"))?;
    let graph = SigGraph::parse(&text)?;
    info!(keys = graph.len(), "signature graph loaded");

    let scc = strongly_connected_components(&graph.signers);
    let strong: Vec<bool> = scc
        .component
        .iter()
        .map(|&c| c == scc.strong_root)
        .collect();
    let reachable = reachable_from_strong(&graph, &scc);
    let targets: Vec<u32> = (0..graph.len() as u32)
        .filter(|&n| reachable[n as usize])
        .collect();
    info!(
        strong_set = scc.strong_size,
        reachable = targets.len(),
        components = scc.sizes.len(),
        "connectivity computed"
    );

    let results: Vec<MsdResult> = targets
        .par_iter()
        .map(|&node| mean_shortest_distance(&graph, node, &strong, scc.strong_size))
        .collect();
    info!(keys = results.len(), "mean shortest distances computed");

    let out_dir = period_dir(output_dir, &opts.period);
    std::fs::create_dir_all(&out_dir)?;

    write_msd_csv(&out_dir.join("msd.csv"), &graph, &results)?;
    write_msd_sorted(
        &out_dir.join(format!("msd-sorted-{}.txt", opts.period)),
        &graph,
        &results,
    )?;
    write_component_tables(&out_dir, &graph, &scc)?;
    write_strongset_graph(&out_dir, &graph, &strong)?;

    if opts.individual_reports {
        let keys_dir = out_dir.join("keys");
        std::fs::create_dir_all(&keys_dir)?;
        for r in &results {
            write_individual_report(&keys_dir, &graph, r, opts.flat_dirs)?;
        }
        info!(reports = results.len(), "individual key reports written");
    }

    let summary = build_summary(data_dir, &graph, &strong, scc.strong_size, &results, opts)?;
    save_summary(output_dir, &summary)?;
    Ok(summary)
}

/// `othersets.txt` (key -> component root) and `setsize.csv` (root -> size).
fn write_component_tables(
    out_dir: &Path,
    g: &SigGraph,
    scc: &crate::services::graph::SccResult,
) -> anyhow::Result<()> {
    let mut sets = std::io::BufWriter::new(std::fs::File::create(out_dir.join("othersets.txt"))?);
    for node in 0..g.len() {
        writeln!(
            sets,
            "{};{}",
            g.ids[node],
            g.ids[scc.component[node] as usize]
        )?;
    }
    sets.flush()?;

    let mut rows: Vec<(u32, u32)> = scc.sizes.iter().map(|(&r, &s)| (r, s)).collect();
    rows.sort_unstable_by_key(|&(root, size)| (std::cmp::Reverse(size), root));
    let mut sizes = std::io::BufWriter::new(std::fs::File::create(out_dir.join("setsize.csv"))?);
    for (root, size) in rows {
        writeln!(sizes, "{};{}", g.ids[root as usize], size)?;
    }
    sizes.flush()?;
    Ok(())
}

/// The strong set re-expressed in preprocessed form, for feeding follow-up
/// analyses that only care about the core.
fn write_strongset_graph(out_dir: &Path, g: &SigGraph, strong: &[bool]) -> anyhow::Result<()> {
    let mut out =
        std::io::BufWriter::new(std::fs::File::create(out_dir.join("preprocessed.strongset"))?);
    for node in 0..g.len() {
        if !strong[node] {
            continue;
        }
        writeln!(out, "p{}", g.ids[node])?;
        let mut signers: Vec<u32> = g.signers[node]
            .iter()
            .copied()
            .filter(|&s| strong[s as usize])
            .collect();
        signers.sort_unstable_by_key(|&s| g.ids[s as usize]);
        for s in signers {
            writeln!(out, "s{}", g.ids[s as usize])?;
        }
    }
    out.flush()?;
    Ok(())
}

fn build_summary(
    data_dir: &Path,
    g: &SigGraph,
    strong: &[bool],
    strong_size: u32,
    results: &[MsdResult],
    opts: &AnalyzeOptions,
) -> anyhow::Result<AnalysisSummary> {
    // Distinct keys with at least one signature on a strong-set member.
    let mut signer_set: HashSet<u32> = HashSet::new();
    for node in 0..g.len() {
        if strong[node] {
            signer_set.extend(g.signers[node].iter().copied());
        }
    }

    let mut strong_msds: Vec<f64> = results
        .iter()
        .filter(|r| r.in_strong_set)
        .map(|r| r.msd)
        .collect();
    strong_msds.sort_by(f64::total_cmp);
    let average = if strong_msds.is_empty() {
        0.0
    } else {
        strong_msds.iter().sum::<f64>() / strong_msds.len() as f64
    };
    let median = match strong_msds.len() {
        0 => 0.0,
        n if n % 2 == 1 => strong_msds[n / 2],
        n => (strong_msds[n / 2 - 1] + strong_msds[n / 2]) / 2.0,
    };

    let names = load_key_names(data_dir)?;
    let mut ranked: Vec<&MsdResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        a.msd
            .total_cmp(&b.msd)
            .then_with(|| g.ids[a.node as usize].cmp(&g.ids[b.node as usize]))
    });
    let top: Vec<TopKey> = ranked
        .iter()
        .take(opts.top)
        .enumerate()
        .map(|(i, r)| {
            let id = g.ids[r.node as usize];
            TopKey {
                rank: i as u32 + 1,
                key_id: id,
                name: names.get(&id).cloned().unwrap_or_default(),
                msd: r.msd,
            }
        })
        .collect();

    let general = load_scan_stats(data_dir)?.unwrap_or_else(|| ScanStats {
        keyring_bytes: 0,
        total_keys: g.len() as u64,
        usable_keys: g.len() as u64,
        total_sigs: g.signers.iter().map(|s| s.len() as u64).sum(),
    });

    Ok(AnalysisSummary {
        period: opts.period.clone(),
        general,
        strong: StrongSetStats {
            size: u64::from(strong_size),
            signers: signer_set.len() as u64,
            signed: results.len() as u64,
        },
        msd: MsdStats { average, median },
        top,
    })
}
