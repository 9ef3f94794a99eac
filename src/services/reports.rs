use crate::services::graph::{MsdResult, SigGraph, MAX_HOPS};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Individual reports are filed by the short (last 32 bits) key ID, in a
/// two-hex-character subdirectory unless flat layout is requested.
pub fn individual_report_path(base: &Path, g: &SigGraph, node: u32, flat: bool) -> PathBuf {
    let short = g.ids[node as usize].short_hex();
    if flat {
        base.join(short)
    } else {
        base.join(&short[..2]).join(&short)
    }
}

fn write_key_list(out: &mut impl Write, g: &SigGraph, nodes: &[u32]) -> std::io::Result<usize> {
    for &n in nodes {
        writeln!(out, "  {}", g.ids[n as usize].spaced_hex())?;
    }
    Ok(nodes.len())
}

/// Plain-text per-key report: signature lists, strong-set membership, MSD
/// and hop breakout.
pub fn write_individual_report(
    base: &Path,
    g: &SigGraph,
    r: &MsdResult,
    flat: bool,
) -> anyhow::Result<()> {
    let path = individual_report_path(base, g, r.node, flat);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    let id = g.ids[r.node as usize];

    writeln!(out, "KeyID {}\n", id.spaced_hex())?;
    writeln!(
        out,
        "This individual key report was generated as part of the monthly\nkeyring strong-set analysis.\n"
    )?;
    writeln!(
        out,
        "Note: Key signature counts and lists are from a pruned list that only\nincludes keys with signatures other than their own.\n"
    )?;

    writeln!(out, "Signatures to this key:")?;
    let to = write_key_list(&mut out, g, &g.signers[r.node as usize])?;
    writeln!(out, "Total: {} signatures to this id from this set\n", to)?;

    writeln!(out, "Signatures from this key:")?;
    let from = write_key_list(&mut out, g, &g.signed[r.node as usize])?;
    writeln!(out, "Total: {} signatures from this id to this set\n", from)?;

    writeln!(
        out,
        "This key is {}in the strong set.",
        if r.in_strong_set { "" } else { "not " }
    )?;
    writeln!(
        out,
        "Mean distance to this key from strong set: {:8.5}\n",
        r.msd
    )?;
    writeln!(out, "Breakout by hop count (only from strong set):")?;
    let high = (r.hop_high as usize).min(MAX_HOPS - 1);
    for hops in 0..=high {
        writeln!(out, "{:2} hops: {:5}", hops, r.hops[hops])?;
    }
    if !r.farthest.is_empty() {
        writeln!(out, "\nFarthest keys ({} hops):", r.hop_high)?;
        write_key_list(&mut out, g, &r.farthest)?;
    }
    out.flush()?;
    Ok(())
}

/// The semicolon-delimited per-key record file, one row per reachable key.
pub fn write_msd_csv(path: &Path, g: &SigGraph, results: &[MsdResult]) -> anyhow::Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for r in results {
        writeln!(
            out,
            "{};{:8.5};{};{};{};{};{};{};{};{}",
            g.ids[r.node as usize],
            r.msd,
            r.in_degree,
            r.out_degree,
            r.cross_degree,
            r.in_degree_strong,
            r.out_degree_strong,
            r.cross_degree_strong,
            r.hop_high,
            u8::from(r.in_strong_set)
        )?;
    }
    out.flush()?;
    Ok(())
}

/// The raw sorted listing the report page links: ascending MSD, ties broken
/// by key ID so monthly runs diff cleanly.
pub fn write_msd_sorted(path: &Path, g: &SigGraph, results: &[MsdResult]) -> anyhow::Result<()> {
    let mut rows: Vec<(f64, u32)> = results.iter().map(|r| (r.msd, r.node)).collect();
    rows.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| g.ids[a.1 as usize].cmp(&g.ids[b.1 as usize]))
    });
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (msd, node) in rows {
        writeln!(out, "{} {:8.4}", g.ids[node as usize].spaced_hex(), msd)?;
    }
    out.flush()?;
    Ok(())
}
