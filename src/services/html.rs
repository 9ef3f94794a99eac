use crate::domain::models::{AnalysisSummary, ReportConfig};
use chrono::NaiveDate;
use std::fmt::Write;

/// Emits the document preamble and opens the body; with `with_nav` set the
/// site navigation line follows. Shared by every generated page.
pub fn page_header(title: &str, with_nav: bool) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\">\n");
    out.push_str("<HTML>\n<HEAD>\n");
    let _ = writeln!(out, "<TITLE>{}</TITLE>", escape(title));
    out.push_str("</HEAD>\n<BODY bgcolor=\"#ffffff\">\n");
    if with_nav {
        out.push_str("<P><A href=\"../\">[Home]</A>\n");
    }
    out
}

pub fn page_footer() -> String {
    "</BODY>\n</HTML>\n".to_string()
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Thousands-separated count: 1863975684 -> "1,863,975,684".
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_msd(x: f64) -> String {
    format!("{:.4}", x)
}

/// Percentage change cell against the previous period: "(+0.56%)".
/// Empty when there is no previous value to compare with.
pub fn format_delta(current: u64, previous: Option<u64>) -> String {
    match previous {
        Some(prev) if prev > 0 => {
            let pct = (current as f64 - prev as f64) / prev as f64 * 100.0;
            format!("({:+.2}%)", pct)
        }
        _ => String::new(),
    }
}

/// "200108" -> "August 2001". Falls back to the raw period string.
pub fn period_month(period: &str) -> String {
    NaiveDate::parse_from_str(&format!("{}01", period), "%Y%m%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| period.to_string())
}

/// ISO date -> "10 Aug 2001" heading form.
fn heading_date(iso: &str) -> String {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|d| d.format("%e %b %Y").to_string().trim_start().to_string())
        .unwrap_or_else(|_| iso.to_string())
}

fn stat_row(label: &str, value: String, delta: String) -> String {
    format!(
        "<TR><TD>{}:</TD>\n<TD></TD><TD align=\"right\">{}</TD><TD>{}</TD></TR>\n",
        label, value, delta
    )
}

fn comment_for(cfg: &ReportConfig, key_id: &str, short_id: &str) -> String {
    cfg.comments
        .get(key_id)
        .or_else(|| cfg.comments.get(short_id))
        .map(|c| escape(c))
        .unwrap_or_default()
}

/// Renders the monthly strong-set report page.
///
/// The structure follows the historical keyanalyze monthly page: prose and
/// artifact links, the general statistics and strong set tables with deltas
/// against the previous period, then the best-connected-keys table.
pub fn render_report_page(
    summary: &AnalysisSummary,
    previous: Option<&AnalysisSummary>,
    cfg: &ReportConfig,
) -> String {
    let period = &summary.period;
    let month = period_month(period);
    let title = cfg
        .title
        .clone()
        .unwrap_or_else(|| format!("wotstat {}", month));

    let mut out = page_header(&title, true);
    let w = &mut out;

    let _ = writeln!(
        w,
        "<P><A href=\"{}\">[Back to Keyring Analysis Page]</A>\n",
        cfg.index_url
    );
    match cfg.export_date.as_deref() {
        Some(date) => {
            let _ = writeln!(w, "<P><B>Key Analysis {}</B>\n", heading_date(date));
            let _ = writeln!(
                w,
                "<P>The following stats are being pulled from a keyring that was\nexported on {}.",
                heading_date(date)
            );
        }
        None => {
            let _ = writeln!(w, "<P><B>Key Analysis {}</B>\n", month);
            let _ = writeln!(
                w,
                "<P>The following stats are being pulled from this month's keyring export."
            );
        }
    }
    if let Some(keyserver) = cfg.keyserver.as_deref() {
        let _ = writeln!(
            w,
            "The keyring was exported from\n<A href=\"{}\">{}</A>.",
            keyserver, keyserver
        );
    }
    let _ = writeln!(
        w,
        "Before reading this, please be sure to\nview the\n<A href=\"{}\">explanation of this analysis</A> and read\nthe <A href=\"{}\">FAQ</A>.\n",
        cfg.explanation_url, cfg.faq_url
    );

    let _ = writeln!(
        w,
        "<P>The strong set MSD raw analysis is\n<A href=\"{p}/msd-sorted-{p}.txt\">available here</A>. Please\nread the <A href=\"{faq}\">FAQ</A> to explain how to read this file.\nThis file includes all keys reachable from the strong set. Look up\nreports for individual keys in the\n<A href=\"{p}/\">raw output directory</A>. Here you can\nalso see what keys are\nsigned by each key (otherwise very difficult to find).\n",
        p = period,
        faq = cfg.faq_url
    );
    let _ = writeln!(
        w,
        "<UL><LI><A href=\"{}/\">Output directory, including individual\nkey reports</A></UL>\n",
        period
    );

    let _ = writeln!(w, "<P><B>New This Month</B>\n");
    if let Some(text) = cfg.new_this_month.as_deref() {
        let _ = writeln!(w, "<P>{}\n", escape(text));
    }

    let prev_general = previous.map(|p| &p.general);
    let _ = writeln!(w, "<P><B>General statistics</B>");
    w.push_str("<TABLE width=\"80%\">\n");
    w.push_str(&stat_row(
        "Size of binary keyring (bytes)",
        format_count(summary.general.keyring_bytes),
        format_delta(
            summary.general.keyring_bytes,
            prev_general.map(|g| g.keyring_bytes),
        ),
    ));
    w.push_str(&stat_row(
        "Number of keys",
        format_count(summary.general.total_keys),
        format_delta(
            summary.general.total_keys,
            prev_general.map(|g| g.total_keys),
        ),
    ));
    w.push_str(&stat_row(
        "Non-revoked keys with at least one non-self sig",
        format_count(summary.general.usable_keys),
        format_delta(
            summary.general.usable_keys,
            prev_general.map(|g| g.usable_keys),
        ),
    ));
    w.push_str(&stat_row(
        "Total non-self sigs on those keys",
        format_count(summary.general.total_sigs),
        format_delta(
            summary.general.total_sigs,
            prev_general.map(|g| g.total_sigs),
        ),
    ));
    w.push_str("</TABLE>\n");

    let prev_strong = previous.map(|p| &p.strong);
    let _ = writeln!(w, "<P><B>The \"strong set\"</B>");
    w.push_str("<TABLE width=\"80%\">\n");
    w.push_str(&stat_row(
        "Size of largest strongly connected set",
        format_count(summary.strong.size),
        format_delta(summary.strong.size, prev_strong.map(|s| s.size)),
    ));
    w.push_str(&stat_row(
        "Keys that have signed this set",
        format_count(summary.strong.signers),
        format_delta(summary.strong.signers, prev_strong.map(|s| s.signers)),
    ));
    w.push_str(&stat_row(
        "Keys that this set has signed (target of MSD calculations)",
        format_count(summary.strong.signed),
        format_delta(summary.strong.signed, prev_strong.map(|s| s.signed)),
    ));
    w.push_str("</TABLE>\n");

    let _ = writeln!(w, "\n<P><B>Best connected keys (shortest distance to)</B>");
    let _ = writeln!(
        w,
        "<P>Please read about the mean shortest distance (MSD) calculated here\nin the <A href=\"{}\">analysis explanation</A>. Here are the\ntop {} keys. Look for your own key in this month's raw analysis\n(see above). Note that the only keys analyzed were those reachable from\nthe strong set.",
        cfg.explanation_url,
        summary.top.len()
    );
    let _ = writeln!(
        w,
        "<P>The average MSD is {}, in the set of {}. The median value\nis {}.",
        format_msd(summary.msd.average),
        format_count(summary.strong.size),
        format_msd(summary.msd.median)
    );
    if let Some(url) = cfg.keyserver_web_url.as_deref() {
        let _ = writeln!(
            w,
            "<P>Go to <A href=\"{}\">this\nkeyserver's web interface</A> to look up these keys.",
            url
        );
    }

    w.push_str("\n<P>\n<TABLE width=\"100%\">\n");
    w.push_str(
        "<TR><TD><B>Rank</B></TD><TD><B>Hex ID (last 32b)</B></TD>\n<TD><B>Key Name (Identifier)</B></TD><TD><I><B>Comments</B></I></TD>\n<TD align=\"right\"><B>MSD</B></TD></TR>\n",
    );
    for entry in &summary.top {
        let full = entry.key_id.to_string();
        let short = entry.key_id.short_hex();
        let _ = writeln!(
            w,
            "<TR><TD>{}</TD><TD>0x{}</TD><TD>{}</TD><TD><I>{}</I></TD><TD align=\"right\">{}</TD></TR>",
            entry.rank,
            short,
            escape(&entry.name),
            comment_for(cfg, &full, &short),
            format_msd(entry.msd)
        );
    }
    w.push_str("</TABLE>\n");

    out.push_str(&page_footer());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MsdStats, ScanStats, StrongSetStats, TopKey};

    fn summary() -> AnalysisSummary {
        AnalysisSummary {
            period: "200108".to_string(),
            general: ScanStats {
                keyring_bytes: 1_863_975_684,
                total_keys: 1_583_621,
                usable_keys: 148_845,
                total_sigs: 306_035,
            },
            strong: StrongSetStats {
                size: 10_153,
                signers: 14_811,
                signed: 40_249,
            },
            msd: MsdStats {
                average: 6.6224,
                median: 6.1993,
            },
            top: vec![TopKey {
                rank: 1,
                key_id: "C7A966DD9AE0665E".parse().unwrap(),
                name: "Example <ex@example.org>".to_string(),
                msd: 3.2094,
            }],
        }
    }

    #[test]
    fn counts_get_thousands_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_863_975_684), "1,863,975,684");
    }

    #[test]
    fn delta_formats_signed_percentages() {
        assert_eq!(format_delta(1010, Some(1000)), "(+1.00%)");
        assert_eq!(format_delta(990, Some(1000)), "(-1.00%)");
        assert_eq!(format_delta(5, None), "");
        assert_eq!(format_delta(5, Some(0)), "");
    }

    #[test]
    fn header_carries_title_and_nav() {
        let page = page_header("wotstat August 2001", true);
        assert!(page.starts_with("<!DOCTYPE"));
        assert!(page.contains("<TITLE>wotstat August 2001</TITLE>"));
        assert!(page.contains("[Home]"));
        assert!(!page_header("x", false).contains("[Home]"));
    }

    #[test]
    fn period_month_is_spelled_out() {
        assert_eq!(period_month("200108"), "August 2001");
        assert_eq!(period_month("bogus"), "bogus");
    }

    #[test]
    fn page_contains_tables_links_and_top_rows() {
        let s = summary();
        let cfg = ReportConfig::default();
        let page = render_report_page(&s, None, &cfg);
        assert!(page.contains("<TITLE>wotstat August 2001</TITLE>"));
        assert!(page.contains("200108/msd-sorted-200108.txt"));
        assert!(page.contains("Size of largest strongly connected set"));
        assert!(page.contains("10,153"));
        assert!(page.contains("The average MSD is 6.6224"));
        assert!(page.contains("0x9AE0665E"));
        assert!(page.contains("Example &lt;ex@example.org&gt;"));
        assert!(page.ends_with("</BODY>\n</HTML>\n"));
    }

    #[test]
    fn deltas_rendered_against_previous_period() {
        let s = summary();
        let mut prev = summary();
        prev.period = "200107".to_string();
        prev.strong.size = 9_562;
        let page = render_report_page(&s, Some(&prev), &ReportConfig::default());
        assert!(page.contains("(+6.18%)"));
    }

    #[test]
    fn comments_match_full_or_short_ids() {
        let s = summary();
        let mut cfg = ReportConfig::default();
        cfg.comments
            .insert("9AE0665E".to_string(), "keyring maintainer".to_string());
        let page = render_report_page(&s, None, &cfg);
        assert!(page.contains("<I>keyring maintainer</I>"));
    }
}
