use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::orbit::Report;
use crate::text::truncate;

const RULE_WIDTH: usize = 60;
const NAME_WIDTH: usize = 26;

/// `1.2M`, `3.4K`, or the plain count below a thousand.
pub fn format_followers(count: u64) -> String {
    match count {
        n if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        n if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        n => n.to_string(),
    }
}

/// Fixed-width table for the terminal.
pub struct Table<'a>(pub &'a Report);

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "{heavy}")?;
        writeln!(f, "TOP RECOMMENDATIONS FOR @{}", report.user)?;
        writeln!(f, "{heavy}")?;
        writeln!(f)?;
        writeln!(f, "{:<5} {:<28} {:<12} {}", "Rank", "Account", "Followers", "In Common")?;
        writeln!(f, "{light}")?;
        for rec in &report.recommendations {
            writeln!(
                f,
                "{:<5} {:<28} {:<12} {}",
                rec.rank,
                truncate(rec.label(), NAME_WIDTH),
                format_followers(rec.followers_count),
                rec.followed_by_count
            )?;
        }
        writeln!(f, "{light}")?;
        writeln!(f)?;
        writeln!(f, "'In Common' = how many of your follows also follow this account")
    }
}

/// Markdown version of the table, with linked names and bios.
pub struct Markdown<'a>(pub &'a Report);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Bluesky Follow Recommendations for @{}\n", report.user)?;
        writeln!(
            f,
            "Accounts you might want to follow, ranked by how many of your follows also follow them.\n"
        )?;
        writeln!(f, "| Rank | Account | Followers | In Common | Bio |")?;
        writeln!(f, "|------|---------|-----------|-----------|-----|")?;
        for rec in &report.recommendations {
            writeln!(
                f,
                "| {} | [{}]({}) | {} | {} | {} |",
                rec.rank,
                escape_cell(rec.label()),
                rec.url,
                format_followers(rec.followers_count),
                rec.followed_by_count,
                escape_cell(&rec.bio)
            )?;
        }
        Ok(())
    }
}

pub fn render_table(report: &Report) -> String {
    Table(report).to_string()
}

pub fn render_markdown(report: &Report) -> String {
    Markdown(report).to_string()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Where the JSON and Markdown artifacts for `handle` go inside `dir`.
pub fn artifact_paths(dir: &Path, handle: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("bsky-orbit-{handle}.json")),
        dir.join(format!("bsky-orbit-{handle}.md")),
    )
}

/// Write both artifacts and return their paths (JSON first).
pub fn write_artifacts(report: &Report, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let (json_path, md_path) = artifact_paths(dir, &report.user);

    let json = render_json(report).context("Failed to serialize report")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    std::fs::write(&md_path, render_markdown(report))
        .with_context(|| format!("Failed to write {}", md_path.display()))?;

    Ok((json_path, md_path))
}
