use crate::channel::DatabaseInfo;
use crate::placement::{
    ClusterInfo, CollectionAudit, PlacementReport, StepOutcome, ZoneAudit, ZoneStatus,
};
use crate::sample::PopulateSummary;
use crossterm::style::Stylize;
use std::io::{self, Write};

const RULE_WIDTH: usize = 60;

pub fn header(out: &mut impl Write, title: &str) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{}", rule.as_str().cyan())?;
    writeln!(out, "{}", title.bold())?;
    writeln!(out, "{}", rule.as_str().cyan())
}

pub fn success(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "✓".green().bold(), message)
}

pub fn failure(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "✗".red().bold(), message)
}

fn outcome_label(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Applied => "applied".green().to_string(),
        StepOutcome::AlreadySatisfied => "already satisfied".dark_green().to_string(),
        StepOutcome::Failed(reason) => format!("{} {}", "failed".red().bold(), reason),
        StepOutcome::Skipped(reason) => format!("{} {}", "skipped".yellow(), reason),
    }
}

/// One line per step, grouped under the zone it belongs to, then a summary line.
pub fn print_report(out: &mut impl Write, report: &PlacementReport) -> io::Result<()> {
    // zones in order of first appearance; stages interleave them in the report
    let mut zones: Vec<&str> = Vec::new();
    for record in report.records() {
        if !zones.contains(&record.zone.as_str()) {
            zones.push(&record.zone);
        }
    }
    for zone in zones {
        writeln!(out, "\n{}", format!("zone {}", zone).bold())?;
        for record in report.for_zone(zone) {
            writeln!(
                out,
                "  {:<24} {:<40} {}",
                record.step.to_string(),
                record.target,
                outcome_label(&record.outcome)
            )?;
        }
    }

    let summary = report.summary();
    let line = format!(
        "{} applied, {} already satisfied, {} failed, {} skipped",
        summary.applied, summary.already_satisfied, summary.failed, summary.skipped
    );
    writeln!(out)?;
    if summary.failed > 0 || summary.skipped > 0 {
        failure(out, &line)
    } else {
        success(out, &line)
    }
}

pub fn print_status(out: &mut impl Write, statuses: &[ZoneStatus]) -> io::Result<()> {
    for status in statuses {
        writeln!(out, "\n{}", format!("Zone: {}", status.zone).bold())?;
        writeln!(out, "  Tenants:  {}", status.tenant_ids.join(", "))?;
        writeln!(out, "  Database: {}", status.database)?;
        writeln!(
            out,
            "  Shard:    {} ({})",
            status.planned_shard,
            status.shard_host.as_deref().unwrap_or("unknown host")
        )?;
        let tagged = if status.tagged_shards.is_empty() {
            "none".to_string()
        } else {
            status.tagged_shards.join(", ")
        };
        if status.is_in_sync() {
            writeln!(out, "  Tagged:   {}", tagged.green())?;
        } else {
            writeln!(out, "  Tagged:   {} {}", tagged.yellow(), "(out of sync)".yellow())?;
        }
    }
    Ok(())
}

fn print_collection_audit(out: &mut impl Write, audit: &CollectionAudit) -> io::Result<()> {
    if audit.distribution.is_empty() && audit.in_zone == 0 && audit.foreign == 0 {
        return writeln!(out, "  {}: {} documents", audit.namespace, audit.total);
    }
    let spread = audit
        .distribution
        .iter()
        .map(|d| format!("{}={}", d.shard_id, d.documents))
        .collect::<Vec<_>>()
        .join(" ");
    let status = if audit.is_clean() {
        "ok".green().to_string()
    } else {
        format!("{} foreign, {} misplaced", audit.foreign, audit.misplaced)
            .red()
            .to_string()
    };
    writeln!(
        out,
        "  {}: {} in zone [{}] {}",
        audit.namespace, audit.in_zone, spread, status
    )
}

pub fn print_audits(out: &mut impl Write, audits: &[ZoneAudit]) -> io::Result<()> {
    for audit in audits {
        writeln!(
            out,
            "\n{}",
            format!("Zone: {} (shard {})", audit.zone, audit.shard_id).bold()
        )?;
        for collection in &audit.collections {
            print_collection_audit(out, collection)?;
        }
    }
    Ok(())
}

fn print_database(out: &mut impl Write, db: &DatabaseInfo) -> io::Result<()> {
    writeln!(
        out,
        "  {} primary={} sharded={} collections={}",
        db.name,
        db.primary,
        db.sharding_enabled,
        db.collections.len()
    )
}

pub fn print_cluster_info(out: &mut impl Write, info: &ClusterInfo) -> io::Result<()> {
    writeln!(out, "{}", format!("Shards ({})", info.shards.len()).bold())?;
    for shard in &info.shards {
        let zones = if shard.zones.is_empty() {
            String::new()
        } else {
            format!(" zones: {}", shard.zones.join(", "))
        };
        writeln!(out, "  {} {}{}", shard.id, shard.host.as_str().dark_grey(), zones)?;
    }
    writeln!(out, "{}", format!("Databases ({})", info.databases.len()).bold())?;
    for db in &info.databases {
        print_database(out, db)?;
    }
    Ok(())
}

pub fn print_population(out: &mut impl Write, summary: &PopulateSummary) -> io::Result<()> {
    for (namespace, count) in &summary.inserted {
        writeln!(out, "  {:<32} {}", namespace, count)?;
    }
    success(out, &format!("{} documents inserted", summary.total()))
}
