use ingest_orchestrator::RunReport;

/// Render a run report as a human-readable summary.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    if report.dry_run {
        out.push_str("(dry run)\n");
    }

    if let Some(sync) = &report.synced {
        out.push_str(&format!(
            "sync:    {} new, {} dedupe links, {} metadata updates, {} skipped, {} failed\n",
            sync.new_uploads, sync.dedupe_links, sync.metadata_updates, sync.skipped, sync.failed
        ));
    }

    if let Some(extracted) = &report.extracted {
        out.push_str(&format!("process: {} successful, {} failed\n", extracted.successful, extracted.failed));
    }

    if let Some(indexed) = &report.indexed {
        out.push_str(&format!("index:   {} successful, {} failed\n", indexed.successful, indexed.failed));
    }

    if report.stale_swept > 0 {
        out.push_str(&format!("cleanup: {} stale row(s) swept\n", report.stale_swept));
    }

    if report.migrated > 0 {
        out.push_str(&format!("migrate: {} row(s) reconstructed\n", report.migrated));
    }

    if let Some(stats) = &report.stats {
        out.push_str(&format!("total documents: {}\n", stats.total));
        for (status, count) in &stats.by_status {
            out.push_str(&format!("  {status}: {count}\n"));
        }
        out.push_str(&format!("with errors: {}\n", stats.with_errors));
    }

    for err in &report.errors {
        out.push_str(&format!("error: {err}\n"));
    }

    if out.is_empty() {
        out.push_str("nothing to do\n");
    }

    out
}
