use sqlx::PgPool;

/// Prints the most recent sync runs, one per line.
///
/// # Errors
///
/// Returns an error if the history query fails.
pub(crate) async fn list_runs(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = pimsync_db::list_sync_runs(pool, limit.clamp(1, 200)).await?;
    if rows.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }
    for row in &rows {
        println!("{}", format_run(row));
    }
    Ok(())
}

fn format_run(row: &pimsync_db::SyncRunRow) -> String {
    let started = row
        .started_at
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
    let mut line = format!(
        "{}  {:<10}  {:<9}  {:<9}  {}  processed={}",
        row.public_id, row.job, row.trigger_source, row.status, started, row.records_processed
    );
    if let Some(error) = &row.error_message {
        line.push_str("  error=");
        line.push_str(error);
    }
    line
}
