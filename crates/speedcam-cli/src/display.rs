//! Terminal output for run summaries and camera catalogs.

use arrow::util::pretty::pretty_format_batches;
use speedcam_core::schema::camera_batch;
use speedcam_core::{CameraIndex, RunSummary, ViolationClass};

/// Print per-class counts for a finished run.
pub fn print_summary(summary: &RunSummary) {
    eprintln!(
        "  {} samples -> {} events, {} matched to a camera",
        summary.samples, summary.groups, summary.matched
    );
    for class in ViolationClass::ALL {
        let n = summary.by_class.get(&class).copied().unwrap_or(0);
        let label = format!("class {} {}", class.code(), class.as_str());
        eprintln!("  {label:<24} {n}");
    }
    eprintln!("  {:<24} {}", "indeterminate", summary.indeterminate);
}

/// Print the catalog size and its first `limit` records as a table.
pub fn print_catalog(index: &CameraIndex, limit: usize) -> anyhow::Result<()> {
    let cameras = index.cameras();
    let with_limit = cameras.iter().filter(|c| c.speed_limit.is_some()).count();
    println!(
        "{} cameras ({} with a posted limit), search radius {} m",
        cameras.len(),
        with_limit,
        index.radius_m()
    );
    let shown = &cameras[..limit.min(cameras.len())];
    if shown.is_empty() {
        return Ok(());
    }
    let batch = camera_batch(shown)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}
