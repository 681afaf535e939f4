use crate::{config::KnowledgeBase, request::CalculationRequest};
use anyhow::{bail, Context, Result};
use fertiblend_core::{
    calculation::{builder::CalculationBuilder, CalculationOutcome},
    snapshot::SharedReference,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Serialize)]
struct DosageRow<'a> {
    fertilizer: &'a str,
    g_per_l: f64,
    batch_grams: f64,
    required_supplement: bool,
}

/// Runs one request end to end and writes its results into a fresh, timestamped run
/// directory under `output_root`. Returns that directory.
pub fn run_calculation(
    request: &CalculationRequest,
    request_path: &str,
    kb: &KnowledgeBase,
    reference: &SharedReference,
    output_root: &str,
) -> Result<PathBuf> {
    println!("\n--- [Workflow] Resolving fertilizers ---");
    let snapshot = reference.load();
    let (fertilizers, unresolved) = request.fertilizers(kb, &snapshot.registry);
    for problem in &unresolved {
        println!("  - Skipped: {}", problem);
    }
    if fertilizers.is_empty() {
        bail!("None of the {} requested fertilizers could be resolved", request.fertilizers.len());
    }
    for fertilizer in &fertilizers {
        println!("  - {} ({:.1}% purity)", fertilizer.name(), fertilizer.purity());
    }

    let mut settings = kb.settings.clone();
    if let Some(enabled) = request.apply_caps {
        settings.caps.enabled = enabled;
    }
    if let Some(strict) = request.strict_caps {
        settings.caps.strict = strict;
    }

    let output_dir = Path::new(output_root).join(format!(
        "{}_{}",
        request.request_id,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    fs::copy(request_path, output_dir.join("request.yaml"))
        .with_context(|| format!("Failed to copy {} into the run directory", request_path))?;

    println!("\n--- [Workflow] Calculating dosages ({:?}) ---", request.method);
    let verification_log = output_dir.join("verification.csv");
    let mut builder = CalculationBuilder::new()
        .with_fertilizers(fertilizers)
        .with_method(request.method)
        .with_settings(settings)
        .with_volume(request.volume_liters)
        .with_dosage_limits(request.dosage_limits.clone())
        .with_micronutrient_supplement(request.supplement_micronutrients)
        .with_verification_log_to_file(&verification_log.to_string_lossy());
    if let Some(targets) = request.targets(kb) {
        builder = builder.with_targets(targets);
    }
    if let Some(water) = request.water(kb) {
        builder = builder.with_water(water);
    }
    let outcome = builder.build(snapshot)?.run()?;

    write_dosages_csv(&outcome, &output_dir.join("dosages.csv"))?;
    let report_path = output_dir.join("report.json");
    let report = fs::File::create(&report_path).with_context(|| format!("Failed to create {:?}", report_path))?;
    serde_json::to_writer_pretty(report, &outcome).with_context(|| format!("Failed to write {:?}", report_path))?;

    print_summary_report(&outcome, &unresolved);
    Ok(output_dir)
}

fn write_dosages_csv(outcome: &CalculationOutcome, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for fertilizer in &outcome.fertilizers {
        let name = fertilizer.name();
        writer.serialize(DosageRow {
            fertilizer: name,
            g_per_l: outcome.dosages.get(name),
            batch_grams: outcome.batch_grams.get(name).copied().unwrap_or(0.0),
            required_supplement: fertilizer.is_required_supplement(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary_report(outcome: &CalculationOutcome, unresolved: &[String]) {
    let report = &outcome.verification;

    println!("\n\n--- [Final Summary Report] ---");
    println!("========================================");
    println!("Method: {:?}", outcome.method);
    if let Some(optimization) = &outcome.optimization {
        println!(
            "Backend: {} | Status: {} | Objective: {:.3} | Iterations: {} | {:.3} s",
            optimization.backend,
            optimization.status.as_str(),
            optimization.objective_value,
            optimization.iterations,
            optimization.solver_time_seconds
        );
    }

    if !outcome.safe_targets.adjustments.is_empty() {
        println!("\nSafety Cap Adjustments:");
        for adjustment in &outcome.safe_targets.adjustments {
            println!(
                "  - {}: {} -> {} mg/L",
                adjustment.element, adjustment.original, adjustment.adjusted
            );
        }
    }

    println!("\nDosages ({:.1} L batch):", outcome.volume_liters);
    for (name, dosage) in outcome.dosages.iter().filter(|(_, d)| *d > 0.0) {
        println!(
            "  - {:<40} {:>8.4} g/L {:>10.2} g",
            name,
            dosage,
            outcome.batch_grams.get(name).copied().unwrap_or(0.0)
        );
    }
    println!("  Total: {:.3} g/L", outcome.dosages.total());

    println!("\nElement Verification:");
    for row in &report.elements {
        println!(
            "  - {:<4} target {:>9.3} | achieved {:>9.3} mg/L | {:>+7.1}% | {}",
            row.element, row.target, row.achieved, row.deviation_percent, row.status
        );
    }

    let balance = &report.ionic_balance;
    println!(
        "\nIonic Balance: {:.2} meq/L cations / {:.2} meq/L anions ({:.1}%, {:?})",
        balance.cation_meq, balance.anion_meq, balance.imbalance_percent, balance.status
    );
    println!("Estimated EC: {:.2} dS/m", outcome.breakdown.estimated_ec);
    println!(
        "Quality: {:.1} ({})",
        report.quality.overall, report.quality.grade
    );

    for diagnosis in &report.diagnoses {
        println!(
            "  ! {} {:+.1}%: {} [{}]",
            diagnosis.element,
            diagnosis.deviation_percent,
            diagnosis.primary.code(),
            diagnosis.severity
        );
    }
    for warning in &report.safety_warnings {
        println!("  ! {}", warning);
    }
    for problem in unresolved {
        println!("  ! Unresolved fertilizer: {}", problem);
    }

    println!("\nRecommendations:");
    for line in &report.recommendations {
        println!("  - {}", line);
    }
    println!("========================================");
}
