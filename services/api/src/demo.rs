use crate::infra::{memory_service, parse_month, MemoryPathwayService};
use chrono::{Datelike, Duration, Local, NaiveDateTime};
use clap::Args;
use pathway_compliance::error::AppError;
use pathway_compliance::pathways::{
    ChecklistEntry, ComplianceUpdate, DiagnosisFilter, EncounterImporter, EngineSettings,
    NewEncounter, PathwayType, ReportingWindow, SummaryGenerationReport,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Encounter export (No RM, Nama Pasien, Jenis Clinical Pathway, ...)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Reporting month (1-12)
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: u32,
    /// Reporting year
    #[arg(long)]
    pub(crate) year: i32,
    /// Restrict the dashboard to one diagnosis label (defaults to every diagnosis)
    #[arg(long)]
    pub(crate) diagnosis: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting month for the synthetic encounters (defaults to the current month)
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: Option<u32>,
    /// Reporting year (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        csv,
        month,
        year,
        diagnosis,
    } = args;

    let window = ReportingWindow::new(month, year)?;
    let rows = EncounterImporter::from_path(&csv)?;
    let service = memory_service(EngineSettings::default());
    let imported = service.import(rows)?;
    println!(
        "Imported {} encounters from {}",
        imported.len(),
        csv.display()
    );

    let report = service.generate_summaries(&window)?;
    render_generation(&report);

    let filters = match diagnosis.as_deref() {
        Some(label) => vec![DiagnosisFilter::parse(Some(label))],
        None => dashboard_filters(),
    };
    render_dashboard(&service, &window, &filters)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let window = ReportingWindow::new(
        args.month.unwrap_or_else(|| today.month()),
        args.year.unwrap_or_else(|| today.year()),
    )?;

    println!("Clinical pathway compliance demo for {window}");
    let service = memory_service(EngineSettings::default());
    seed_month(&service, &window)?;

    let report = service.generate_summaries(&window)?;
    render_generation(&report);
    render_dashboard(&service, &window, &dashboard_filters())?;

    println!("\nChecklist completion by diagnosis");
    for summary in service.checklist_summaries(&window)? {
        println!(
            "  - {}: {}/{} items ({:.1}%) across {} patients",
            summary.pathway,
            summary.completed_items,
            summary.total_items,
            summary.completion_pct,
            summary.patient_count
        );
    }

    Ok(())
}

fn dashboard_filters() -> Vec<DiagnosisFilter> {
    std::iter::once(DiagnosisFilter::All)
        .chain(PathwayType::ordered().into_iter().map(DiagnosisFilter::Only))
        .collect()
}

fn render_generation(report: &SummaryGenerationReport) {
    println!(
        "Summaries generated for {} diagnoses, {} monthly rows ({} removed, {} failed)",
        report.succeeded.len(),
        report.materialized.len(),
        report.removed.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  ! {} {}: {}", failure.kind.label(), failure.pathway, failure.error);
    }
}

fn render_dashboard(
    service: &MemoryPathwayService,
    window: &ReportingWindow,
    filters: &[DiagnosisFilter],
) -> Result<(), AppError> {
    println!("\nDashboard {window}");
    println!(
        "  {:<22} {:>5} {:>8} {:>8} {:>8} {:>8} {:>7}",
        "Diagnosis", "n", "CP %", "LOS %", "Terapi", "Penunj.", "Avg LOS"
    );
    for filter in filters {
        let view = service.dashboard_view(filter, window)?;
        let metrics = view.metrics.metrics;
        println!(
            "  {:<22} {:>5} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>7.2}{}",
            filter.label(),
            metrics.total_patients,
            metrics.pathway_compliance_pct,
            metrics.los_compliance_pct,
            metrics.therapy_compliance_pct,
            metrics.support_compliance_pct,
            metrics.avg_los,
            if view.stale { " (stale)" } else { "" }
        );
    }
    Ok(())
}

struct SyntheticCase {
    name: &'static str,
    pathway: PathwayType,
    admitted_day: u32,
    stay_hours: Option<i64>,
    cp_compliant: bool,
}

fn case(
    name: &'static str,
    pathway: PathwayType,
    admitted_day: u32,
    stay_hours: Option<i64>,
    cp_compliant: bool,
) -> SyntheticCase {
    SyntheticCase {
        name,
        pathway,
        admitted_day,
        stay_hours,
        cp_compliant,
    }
}

fn synthetic_cases() -> Vec<SyntheticCase> {
    vec![
        case("Ayu Pratiwi", PathwayType::SectioCaesaria, 2, Some(46), true),
        case("Bunga Sari", PathwayType::SectioCaesaria, 5, Some(70), true),
        case("Citra Dewi", PathwayType::SectioCaesaria, 9, Some(48), false),
        case("Dimas Saputra", PathwayType::Pneumonia, 3, Some(130), true),
        case("Eko Wibowo", PathwayType::Pneumonia, 11, Some(160), true),
        case("Fitri Handayani", PathwayType::Pneumonia, 14, None, true),
        case("Gunawan", PathwayType::StrokeHemoragik, 6, Some(118), false),
        case("Hartono", PathwayType::StrokeNonHemoragik, 8, Some(96), true),
        case("Indah Permata", PathwayType::DengueFever, 12, Some(60), true),
        case("Joko Susilo", PathwayType::DengueFever, 15, Some(90), true),
    ]
}

fn seed_month(service: &MemoryPathwayService, window: &ReportingWindow) -> Result<(), AppError> {
    for (position, case) in synthetic_cases().into_iter().enumerate() {
        let admitted_at = admission_time(window, case.admitted_day);
        let encounter = service.admit(NewEncounter {
            patient_name: case.name.to_string(),
            record_number: format!("RM-{:05}", 1000 + position),
            pathway: case.pathway.clone(),
            admitted_at,
            attending_physician: Some("dr. Ratna".to_string()),
            verifier: None,
        })?;

        let checklist: Vec<ChecklistEntry> = service
            .checklist_template(&case.pathway)
            .into_iter()
            .enumerate()
            .map(|(index, mut entry)| {
                // leave every third step unticked
                if (index + position) % 3 != 0 {
                    entry.days[0] = true;
                }
                entry
            })
            .collect();
        service.save_checklist(&encounter.id, checklist)?;

        if let Some(hours) = case.stay_hours {
            service.discharge(&encounter.id, admitted_at + Duration::hours(hours))?;
        }
        if !case.cp_compliant {
            service.update_compliance(
                &encounter.id,
                ComplianceUpdate {
                    cp_compliant: Some(false),
                    ..ComplianceUpdate::default()
                },
            )?;
        }
    }
    Ok(())
}

fn admission_time(window: &ReportingWindow, day: u32) -> NaiveDateTime {
    let date = window
        .start()
        .checked_add_signed(Duration::days(i64::from(day.saturating_sub(1))))
        .unwrap_or_else(|| window.start());
    date.and_time(chrono::NaiveTime::MIN) + Duration::hours(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_month_rolls_up_every_case() {
        let window = ReportingWindow::new(2, 2025).expect("window");
        let service = memory_service(EngineSettings::default());
        seed_month(&service, &window).expect("seed succeeds");

        let view = service
            .dashboard_view(&DiagnosisFilter::All, &window)
            .expect("dashboard");
        assert_eq!(view.metrics.metrics.total_patients, synthetic_cases().len());
        assert!((view.metrics.metrics.pathway_compliance_pct - 80.0).abs() < 1e-9);

        let report = service.generate_summaries(&window).expect("generate");
        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), PathwayType::ordered().len());
    }

    #[test]
    fn dashboard_filters_lead_with_all() {
        let filters = dashboard_filters();
        assert_eq!(filters[0], DiagnosisFilter::All);
        assert_eq!(filters.len(), 6);
    }
}
