use std::io::Cursor;
use std::sync::Arc;

use pathway_compliance::pathways::{
    DiagnosisFilter, DispatchError, EncounterImporter, EncounterNotification, EngineSettings,
    ImportError, InMemoryPathwayStore, NotificationDispatcher, PathwayService, PathwayType,
    ReportingWindow,
};

struct Silent;

impl NotificationDispatcher for Silent {
    fn dispatch(&self, _notification: EncounterNotification) -> Result<(), DispatchError> {
        Ok(())
    }
}

const EXPORT: &str = "No RM,Nama Pasien,Jenis Clinical Pathway,Tanggal Masuk,Jam Masuk,Tanggal Keluar,Jam Keluar,DPJP,Verifikator\n\
RM-100,Intan,Stroke Non Hemoragik,2025-02-03,09:00,2025-02-07,09:00,dr. Rudi,\n\
RM-101,Joni,Stroke Non Hemoragik,2025-02-10,09:00,2025-02-17,10:30,dr. Rudi,\n\
RM-102,Kiki,Tifoid,2025-02-11,13:00,2025-02-13,12:00,,\n\
RM-103,Lina,Dengue Fever,2025-03-01,08:00,,,,\n";

#[test]
fn imported_month_feeds_the_dashboard() {
    let rows = EncounterImporter::from_reader(Cursor::new(EXPORT)).expect("export parses");
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[2].admission.pathway,
        PathwayType::Unrecognized("Tifoid".to_string())
    );

    let service = PathwayService::new(
        Arc::new(InMemoryPathwayStore::default()),
        Arc::new(Silent),
        EngineSettings::default(),
    );
    service.import(rows).expect("import");

    let february = ReportingWindow::new(2, 2025).expect("window");
    let stroke = service
        .dashboard_view(
            &DiagnosisFilter::Only(PathwayType::StrokeNonHemoragik),
            &february,
        )
        .expect("stroke view");
    assert_eq!(stroke.metrics.metrics.total_patients, 2);
    assert!((stroke.metrics.metrics.los_compliance_pct - 50.0).abs() < 1e-9);
    assert!((stroke.metrics.metrics.avg_los - 6.0).abs() < 1e-9);

    let all = service
        .dashboard_view(&DiagnosisFilter::All, &february)
        .expect("all view");
    assert_eq!(all.metrics.metrics.total_patients, 3);
    assert!((all.metrics.metrics.los_compliance_pct - 200.0 / 3.0).abs() < 1e-9);
}

#[test]
fn malformed_discharge_names_its_line() {
    let csv = "No RM,Nama Pasien,Jenis Clinical Pathway,Tanggal Masuk,Jam Masuk,Tanggal Keluar,Jam Keluar,DPJP,Verifikator\n\
RM-200,Mira,Pneumonia,2025-02-03,09:00,2025-02-07,09:00,,\n\
RM-201,Nina,Pneumonia,2025-02-04,09:00,besok,,,\n";
    match EncounterImporter::from_reader(Cursor::new(csv)) {
        Err(ImportError::InvalidRow { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected invalid row, got {other:?}"),
    }
}
