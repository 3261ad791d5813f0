/*!
 * Integration tests for the billing pipeline
 *
 * Drive the pipeline from files on disk, the way the CLI does, and read the
 * produced workbook back with calamine.
 */

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use smartflow::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const BILLING_CSV: &str = "\
packageprice,patientname,locationcenter,servicename,billtime,transactionno,discountcode,netamt,availeddatetime
500,Jane Doe,City Walk Clinic,Lipid Profile Test (Add On with Wellness),10:00,TX1,,500,
0,Ghost Row,Index Tower,Food Allergy Test (Add On),10:05,TX0,,0,
350,John Roe,Index Tower,Food Allergy Test (Add On),10:30,TX2,WELCOME10,315,2024-05-01 11:00
200,Jane Doe,City Walk Clinic,Doctor Consultation,10:45,TX3,,200,
900,Ann Poe,Dubai Knowledge Park,Smart DNA - Age Well Package,12:00,TX4,,900,
150,Ann Poe,Marina Walk,Gut Health Test,12:10,TX5,,150,
";

fn pipeline(kind: ProfileKind) -> BillingPipeline {
    BillingPipelineBuilder::new()
        .profile_kind(kind)
        .report_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .build()
        .unwrap()
}

fn write_input(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("billing.csv");
    std::fs::write(&path, contents).unwrap();
    path
}

fn sheet_rows(path: &Path, sheet: &str) -> Vec<Vec<Data>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[test]
fn test_csv_to_workbook() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), BILLING_CSV);
    let output = dir.path().join("final_output.xlsx");

    let report = pipeline(ProfileKind::Extended)
        .process_file(&input, &output, ExportFormat::Xlsx)
        .unwrap();
    assert_eq!(report.source_rows, 6);
    assert_eq!(report.line_items.len(), 5);
    assert!(output.exists());

    let workbook = open_workbook_auto(&output).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["DR 1 - QLAB", "DR 1 - SS", "DR 2", "DR QLAB"]);

    let pivot = sheet_rows(&output, "DR 1 - QLAB");
    assert_eq!(text(&pivot[0][1]), "CITY WALK");
    assert_eq!(text(&pivot[0][2]), "INDEX");
    assert_eq!(text(&pivot[0][3]), "DKP");
    let lipid = pivot.iter().find(|r| text(&r[0]) == "Lipid Profile").unwrap();
    assert_eq!(lipid[1], Data::Float(1.0));
    let allergy = pivot.iter().find(|r| text(&r[0]) == "Food Allergy").unwrap();
    assert_eq!(allergy[2], Data::Float(1.0));
    let age_well = pivot.iter().find(|r| text(&r[0]) == "Age-Well").unwrap();
    assert_eq!(age_well[3], Data::Float(1.0));

    let unique = sheet_rows(&output, "DR 1 - SS");
    let last = unique.last().unwrap();
    assert_eq!(text(&last[0]), "Unique Patients");
    // Jane Doe twice at City Walk, John Roe at Index, Ann Poe at DKP; Marina buckets nowhere
    assert_eq!(last[1..], [Data::Float(1.0), Data::Float(1.0), Data::Float(1.0)]);

    let items = sheet_rows(&output, "DR 2");
    assert_eq!(items.len(), 6);
    let header: Vec<String> = items[0].iter().map(text).collect();
    assert_eq!(header, LineItemSchema::column_names());
    assert_eq!(text(&items[1][1]), "01/05/2024");
    assert_eq!(text(&items[1][2]), "Jane Doe");
    assert_eq!(text(&items[1][4]), "LIPID PROFILE TEST (ADD ON WITH WELLNESS)");
    assert_eq!(text(&items[1][10]), "24hrs");
    assert_eq!(text(&items[1][11]), "SAMPLE PENDING");
    assert_eq!(text(&items[2][2]), "John Roe");
    assert_eq!(text(&items[2][11]), "UNDER PROCESS");
    assert!(items.iter().all(|r| text(&r[2]) != "Ghost Row"));

    let qlab = sheet_rows(&output, "DR QLAB");
    let qlab_names: Vec<String> = qlab[1..].iter().map(|r| text(&r[4])).collect();
    assert_eq!(
        qlab_names,
        vec![
            "LIPID PROFILE TEST (ADD ON WITH WELLNESS)",
            "FOOD ALLERGY TEST (ADD ON)",
            "SMART DNA - AGE WELL PACKAGE",
        ]
    );
    assert_eq!(qlab[3][0], Data::Float(3.0));
}

#[test]
fn test_workbook_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("billing.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in InputSchema::column_names().iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    sheet.write_number(1, 0, 500.0).unwrap();
    sheet.write_string(1, 1, "Jane Doe").unwrap();
    sheet.write_string(1, 2, "Index Tower").unwrap();
    sheet.write_string(1, 3, "Wellness Package - Premium").unwrap();
    sheet.write_string(1, 4, "10:00").unwrap();
    sheet.write_string(1, 5, "TX1").unwrap();
    sheet.write_number(1, 7, 500.0).unwrap();
    workbook.save(&input).unwrap();

    let report = pipeline(ProfileKind::Legacy).run_file(&input).unwrap();
    assert_eq!(report.line_items.len(), 1);
    assert_eq!(report.line_items[0].hrs.as_deref(), Some("96hrs"));
    assert_eq!(report.package_pivot.get("Premium Package", LocationBucket::Index), Some(1));
}

#[test]
fn test_workbook_null_markers() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("billing.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in InputSchema::column_names().iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    sheet.write_number(1, 0, 350.0).unwrap();
    sheet.write_string(1, 1, "John Roe").unwrap();
    sheet.write_string(1, 2, "Index Tower").unwrap();
    sheet.write_string(1, 3, "Food Allergy Test (Add On)").unwrap();
    sheet.write_string(1, 8, "NULL").unwrap();
    sheet.write_string(2, 0, "NULL").unwrap();
    sheet.write_string(2, 1, "Jane Doe").unwrap();
    sheet.write_string(2, 2, "City Walk").unwrap();
    sheet.write_string(2, 3, "Lipid Profile Test (Add On with Wellness)").unwrap();
    workbook.save(&input).unwrap();

    let report = pipeline(ProfileKind::Extended).run_file(&input).unwrap();
    assert_eq!(report.source_rows, 2);
    assert_eq!(report.line_items.len(), 1);
    assert_eq!(report.line_items[0].status, SampleStatus::SamplePending);
    assert_eq!(report.package_pivot.get("Lipid Profile", LocationBucket::CityWalk), Some(0));
}

#[test]
fn test_csv_identifiers_written_verbatim() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "packageprice,patientname,locationcenter,servicename,billtime,transactionno,discountcode,netamt,availeddatetime\n\
         500,Jane Doe,City Walk,ECG,10:00,000123,0010,500,\n\
         500,John Roe,City Walk,ECG,10:00,98765432109876543210,,500,\n",
    );
    let output = dir.path().join("final_output.xlsx");

    pipeline(ProfileKind::Extended)
        .process_file(&input, &output, ExportFormat::Xlsx)
        .unwrap();

    let items = sheet_rows(&output, "DR 2");
    assert_eq!(items[1][7], Data::String("000123".to_string()));
    assert_eq!(items[1][8], Data::String("0010".to_string()));
    assert_eq!(items[2][7], Data::String("98765432109876543210".to_string()));
    assert_eq!(items[1][9], Data::Float(500.0));
}

#[test]
fn test_missing_columns_report_every_name() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "packageprice,patientname\n500,Jane Doe\n");
    let output = dir.path().join("final_output.xlsx");

    let err = pipeline(ProfileKind::Extended)
        .process_file(&input, &output, ExportFormat::Xlsx)
        .unwrap_err();
    match err {
        SmartFlowError::Schema { missing, .. } => {
            assert_eq!(missing.len(), 7);
            assert!(missing.contains(&"servicename".to_string()));
            assert!(missing.contains(&"availeddatetime".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_all_rows_unbilled_still_writes_report() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "packageprice,patientname,locationcenter,servicename,billtime,transactionno,discountcode,netamt,availeddatetime\n\
         0,A,City Walk,ECG,10:00,TX1,,0,\n",
    );
    let output = dir.path().join("final_output.xlsx");

    let report = pipeline(ProfileKind::Extended)
        .process_file(&input, &output, ExportFormat::Xlsx)
        .unwrap();
    assert!(report.is_empty());

    let pivot = sheet_rows(&output, "DR 1 - QLAB");
    assert_eq!(pivot.len(), 1 + RuleProfile::extended().catalog.len());
    let items = sheet_rows(&output, "DR 2");
    assert_eq!(items.len(), 1);
}

#[test]
fn test_unsupported_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("billing.txt");
    std::fs::write(&input, "nothing").unwrap();

    let err = pipeline(ProfileKind::Extended).run_file(&input).unwrap_err();
    assert!(matches!(err, SmartFlowError::UnsupportedInput { .. }));
}

#[test]
fn test_config_drives_sheet_names() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), BILLING_CSV);
    let output = dir.path().join("report.xlsx");

    let config = ConfigBuilder::new()
        .profile(ProfileKind::Legacy)
        .sheet_names(SheetNames {
            package_pivot: "Pivot".to_string(),
            ..Default::default()
        })
        .build();
    let pipeline = BillingPipelineBuilder::from_config(&config)
        .unwrap()
        .report_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .build()
        .unwrap();
    pipeline.process_file(&input, &output, ExportFormat::Xlsx).unwrap();

    let workbook = open_workbook_auto(&output).unwrap();
    assert_eq!(workbook.sheet_names()[0], "Pivot");
}
