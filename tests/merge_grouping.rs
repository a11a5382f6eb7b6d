use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use cohort_prep::ingestion::csv::RawTable;
use cohort_prep::ingestion::merge::{list_csv_files, merge_directory, plan_groups};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("cohort_prep_{name}_{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn non_csv_files_are_skipped() {
    let dir = temp_dir("list");
    write(&dir, "patients_a.csv", "PatientID\n1\n");
    write(&dir, "README.txt", "notes");
    fs::create_dir_all(dir.join("nested.csv")).unwrap();

    let names = list_csv_files(&dir).unwrap();
    let _ = fs::remove_dir_all(&dir);

    assert_eq!(names, vec!["patients_a.csv".to_string()]);
}

#[test]
fn shards_merge_with_column_union() {
    let input = temp_dir("merge_in");
    let output = temp_dir("merge_out");
    write(&input, "patients_a.csv", "PatientID,Age,Status\n1,40,stable\n2,50,critical\n");
    write(&input, "patients_a_v2.csv", "PatientID,Age,Site\n3,60,north\n");
    write(&input, "labs_b.csv", "PatientID,Marker\n1,0.5\n");

    let groups = plan_groups(&input, 85).unwrap();
    let reps: Vec<&str> = groups.iter().map(|g| g.representative.as_str()).collect();
    assert_eq!(reps, vec!["labs_b.csv", "patients_a.csv"]);

    let merged = merge_directory(&input, &output, 85).unwrap();
    assert_eq!(merged.len(), 2);

    let (group, result) = &merged[1];
    assert_eq!(group.members, vec!["patients_a.csv".to_string(), "patients_a_v2.csv".to_string()]);
    let merged_group = result.as_ref().unwrap();
    assert_eq!(merged_group.path, output.join("merged_patients_a.csv"));

    let table = RawTable::from_path(&merged_group.path).unwrap();
    assert_eq!(table.headers, vec!["PatientID", "Age", "Status", "Site"]);
    assert_eq!(table.records.len(), 3);
    assert_eq!(table.records[2], vec!["3", "60", "", "north"]);

    let _ = fs::remove_dir_all(&input);
    let _ = fs::remove_dir_all(&output);
}

#[test]
fn unreadable_shard_fails_only_its_group() {
    let input = temp_dir("ragged_in");
    let output = temp_dir("ragged_out");
    write(&input, "labs_b.csv", "PatientID,Marker\n1,0.5\n");
    write(&input, "patients_a.csv", "PatientID,Age\n1,40,extra\n");

    let merged = merge_directory(&input, &output, 85).unwrap();
    let _ = fs::remove_dir_all(&input);
    let _ = fs::remove_dir_all(&output);

    assert!(merged[0].1.is_ok());
    assert!(merged[1].1.is_err());
}
