// Table and vector files against declared taxonomies.

use std::fs;

use eeio_core::Taxonomy;
use eeio_io::{
    read_table, read_table_as, read_taxonomy, read_vector_as, write_table, write_table_as,
    write_vector, IoError,
};
use tempfile::tempdir;

#[test]
fn reordered_file_conforms_to_taxonomy_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("use.csv");
    fs::write(&path, "commodity,B,A\ny,4,3\nx,2,1\n").unwrap();

    let rows = Taxonomy::new("commodity", ["x", "y"]).unwrap().shared();
    let cols = Taxonomy::new("industry", ["A", "B"]).unwrap().shared();
    let t = read_table_as(&path, Some(&rows), Some(&cols)).unwrap();
    assert_eq!(t.rows().codes(), rows.codes());
    assert_eq!(t.get("x", "A"), Some(1.0));
    assert_eq!(t.get("y", "B"), Some(4.0));
}

#[test]
fn schema_error_lists_missing_and_unexpected_codes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("use.csv");
    fs::write(&path, "code,A,Z\nx,1,2\n").unwrap();

    let cols = Taxonomy::new("industry", ["A", "B"]).unwrap().shared();
    match read_table_as(&path, None, Some(&cols)).unwrap_err() {
        IoError::Schema { message, .. } => {
            assert!(message.contains("missing B"), "{message}");
            assert!(message.contains("unexpected Z"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_cells_are_missing_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.csv");
    fs::write(&path, "code,A,B\nx,1,\n").unwrap();
    let t = read_table(&path).unwrap();
    assert_eq!(t.missing_cells(), vec![("x".to_string(), "B".to_string())]);
}

#[test]
fn written_table_reads_back() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("in.csv");
    fs::write(&src, "code;A;B\nx;0.1;2.5\ny;-3;1e3\n").unwrap();
    let t = read_table(&src).unwrap();

    let out = dir.path().join("nested").join("out.csv");
    write_table_as(&out, &t, t.rows(), t.cols()).unwrap();
    let back = read_table(&out).unwrap();
    assert_eq!(back.values(), t.values());
    assert_eq!(back.get("y", "B"), Some(1000.0));
}

#[test]
fn write_refuses_a_table_in_the_wrong_order() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("in.csv");
    fs::write(&src, "code,A,B\nx,1,2\n").unwrap();
    let t = read_table(&src).unwrap();

    let reversed = Taxonomy::new("industry", ["B", "A"]).unwrap();
    let out = dir.path().join("out.csv");
    let err = write_table_as(&out, &t, t.rows(), &reversed).unwrap_err();
    assert!(matches!(err, IoError::Schema { .. }));
    assert!(!out.exists());
    write_table(&out, &t).unwrap();
    assert!(out.exists());
}

#[test]
fn vector_and_taxonomy_files() {
    let dir = tempdir().unwrap();
    let tax_path = dir.path().join("sectors.csv");
    fs::write(&tax_path, "code,label\n221100,Electric power\n327310,\n").unwrap();
    let sectors = read_taxonomy(&tax_path, "ceda").unwrap().shared();
    assert_eq!(sectors.label("221100"), Some("Electric power"));
    assert_eq!(sectors.label("327310"), Some("327310"));

    let v_path = dir.path().join("gross_output.csv");
    fs::write(&v_path, "code,value\n327310,5\n221100,7\n").unwrap();
    let v = read_vector_as(&v_path, Some(&sectors)).unwrap();
    assert_eq!(v.values().to_vec(), vec![7.0, 5.0]);

    let out = dir.path().join("copy.csv");
    write_vector(&out, &v).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "code,value\n221100,7\n327310,5\n");
}
