// CSV import/export for taxonomies, mappings and sector-indexed tables

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use eeio_core::{Mapping, SectorVector, Table, Taxonomy};
use ndarray::{Array1, Array2};

use crate::error::IoError;

/// Read file and convert to UTF-8 if needed (statistical releases are often Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::debug!("{}: decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Delimiters seen in published BEA and CEDA extracts, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Field count of one line under `delim`, honoring quotes so that a label
/// such as `"Taxes on production and imports, less subsidies"` stays whole.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |r| r.len())
}

/// Pick the delimiter under which the header splits into columns and the
/// most sample rows agree with the header width.
///
/// Every input here is keyed by a code column, so a header with one field
/// means the candidate is wrong. With no usable candidate, comma.
fn sniff_delimiter(content: &str) -> u8 {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES);
    let Some(header) = lines.next() else {
        return b',';
    };
    let body: Vec<&str> = lines.collect();

    let mut best = (b',', 0usize);
    for delim in DELIMITERS {
        let width = field_count(header, delim);
        if width < 2 {
            continue;
        }
        // Header counts as one agreeing line.
        let agreeing = 1 + body.iter().filter(|l| field_count(l, delim) == width).count();
        let score = agreeing * width;
        if score > best.1 {
            best = (delim, score);
        }
    }
    best.0
}

struct Sheet {
    header: csv::StringRecord,
    rows: Vec<(u64, csv::StringRecord)>,
}

fn load(path: &Path) -> Result<Sheet, IoError> {
    let content = read_file_as_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&content))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let line_of = |e: &csv::Error| e.position().map_or(0, |p| p.line());
    let header = reader
        .headers()
        .map_err(|e| IoError::parse(path, line_of(&e), e.to_string()))?
        .clone();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::parse(path, line_of(&e), e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        rows.push((line, record));
    }
    Ok(Sheet { header, rows })
}

/// Empty cells are missing values (NaN); anything else must be a number.
fn parse_number(path: &Path, line: u64, field: &str) -> Result<f64, IoError> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse::<f64>()
        .map_err(|_| IoError::parse(path, line, format!("not a number: '{field}'")))
}

fn format_number(v: f64) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        String::new()
    }
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>, IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::read(path, e))?;
    }
    csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| IoError::read(path, e))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string())
}

// ---------------------------------------------------------------------------
// Taxonomies and mappings
// ---------------------------------------------------------------------------

/// `code[,label]` rows under a header line.
pub fn read_taxonomy(path: &Path, name: &str) -> Result<Taxonomy, IoError> {
    let sheet = load(path)?;
    let mut entries = Vec::with_capacity(sheet.rows.len());
    for (line, record) in &sheet.rows {
        let code = record.get(0).unwrap_or("");
        if code.is_empty() {
            return Err(IoError::parse(path, *line, "empty code"));
        }
        let label = record.get(1).filter(|l| !l.is_empty()).unwrap_or(code);
        entries.push((code.to_string(), label.to_string()));
    }
    Ok(Taxonomy::with_labels(name, entries)?)
}

pub fn write_taxonomy(path: &Path, taxonomy: &Taxonomy) -> Result<(), IoError> {
    let mut w = writer(path)?;
    w.write_record(["code", "label"]).map_err(|e| IoError::read(path, e))?;
    for (code, label) in taxonomy.iter() {
        w.write_record([code, label]).map_err(|e| IoError::read(path, e))?;
    }
    w.flush().map_err(|e| IoError::read(path, e))
}

/// `from,to` rows. A row with an empty `to` declares a code that maps nowhere.
pub fn read_mapping(path: &Path) -> Result<Mapping, IoError> {
    let sheet = load(path)?;
    let mut mapping = Mapping::new();
    for (line, record) in &sheet.rows {
        let from = record.get(0).unwrap_or("");
        if from.is_empty() {
            return Err(IoError::parse(path, *line, "empty source code"));
        }
        let targets = mapping.entry(from.to_string()).or_default();
        if let Some(to) = record.get(1).filter(|t| !t.is_empty()) {
            if !targets.iter().any(|t| t == to) {
                targets.push(to.to_string());
            }
        }
    }
    Ok(mapping)
}

pub fn write_mapping(path: &Path, mapping: &Mapping) -> Result<(), IoError> {
    let mut w = writer(path)?;
    w.write_record(["from", "to"]).map_err(|e| IoError::read(path, e))?;
    for (from, targets) in mapping {
        if targets.is_empty() {
            w.write_record([from.as_str(), ""]).map_err(|e| IoError::read(path, e))?;
        }
        for to in targets {
            w.write_record([from, to]).map_err(|e| IoError::read(path, e))?;
        }
    }
    w.flush().map_err(|e| IoError::read(path, e))
}

// ---------------------------------------------------------------------------
// Schema checks
// ---------------------------------------------------------------------------

/// Describe how `found` differs from `expected` as sets, or `None` if equal.
fn code_diff(found: &[String], expected: &Taxonomy) -> Option<String> {
    let found: BTreeSet<&str> = found.iter().map(String::as_str).collect();
    let want: BTreeSet<&str> = expected.codes().iter().map(String::as_str).collect();
    let missing: Vec<&str> = want.difference(&found).copied().collect();
    let extra: Vec<&str> = found.difference(&want).copied().collect();
    if missing.is_empty() && extra.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing {}", missing.join(", ")));
    }
    if !extra.is_empty() {
        parts.push(format!("unexpected {}", extra.join(", ")));
    }
    Some(format!("{} codes: {}", expected.name(), parts.join("; ")))
}

/// Row and column identity (same codes, same order) against the expected taxonomies.
pub fn check_schema(
    path: &Path,
    table: &Table,
    rows: &Taxonomy,
    cols: &Taxonomy,
) -> Result<(), IoError> {
    for (found, expected, axis) in [(table.rows(), rows, "rows"), (table.cols(), cols, "columns")] {
        if let Some(diff) = code_diff(found.codes(), expected) {
            return Err(IoError::schema(path, format!("{axis}: {diff}")));
        }
        if found.codes() != expected.codes() {
            return Err(IoError::schema(
                path,
                format!("{axis} are not in {} order", expected.name()),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Header row of column codes (first cell is a corner label); each further
/// row is a row code followed by one value per column.
pub fn read_table(path: &Path) -> Result<Table, IoError> {
    read_table_as(path, None, None)
}

/// Read a table and conform each given axis to the expected taxonomy.
///
/// The file must carry exactly the expected codes on that axis, in any
/// order; the result is in taxonomy order.
pub fn read_table_as(
    path: &Path,
    rows: Option<&Arc<Taxonomy>>,
    cols: Option<&Arc<Taxonomy>>,
) -> Result<Table, IoError> {
    let sheet = load(path)?;
    let col_codes: Vec<String> = sheet.header.iter().skip(1).map(str::to_string).collect();
    let mut row_codes = Vec::with_capacity(sheet.rows.len());
    let mut values = Vec::with_capacity(sheet.rows.len() * col_codes.len());
    for (line, record) in &sheet.rows {
        let code = record.get(0).unwrap_or("");
        if code.is_empty() {
            return Err(IoError::parse(path, *line, "empty row code"));
        }
        if record.len() - 1 != col_codes.len() {
            return Err(IoError::parse(
                path,
                *line,
                format!("expected {} values, found {}", col_codes.len(), record.len() - 1),
            ));
        }
        row_codes.push(code.to_string());
        for field in record.iter().skip(1) {
            values.push(parse_number(path, *line, field)?);
        }
    }

    for (found, expected, axis) in [(&row_codes, rows, "rows"), (&col_codes, cols, "columns")] {
        if let Some(diff) = expected.and_then(|t| code_diff(found, t)) {
            return Err(IoError::schema(path, format!("{axis}: {diff}")));
        }
    }

    let name = stem(path);
    let file_rows = Taxonomy::new(&format!("{name}_rows"), row_codes)?.shared();
    let file_cols = Taxonomy::new(&format!("{name}_cols"), col_codes)?.shared();
    let values = Array2::from_shape_vec((file_rows.len(), file_cols.len()), values)
        .map_err(|e| IoError::parse(path, 0, e.to_string()))?;
    let table = Table::new(file_rows.clone(), file_cols.clone(), values)?;
    log::debug!("{}: read {}x{} table", path.display(), file_rows.len(), file_cols.len());

    Ok(table.reindex(
        rows.cloned().unwrap_or(file_rows),
        cols.cloned().unwrap_or(file_cols),
    ))
}

pub fn write_table(path: &Path, table: &Table) -> Result<(), IoError> {
    let mut w = writer(path)?;
    let mut header = vec!["code".to_string()];
    header.extend(table.cols().codes().iter().cloned());
    w.write_record(&header).map_err(|e| IoError::read(path, e))?;
    for (i, code) in table.rows().codes().iter().enumerate() {
        let mut record = Vec::with_capacity(table.cols().len() + 1);
        record.push(code.clone());
        record.extend(table.values().row(i).iter().map(|v| format_number(*v)));
        w.write_record(&record).map_err(|e| IoError::read(path, e))?;
    }
    w.flush().map_err(|e| IoError::read(path, e))
}

/// Write after checking row/column identity against the declared taxonomies.
pub fn write_table_as(
    path: &Path,
    table: &Table,
    rows: &Taxonomy,
    cols: &Taxonomy,
) -> Result<(), IoError> {
    check_schema(path, table, rows, cols)?;
    write_table(path, table)
}

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

/// `code,value` rows under a header line.
pub fn read_vector(path: &Path) -> Result<SectorVector, IoError> {
    read_vector_as(path, None)
}

pub fn read_vector_as(path: &Path, index: Option<&Arc<Taxonomy>>) -> Result<SectorVector, IoError> {
    let sheet = load(path)?;
    let mut codes = Vec::with_capacity(sheet.rows.len());
    let mut values = Vec::with_capacity(sheet.rows.len());
    for (line, record) in &sheet.rows {
        let code = record.get(0).unwrap_or("");
        if code.is_empty() {
            return Err(IoError::parse(path, *line, "empty code"));
        }
        codes.push(code.to_string());
        values.push(parse_number(path, *line, record.get(1).unwrap_or(""))?);
    }
    if let Some(diff) = index.and_then(|t| code_diff(&codes, t)) {
        return Err(IoError::schema(path, diff));
    }
    let file_index = Taxonomy::new(&stem(path), codes)?.shared();
    let v = SectorVector::new(file_index.clone(), Array1::from(values))?;
    Ok(v.reindex(index.cloned().unwrap_or(file_index)))
}

pub fn write_vector(path: &Path, v: &SectorVector) -> Result<(), IoError> {
    let mut w = writer(path)?;
    w.write_record(["code", "value"]).map_err(|e| IoError::read(path, e))?;
    for (code, value) in v.iter() {
        w.write_record([code.to_string(), format_number(value)])
            .map_err(|e| IoError::read(path, e))?;
    }
    w.flush().map_err(|e| IoError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "code;label\n111CA0;Farms\n113FF0;Forestry\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "code\tlabel\n111CA0\tFarms\n113FF0\tForestry\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_ignores_commas_inside_labels() {
        let content = "code;label\nV00200;Taxes on production, less subsidies\nV00300;Gross operating surplus\n";
        assert_eq!(sniff_delimiter(content), b';');
        let quoted = "code,label\nV00200,\"Taxes on production; less subsidies\"\nV00300,Surplus\n";
        assert_eq!(sniff_delimiter(quoted), b',');
    }

    #[test]
    fn test_sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("code\n111CA0\n113FF0\n"), b',');
    }

    #[test]
    fn test_windows_1252_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        // 0xE9 is e-acute in Windows-1252 and invalid as a lone UTF-8 byte
        fs::write(&path, b"code,label\nA,Caf\xe9s\n").unwrap();
        let tax = read_taxonomy(&path, "t").unwrap();
        assert_eq!(tax.label("A"), Some("Caf\u{e9}s"));
    }

    #[test]
    fn test_mapping_keeps_unmapped_codes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.csv");
        fs::write(&path, "from,to\nA,x\nA,y\nA,x\nB,\n").unwrap();
        let m = read_mapping(&path).unwrap();
        assert_eq!(m["A"], vec!["x".to_string(), "y".to_string()]);
        assert!(m["B"].is_empty());
    }

    #[test]
    fn test_bad_number_names_the_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "code,a,b\nr1,1,2\nr2,3,abc\n").unwrap();
        match read_table(&path).unwrap_err() {
            IoError::Parse { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "code,a,b\nr1,1\n").unwrap();
        assert!(matches!(read_table(&path).unwrap_err(), IoError::Parse { .. }));
    }
}
