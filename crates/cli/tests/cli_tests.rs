// End-to-end runs of the `eeio` binary over small fixture directories.
// Run with: cargo test -p eeio-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use eeio_emissions::{EmissionsSource, Gas, Registry, WeightKey};
use tempfile::tempdir;

fn eeio(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_eeio"))
        .args(args)
        .output()
        .expect("run eeio")
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// Three sectors aggregating into two: A stays, B and C become BC.
fn aggregation_fixture(dir: &Path, mapping: &str) {
    write(dir, "fine.csv", "code,label\nA,Alpha\nB,Beta\nC,Gamma\n");
    write(dir, "coarse.csv", "code,label\nA,Alpha\nBC,Beta and Gamma\n");
    write(dir, "fine__coarse.csv", mapping);
    write(dir, "base.csv", "code,A,B,C\nA,100,10,0\nB,5,200,0\nC,0,0,300\n");
    write(dir, "weights.csv", "code,A,BC\nA,1,0\nBC,0,0.6\n");
    write(
        dir,
        "use.reflect.toml",
        r#"
name = "fine -> coarse"

[inputs]
base = "base.csv"
weights = "weights.csv"

[inputs.rows]
domain = "fine.csv"
range = "coarse.csv"
mapping = "fine__coarse.csv"
complete = true

[inputs.cols]
domain = "fine.csv"
range = "coarse.csv"
mapping = "fine__coarse.csv"
complete = true

[output]
table = "out/reflected.csv"
json = "out/report.json"
"#,
    );
}

// ---------------------------------------------------------------------------
// reflect
// ---------------------------------------------------------------------------

#[test]
fn reflect_run_writes_table_and_report() {
    let dir = tempdir().unwrap();
    aggregation_fixture(dir.path(), "from,to\nA,A\nB,BC\nC,BC\n");
    let config = dir.path().join("use.reflect.toml");

    let out = eeio(&["reflect", "run", config.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(summary["rows"], 2);
    assert_eq!(summary["total"].as_f64(), Some(615.0));
    assert_eq!(summary["diagnostics"]["summary"]["failed"], 0);
    assert_eq!(summary["round_trip"]["equal_split_cells"], 2);

    let table = fs::read_to_string(dir.path().join("out/reflected.csv")).unwrap();
    assert_eq!(table, "code,A,BC\nA,100,10\nBC,5,500\n");
    assert!(dir.path().join("out/report.json").exists());
}

#[test]
fn reflect_validate_builds_correspondences_only() {
    let dir = tempdir().unwrap();
    aggregation_fixture(dir.path(), "from,to\nA,A\nB,BC\nC,BC\n");
    let config = dir.path().join("use.reflect.toml");

    let out = eeio(&["reflect", "validate", config.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("config valid"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn uncovered_code_fails_with_coverage_exit_code() {
    let dir = tempdir().unwrap();
    aggregation_fixture(dir.path(), "from,to\nA,A\nB,BC\n");
    let config = dir.path().join("use.reflect.toml");

    let out = eeio(&["reflect", "run", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(11));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not covered"), "{stderr}");
    assert!(stderr.contains("expected_row_dropped"), "{stderr}");
    assert!(!dir.path().join("out/reflected.csv").exists());
}

#[test]
fn invalid_config_exit_code() {
    let dir = tempdir().unwrap();
    aggregation_fixture(dir.path(), "from,to\nA,A\nB,BC\nC,BC\n");
    let config = dir.path().join("use.reflect.toml");
    let content = fs::read_to_string(&config)
        .unwrap()
        .replace("weights = \"weights.csv\"\n", "");
    fs::write(&config, content).unwrap();

    let out = eeio(&["reflect", "validate", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn schema_mismatch_in_weights_exit_code() {
    let dir = tempdir().unwrap();
    aggregation_fixture(dir.path(), "from,to\nA,A\nB,BC\nC,BC\n");
    write(dir.path(), "weights.csv", "code,A,BCD\nA,1,0\nBC,0,0.6\n");
    let config = dir.path().join("use.reflect.toml");

    let out = eeio(&["reflect", "run", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unexpected BCD"));
}

/// Value-added rows by industry. Row taxonomies are named, not given as files.
fn value_added_fixture(dir: &Path) -> std::path::PathBuf {
    fs::create_dir(dir.join("tax")).unwrap();
    write(dir, "tax/bea_2017_industry.csv", "code,label\n111CA,Farms\n211,Oil and gas extraction\n");
    write(dir, "sectors.csv", "code,label\n111CA,Farms\n211,Oil and gas extraction\n");
    write(dir, "va__va.csv", "from,to\nV00100,V00100\nV00200,V00200\nV00300,V00300\n");
    write(dir, "industry__sectors.csv", "from,to\n111CA,111CA\n211,211\n");
    write(dir, "va.csv", "code,111CA,211\nV00100,10,20\nV00200,1,2\nV00300,5,5\n");
    write(dir, "va_weights.csv", "code,111CA,211\nV00100,1,1\nV00200,1,1\nV00300,1,1\n");
    let config = dir.join("va.reflect.toml");
    fs::write(
        &config,
        r#"
name = "value added -> cornerstone"

[inputs]
base = "va.csv"
weights = "va_weights.csv"
taxonomy_dir = "tax"

[inputs.rows]
domain = "bea_2017_value_added"
range = "cornerstone_value_added"
mapping = "va__va.csv"
complete = true

[inputs.cols]
domain = "bea_2017_industry"
range = "sectors.csv"
mapping = "industry__sectors.csv"
"#,
    )
    .unwrap();
    config
}

#[test]
fn reflect_run_resolves_named_taxonomies() {
    let dir = tempdir().unwrap();
    let config = value_added_fixture(dir.path());

    let out = eeio(&["reflect", "run", config.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(summary["rows"], 3);
    assert_eq!(summary["cols"], 2);
    assert_eq!(summary["total"].as_f64(), Some(43.0));
    assert!(summary.get("source").is_none());
}

#[test]
fn reflect_source_vintage_must_match_named_domain() {
    let dir = tempdir().unwrap();
    let config = value_added_fixture(dir.path());
    let content = fs::read_to_string(&config).unwrap().replace(
        "[inputs]\n",
        "[source]\nkind = \"make\"\nvintage = { granularity = \"detail\", year = 2012 }\n\n[inputs]\n",
    );
    fs::write(&config, content).unwrap();

    let out = eeio(&["reflect", "validate", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("inputs.rows.domain is bea_2017_value_added"), "{stderr}");
}

// ---------------------------------------------------------------------------
// registry
// ---------------------------------------------------------------------------

#[test]
fn registry_check_standard() {
    let out = eeio(&["registry", "check"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&format!("{} sources", EmissionsSource::ALL.len())), "{stdout}");
}

#[test]
fn registry_check_rejects_orphaned_override() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "bad.registry.toml",
        "name = \"bad\"\n\n[overrides.co2_perpetual_motion]\nrule = \"sectors\"\nsectors = [\"221100\"]\n",
    );
    let config = dir.path().join("bad.registry.toml");
    let out = eeio(&["registry", "check", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(20));
    assert!(String::from_utf8_lossy(&out.stderr).contains("co2_perpetual_motion"));
}

/// Synthetic economy covering every sector the standard registry names,
/// with an inventory of 1000 per source.
fn registry_fixture(dir: &Path, extra_inputs: &str) -> std::path::PathBuf {
    let registry = Registry::standard();
    let mut sectors = registry.referenced_sectors();
    sectors.insert("541100".to_string());

    let mut taxonomy = String::from("code,label\n");
    let mut gross = String::from("code,value\n");
    for s in &sectors {
        taxonomy.push_str(&format!("{s},\n"));
        gross.push_str(&format!("{s},1\n"));
    }
    write(dir, "sectors.csv", &taxonomy);
    write(dir, "gross_output.csv", &gross);

    let mut usage = String::from("commodity");
    for s in &sectors {
        usage.push_str(&format!(",{s}"));
    }
    usage.push('\n');
    for key in registry.required_keys() {
        if let WeightKey::CommodityUse(commodity) = key {
            usage.push_str(&commodity);
            for _ in &sectors {
                usage.push_str(",2");
            }
            usage.push('\n');
        }
    }
    write(dir, "commodity_use.csv", &usage);

    let mut inventory = String::from("source,total\n");
    for source in EmissionsSource::ALL {
        inventory.push_str(&format!("{},1000\n", source.code()));
    }
    write(dir, "inventory.csv", &inventory);

    write(
        dir,
        "ceda.registry.toml",
        &format!(
            r#"
name = "synthetic"

[inputs]
sectors = "sectors.csv"
inventory = "inventory.csv"
gross_output = "gross_output.csv"
commodity_use = "commodity_use.csv"
{extra_inputs}
[output]
matrix = "out/emissions.csv"
by_gas = "out/by_gas.csv"
"#
        ),
    );
    dir.join("ceda.registry.toml")
}

#[test]
fn registry_build_writes_matrix() {
    let dir = tempdir().unwrap();
    let config = registry_fixture(dir.path(), "");
    let out = eeio(&["registry", "build", config.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(summary["sources"], EmissionsSource::ALL.len());
    let total = summary["total"].as_f64().unwrap();
    assert!((total - 1000.0 * EmissionsSource::ALL.len() as f64).abs() < 1e-6);
    assert_eq!(summary["diagnostics"]["summary"]["failed"], 0);

    let matrix = fs::read_to_string(dir.path().join("out/emissions.csv")).unwrap();
    assert_eq!(matrix.lines().count(), EmissionsSource::ALL.len() + 1);
    assert!(dir.path().join("out/by_gas.csv").exists());
}

#[test]
fn registry_build_reconciles_gas_totals_with_reference() {
    let dir = tempdir().unwrap();
    let nf3_sources = EmissionsSource::ALL.iter().filter(|s| s.gas() == Gas::Nf3).count();
    write(
        dir.path(),
        "ghgi_by_gas.csv",
        &format!("gas,total\nNF3,{}\n", 1000.0 * nf3_sources as f64 * 1.02),
    );
    let config = registry_fixture(dir.path(), "reference_by_gas = \"ghgi_by_gas.csv\"\n");

    let out = eeio(&["registry", "build", config.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(summary["diagnostics"]["summary"]["total"], 1);
    assert_eq!(summary["diagnostics"]["summary"]["passed"], 1);
}

#[test]
fn registry_build_fails_when_a_source_drifts_from_reference() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "ghgi_by_source.csv",
        "source,total\nco2_cement_production,1100\nco2_residential,1000\n",
    );
    let config = registry_fixture(dir.path(), "reference_by_source = \"ghgi_by_source.csv\"\n");

    let out = eeio(&["registry", "build", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(22));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("co2_cement_production"), "{stderr}");
    assert!(!dir.path().join("out/emissions.csv").exists());
}

#[test]
fn registry_build_rejects_unknown_gas_in_reference() {
    let dir = tempdir().unwrap();
    write(dir.path(), "ghgi_by_gas.csv", "gas,total\nH2O,5\n");
    let config = registry_fixture(dir.path(), "reference_by_gas = \"ghgi_by_gas.csv\"\n");

    let out = eeio(&["registry", "build", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown gas 'H2O'"));
}
