use chartplan::descriptor::ServiceResponse;
use chartplan::profile::DatasetProfile;
use chartplan::render::{PlotRenderer, Renderer};
use chartplan::session::{PanelOutcome, Session, MISSING_VARIABLES_NOTICE};
use chartplan::{compile, parser, ChartFamily, Compiler, DatasetTable, RenderOptions, Scalar, Series};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn sales() -> DatasetTable {
    DatasetTable::load(Path::new("test/sales.csv")).expect("Failed to load sales fixture")
}

fn run_chartplan(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_chartplan"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn chartplan");

    if let Some(mut handle) = child.stdin.take() {
        if let Some(text) = stdin {
            handle.write_all(text.as_bytes()).expect("Failed to write stdin");
        }
    }

    child.wait_with_output().expect("Failed to wait for chartplan")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "chartplan failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

// ===== Library =====

#[test]
fn test_csv_fixture_loads_typed_cells() {
    let table = sales();
    assert_eq!(table.len(), 6);
    assert_eq!(table.columns(), vec!["region", "month", "sales", "units", "returns"]);
    assert_eq!(table.rows()[0].value("sales"), &Scalar::from(120.0));
    assert!(table.rows()[4].value("returns").is_null());
}

#[test]
fn test_bar_one_category_per_region() {
    let desc = parser::parse("bar(region, sales)").unwrap();
    let plan = compile(&sales(), &desc).unwrap();
    match &plan.series[0] {
        Series::CategoryValue(bar) => {
            let regions: Vec<String> = bar.categories.iter().map(|c| c.to_string()).collect();
            assert_eq!(regions, vec!["North", "South", "East"]);
            // First North row wins
            assert_eq!(bar.values[0], Scalar::from(120.0));
        }
        other => panic!("Expected bar series, got {:?}", other),
    }
}

#[test]
fn test_pie_counts_sum_to_row_count() {
    let table = sales();
    let plan = compile(&table, &parser::parse("donut(region)").unwrap()).unwrap();
    match &plan.series[0] {
        Series::Pie(pie) => {
            assert_eq!(pie.values.iter().sum::<usize>(), table.len());
            assert_eq!(pie.hole, 0.5);
        }
        other => panic!("Expected pie series, got {:?}", other),
    }
}

#[test]
fn test_heatmap_grid_matches_distinct_values() {
    let plan = compile(&sales(), &parser::parse("heatmap(region, month)").unwrap()).unwrap();
    match &plan.series[0] {
        Series::Heatmap(heat) => {
            assert_eq!(heat.x.len(), 3);
            assert_eq!(heat.y.len(), 3);
            assert_eq!(heat.z.len(), 3);
            assert!(heat.z.iter().all(|row| row.len() == 3));
            // East never appears in month 1
            assert_eq!(heat.z[0][2], Scalar::from(0.0));
        }
        other => panic!("Expected heatmap series, got {:?}", other),
    }
}

#[test]
fn test_json_rows_with_nulls() {
    let table = DatasetTable::load(Path::new("test/scores.json")).unwrap();
    let plan = compile(&table, &parser::parse("radar(student, math, reading)").unwrap()).unwrap();
    match &plan.series[0] {
        Series::Radar(radar) => {
            assert_eq!(radar.r[0], 78.0);
            // One missing reading score poisons the mean
            assert!(radar.r[1].is_nan());
        }
        other => panic!("Expected radar series, got {:?}", other),
    }
}

#[test]
fn test_session_suggestions_fixture() {
    let text = fs::read_to_string("test/suggestions.json").unwrap();
    let response: ServiceResponse = serde_json::from_str(&text).unwrap();
    let ServiceResponse::Suggestions(list) = response else {
        panic!("Expected a suggestion list");
    };

    let mut session = Session::default();
    session.load(sales(), None);
    let panels = session.compile_suggestions(&list).unwrap();

    assert_eq!(panels.len(), 4);
    assert!(panels[0].outcome.plan().is_some());
    assert_eq!(panels[1].outcome.plan().unwrap().family, ChartFamily::Pie);
    assert!(matches!(panels[2].outcome, PanelOutcome::Fallback { .. }));
    assert_eq!(
        panels[3].outcome,
        PanelOutcome::MissingVariables { notice: MISSING_VARIABLES_NOTICE.to_string() }
    );
}

#[test]
fn test_profile_fixture_sets_axis_kinds() {
    let profile = DatasetProfile::load(Path::new("test/profile.json")).unwrap();
    let plan = Compiler::default()
        .compile(&sales(), &parser::parse("line(month, sales)").unwrap(), Some(&profile))
        .unwrap();
    let x_axis = plan.layout.x_axis.unwrap();
    assert_eq!(serde_json::to_value(x_axis.kind).unwrap(), "category");
}

#[test]
fn test_plan_serializes_nan_as_null() {
    let table = DatasetTable::load(Path::new("test/scores.json")).unwrap();
    let plan = compile(&table, &parser::parse("radar(student, reading)").unwrap()).unwrap();
    let value = serde_json::to_value(&plan).unwrap();
    assert!(value["series"][0]["r"][0].is_null());
    assert_eq!(value["series"][0]["kind"], "radar");
}

#[test]
fn test_render_fixture_png() {
    let plan = compile(&sales(), &parser::parse("bar(region, sales)").unwrap()).unwrap();
    let bytes = PlotRenderer.render(&plan, &RenderOptions::default()).unwrap();
    assert!(is_valid_png(&bytes));
}

// ===== Binary =====

#[test]
fn test_cli_compile_shorthand() {
    let output = run_chartplan(
        &["compile", "--data", "test/sales.csv", "--descriptor", "pie(region) \"Share\""],
        None,
    );
    let plan = stdout_json(&output);
    assert_eq!(plan["family"], "pie");
    assert_eq!(plan["description"], "Share");
    assert_eq!(plan["series"][0]["values"], serde_json::json!([3, 2, 1]));
}

#[test]
fn test_cli_compile_descriptor_file() {
    let output = run_chartplan(
        &["compile", "--data", "test/sales.csv", "--descriptor-file", "test/bar_descriptor.json"],
        None,
    );
    let plan = stdout_json(&output);
    assert_eq!(plan["family"], "bar");
    assert_eq!(plan["layout"]["x_axis"]["tick_angle"], -45);
}

#[test]
fn test_cli_csv_from_stdin() {
    let csv = fs::read_to_string("test/sales.csv").unwrap();
    let output = run_chartplan(&["compile", "--data", "-", "--descriptor", "box(sales)"], Some(&csv));
    let plan = stdout_json(&output);
    assert_eq!(plan["series"][0]["values"].as_array().unwrap().len(), 6);
}

#[test]
fn test_cli_missing_variables_fails() {
    let output = run_chartplan(&["compile", "--data", "test/sales.csv", "--descriptor", "bar()"], None);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(MISSING_VARIABLES_NOTICE), "stderr: {}", stderr);
}

#[test]
fn test_cli_batch_query() {
    let output = run_chartplan(
        &["batch", "--data", "test/sales.csv", "--input", "test/query.json"],
        None,
    );
    let panels = stdout_json(&output);
    assert_eq!(panels["primary"]["outcome"], "chart");
    assert_eq!(panels["primary"]["description"], "Monthly trend");
    assert_eq!(panels["alternatives"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_describe_profile() {
    let output = run_chartplan(&["describe", "--profile", "test/profile.json"], None);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Standard Deviation: 28.93"));
    assert!(text.contains("16.67%"));
}

#[test]
fn test_cli_render_png() {
    let dir = std::env::temp_dir().join("chartplan_render_test");
    fs::create_dir_all(&dir).unwrap();
    let out = dir.join("bar.png");
    let output = run_chartplan(
        &[
            "render",
            "--data",
            "test/sales.csv",
            "--descriptor",
            "bar(region, sales)",
            "--output",
            out.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(is_valid_png(&fs::read(&out).unwrap()));
}
