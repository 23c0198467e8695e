use std::fs;
use std::process::Command;

use tempfile::tempdir;

const SIGNALS: &str = "paper_id,year,dataset,author_name,position,p_female,journal\n\
1,2016,cs,Ada Li,first,0.9,Nature\n\
1,2016,cs,Tom Hart,last,0.2,Nature\n\
2,2019,q-bio,Mei Wu,first,0.7,Cell\n\
2,2019,q-bio,J. Roe,second,,Cell\n\
2,2019,q-bio,Eva Holm,last,0.4,Cell\n\
3,2021,cs,Ravi Rao,first,0.3,Obscure Letters\n\
3,2021,cs,Ida Berg,last,0.6,Obscure Letters\n";

#[test]
fn analyze_writes_one_table_per_analysis() {
    let tmp = tempdir().expect("temporary directory");
    let signals_path = tmp.path().join("signals.csv");
    fs::write(&signals_path, SIGNALS).expect("write signals");
    let out_dir = tmp.path().join("results");

    let exe = env!("CARGO_BIN_EXE_pfemale");
    let status = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "analyze",
            signals_path.to_str().expect("path str"),
            "--iterations",
            "200",
            "--seed",
            "17",
            "--out-dir",
            out_dir.to_str().expect("path str"),
        ])
        .status()
        .expect("run pfemale cli");

    assert!(status.success(), "CLI exited with status {status:?}");
    for name in ["position_breakdown", "temporal_trend", "arxiv_position", "covid_impact"] {
        assert!(
            out_dir.join(format!("analysis_{name}.csv")).exists(),
            "analysis_{name}.csv missing"
        );
    }
    assert!(!out_dir.join("analysis_quartile_year.csv").exists());

    let positions =
        fs::read_to_string(out_dir.join("analysis_position_breakdown.csv")).expect("read output");
    let lines: Vec<&str> = positions.lines().collect();
    assert_eq!(lines[0], "dataset,position,mean,ci_lower,ci_upper,n_samples");
    assert!(lines[1].starts_with("cs,first,"));
    assert!(lines.iter().any(|l| l.starts_with("q-bio,second,,,,0")));
}

#[test]
fn bootstrap_is_reproducible_with_a_seed() {
    let tmp = tempdir().expect("temporary directory");
    let signals_path = tmp.path().join("signals.csv");
    fs::write(&signals_path, SIGNALS).expect("write signals");

    let exe = env!("CARGO_BIN_EXE_pfemale");
    let run = |output: &str| {
        let status = Command::new(exe)
            .current_dir(tmp.path())
            .args([
                "bootstrap",
                signals_path.to_str().expect("path str"),
                "--group-by",
                "dataset,year",
                "--iterations",
                "300",
                "--seed",
                "99",
                "--output",
                output,
            ])
            .status()
            .expect("run pfemale cli");
        assert!(status.success(), "CLI exited with status {status:?}");
        fs::read_to_string(tmp.path().join(output)).expect("read output")
    };

    let first = run("first.tsv");
    let second = run("second.tsv");
    assert_eq!(first, second);
    assert!(first.starts_with("dataset\tyear\tmean"));
    assert_eq!(first.lines().count(), 4);
}

#[test]
fn invalid_probabilities_fail_the_run() {
    let tmp = tempdir().expect("temporary directory");
    let signals_path = tmp.path().join("signals.csv");
    fs::write(&signals_path, "dataset,p_female\ncs,0.5\ncs,1.7\n").expect("write signals");

    let exe = env!("CARGO_BIN_EXE_pfemale");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "bootstrap",
            signals_path.to_str().expect("path str"),
            "--group-by",
            "dataset",
        ])
        .output()
        .expect("run pfemale cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "stderr was: {stderr}");
    assert!(!tmp.path().join("bootstrap.csv").exists());
}

#[test]
fn plan_prints_a_loadable_default() {
    let tmp = tempdir().expect("temporary directory");
    let exe = env!("CARGO_BIN_EXE_pfemale");
    let output = Command::new(exe)
        .arg("plan")
        .output()
        .expect("run pfemale cli");
    assert!(output.status.success());

    let plan_path = tmp.path().join("plan.toml");
    fs::write(&plan_path, &output.stdout).expect("write plan");
    let plan = pfemale::plan::AnalysisPlan::load(&plan_path).expect("load printed plan");
    assert_eq!(plan, pfemale::plan::AnalysisPlan::default());
}
