#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use csv::ReaderBuilder;
use serde_json::Value;
use tempfile::TempDir;

fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("catalog.txt");
    (dir, data)
}

fn dynasty(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("dynasty");
    cmd.env("DYNASTY_CONFIG", dir.join("cli.toml"))
        .env_remove("DYNASTY_DATA")
        .env("NO_COLOR", "1");
    cmd
}

fn seeded() -> (TempDir, PathBuf) {
    let (dir, data) = workspace();
    dynasty(dir.path())
        .args(["seed-demo", "--data"])
        .arg(&data)
        .assert()
        .success();
    (dir, data)
}

fn json(dir: &Path, data: &Path, args: &[&str]) -> Value {
    let output = dynasty(dir)
        .args(args)
        .arg("--data")
        .arg(data)
        .args(["--format", "json"])
        .output()
        .expect("run dynasty");
    assert!(
        output.status.success(),
        "dynasty {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn seed_demo_writes_sectioned_file() {
    let (_dir, data) = seeded();
    let text = fs::read_to_string(&data).expect("read data file");
    for header in ["[SERIES]", "[TECH]", "[MODEL]", "[MODEL_TECH]"] {
        assert!(text.contains(header), "missing {header}");
    }
    assert!(text.contains("9001,汉EV,1,20.98,605,EV,轿车,5,2020"));
}

#[test]
fn seed_demo_refuses_to_overwrite_without_force() {
    let (dir, data) = seeded();
    dynasty(dir.path())
        .args(["seed-demo", "--data"])
        .arg(&data)
        .assert()
        .failure();
    dynasty(dir.path())
        .args(["seed-demo", "--force", "--data"])
        .arg(&data)
        .assert()
        .success();
}

#[test]
fn list_orders_by_price_and_filters() {
    let (dir, data) = seeded();
    let all = json(dir.path(), &data, &["list"]);
    let models = all.as_array().expect("array");
    assert_eq!(models.len(), 12);
    assert_eq!(models[0]["model_name"], "海鸥");
    assert_eq!(models[11]["model_name"], "仰望U9");

    let ocean_ev = json(
        dir.path(),
        &data,
        &["list", "--series", "2", "--energy", "EV"],
    );
    let names: Vec<&str> = ocean_ev
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|model| model["model_name"].as_str())
        .collect();
    assert_eq!(names, vec!["海鸥", "海豚", "海豹"]);
}

#[test]
fn show_joins_series_and_techs() {
    let (dir, data) = seeded();
    let han = json(dir.path(), &data, &["show", "9001"]);
    assert_eq!(han["series_name"], "王朝");
    assert_eq!(han["tech_ids"], serde_json::json!([101, 102, 104]));
    assert_eq!(
        han["techs"],
        serde_json::json!(["e平台3.0", "刀片电池", "DiPilot"])
    );

    let mut show = dynasty(dir.path());
    show.args(["show", "1234", "--data"]).arg(&data);
    fails_with(show, "not found");
}

#[test]
fn search_matches_tech_names() {
    let (dir, data) = seeded();
    let hits = json(dir.path(), &data, &["search", "云辇"]);
    let ids: Vec<i64> = hits
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|model| model["model_id"].as_i64())
        .collect();
    assert_eq!(ids, vec![9010, 9011, 9012]);
}

#[test]
fn stats_match_demo_counts() {
    let (dir, data) = seeded();
    let stats = json(dir.path(), &data, &["stats"]);
    assert_eq!(stats["series_count"], 5);
    assert_eq!(stats["tech_count"], 6);
    assert_eq!(stats["model_count"], 12);
    assert_eq!(stats["association_count"], 30);
    assert_eq!(stats["ev_count"], 5);
    assert_eq!(stats["phev_count"], 7);
    assert_eq!(stats["node_count"], 24);
    assert_eq!(stats["edge_count"], 47);
}

#[test]
fn add_model_requires_a_tech_unless_deferred() {
    let (dir, data) = seeded();
    let mut bare = dynasty(dir.path());
    bare.args([
        "add-model", "--name", "元PLUS", "--series", "2", "--price", "13.58", "--energy", "EV",
        "--data",
    ])
    .arg(&data);
    fails_with(bare, "at least one technology");

    let added = json(
        dir.path(),
        &data,
        &[
            "add-model", "--name", "元PLUS", "--series", "2", "--price", "13.58", "--energy",
            "EV", "--tech", "101", "--tech", "102",
        ],
    );
    assert_eq!(added["model_id"], 9013);
    assert_eq!(added["tech_ids"], serde_json::json!([101, 102]));

    let deferred = json(
        dir.path(),
        &data,
        &[
            "add-model", "--name", "海狮", "--series", "2", "--price", "18.98", "--energy", "EV",
            "--deferred",
        ],
    );
    assert_eq!(deferred["model_id"], 9014);
    assert_eq!(deferred["tech_ids"], serde_json::json!([]));

    let linked = json(dir.path(), &data, &["link", "9014", "101"]);
    assert_eq!(linked["created"], true);
    let again = json(dir.path(), &data, &["link", "9014", "101"]);
    assert_eq!(again["created"], false);

    let report = json(dir.path(), &data, &["verify"]);
    assert_eq!(report["success"], true);
    assert_eq!(report["counts"]["models"], 14);
}

#[test]
fn add_model_rejects_unknown_series() {
    let (dir, data) = seeded();
    dynasty(dir.path())
        .args([
            "add-model", "--name", "幽灵", "--series", "99", "--price", "10", "--energy", "EV",
            "--tech", "101", "--data",
        ])
        .arg(&data)
        .assert()
        .failure();
    let stats = json(dir.path(), &data, &["stats"]);
    assert_eq!(stats["model_count"], 12);
}

#[test]
fn names_with_delimiters_survive_the_next_invocation() {
    let (dir, data) = seeded();
    let added = json(
        dir.path(),
        &data,
        &[
            "add-model", "--name", "海豹,EV", "--series", "2", "--price", "18.98", "--energy",
            "EV", "--body", " 轿车 ", "--tech", "101", "--tech", "102",
        ],
    );
    assert_eq!(added["model_id"], 9013);

    let shown = json(dir.path(), &data, &["show", "9013"]);
    assert_eq!(shown["model_name"], "海豹,EV");
    assert_eq!(shown["body_type"], " 轿车 ");
    assert_eq!(shown["series_name"], "海洋");

    let series = json(
        dir.path(),
        &data,
        &["add-series", "--name", "王朝,Dynasty", "--intro", "第一行\n第二行"],
    );
    let id = series["series_id"].as_i64().expect("series id");
    let listed = json(dir.path(), &data, &["series"]);
    let names: Vec<&str> = listed
        .as_array()
        .expect("array")
        .iter()
        .filter(|row| row["series_id"] == id)
        .filter_map(|row| row["series_name"].as_str())
        .collect();
    assert_eq!(names, vec!["王朝,Dynasty"]);
    assert_eq!(json(dir.path(), &data, &["verify"])["success"], true);
}

#[test]
fn add_series_and_tech_allocate_ids() {
    let (dir, data) = seeded();
    let series = json(
        dir.path(),
        &data,
        &["add-series", "--name", "腾势N", "--intro", "高端"],
    );
    assert_eq!(series["series_id"], 6);
    let tech = json(dir.path(), &data, &["add-tech", "--name", "天神之眼"]);
    assert_eq!(tech["tech_id"], 200);
    dynasty(dir.path())
        .args(["add-tech", "--name", "天神之眼", "--data"])
        .arg(&data)
        .assert()
        .failure();
}

#[test]
fn traverse_follows_outgoing_edges() {
    let (dir, data) = seeded();
    let keys = |args: &[&str]| -> Vec<String> {
        json(dir.path(), &data, args)
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|node| node["key"].as_str().map(str::to_string))
            .collect()
    };

    let from_brand = keys(&["traverse", "brand"]);
    assert_eq!(from_brand.len(), 6);
    assert_eq!(from_brand[0], "b_0");
    assert!(from_brand[1..].iter().all(|key| key.starts_with("s_")));

    let from_han = keys(&["traverse", "model", "9001", "--depth-first"]);
    assert_eq!(from_han[0], "m_9001");
    let mut rest = from_han[1..].to_vec();
    rest.sort();
    assert_eq!(rest, vec!["s_1", "t_101", "t_102", "t_104"]);

    assert!(keys(&["traverse", "model", "1"]).is_empty());
}

#[test]
fn tree_text_lists_series_and_models() {
    let (dir, data) = seeded();
    let output = dynasty(dir.path())
        .args(["tree", "--data"])
        .arg(&data)
        .output()
        .expect("run tree");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("BYD 比亚迪"));
    assert!(text.contains("王朝 (5 models)"));
    assert!(text.contains("汉EV  [e平台3.0, 刀片电池, DiPilot]"));
}

#[test]
fn export_writes_joined_csv() {
    let (dir, data) = seeded();
    let out = dir.path().join("models.csv");
    dynasty(dir.path())
        .args(["export", "--out"])
        .arg(&out)
        .arg("--data")
        .arg(&data)
        .assert()
        .success();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(&out)
        .expect("open csv");
    let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.expect("row")).collect();
    assert_eq!(rows.len(), 12);
    assert_eq!(&rows[0][1], "海鸥");
}

#[test]
fn verify_passes_and_dangling_series_fails_load() {
    let (dir, data) = workspace();
    fs::write(
        &data,
        "[SERIES]\n1,王朝,\n[TECH]\n100,刀片电池,\n[MODEL]\n9001,汉EV,1,20.98,605,EV,轿车,5,2020\n[MODEL_TECH]\n9001,100\n",
    )
    .expect("write data");
    dynasty(dir.path())
        .args(["verify", "--data"])
        .arg(&data)
        .assert()
        .success();

    // A model pointing at a missing series fails the load itself.
    fs::write(
        &data,
        "[SERIES]\n1,王朝,\n[MODEL]\n9001,汉EV,7,20.98,605,EV,轿车,5,2020\n",
    )
    .expect("write data");
    dynasty(dir.path())
        .args(["stats", "--data"])
        .arg(&data)
        .assert()
        .failure();
}

#[test]
fn config_set_and_show_round_trip() {
    let (dir, data) = workspace();
    dynasty(dir.path())
        .args(["config", "set", "data_file"])
        .arg(&data)
        .assert()
        .success();
    dynasty(dir.path())
        .args(["config", "set", "server.port", "9191"])
        .assert()
        .success();
    dynasty(dir.path())
        .args(["config", "set", "server.port", "nope"])
        .assert()
        .failure();
    let shown = dynasty(dir.path())
        .args(["config", "show"])
        .output()
        .expect("config show");
    let text = String::from_utf8_lossy(&shown.stdout);
    assert!(text.contains("port = 9191"));

    // data_file from the config is used when --data is absent.
    dynasty(dir.path()).args(["seed-demo"]).assert().success();
    assert!(data.exists());
}

#[test]
fn completions_render_for_bash() {
    let (dir, _data) = workspace();
    let output = dynasty(dir.path())
        .args(["completions", "bash"])
        .output()
        .expect("completions");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("dynasty"));
}

fn fails_with(mut cmd: assert_cmd::Command, needle: &str) {
    let output = cmd.output().expect("run dynasty");
    assert!(!output.status.success(), "expected failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(needle), "stderr was: {stderr}");
}
