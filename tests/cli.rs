//! End-to-end tests for the `gt` binary.
//!
//! Stdout is not a terminal under the test harness, so every command
//! answers in JSON.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("tempdir"),
        }
    }

    fn db(&self) -> String {
        self.home
            .path()
            .join("catalog.db")
            .to_string_lossy()
            .into_owned()
    }

    fn gt(&self) -> Command {
        let mut cmd = Command::cargo_bin("gt").expect("binary");
        cmd.env("HOME", self.home.path())
            .env("GT_SYNC_ENABLED", "false")
            .env_remove("GT_DB")
            .env_remove("GREENTRAIL_DB")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn init(&self) {
        self.gt().arg("init").assert().success();
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.gt().args(args).output().expect("run gt");
        assert!(
            output.status.success(),
            "gt {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }
}

#[test]
fn version_reports_package_version() {
    let env = Env::new();
    let out = env.json(&["version"]);
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn version_reports_collection_and_embedding_model() {
    let env = Env::new();
    let output = env
        .gt()
        .env("GT_COLLECTION", "trilhas_teste")
        .env("GT_EMBEDDING_PROVIDER", "ollama")
        .env("OLLAMA_MODEL", "nomic-embed-text")
        .arg("version")
        .output()
        .expect("run gt");
    assert!(output.status.success());
    let out: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(out["collection"], "trilhas_teste");
    assert_eq!(out["embedding_provider"], "ollama");
    assert_eq!(out["embedding_model"], "nomic-embed-text");
}

#[test]
fn init_creates_database_once() {
    let env = Env::new();
    let out = env.json(&["init"]);
    assert_eq!(out["recreated"], false);
    assert!(std::path::Path::new(&env.db()).exists());

    env.gt().arg("init").assert().failure().code(2);

    let out = env.json(&["init", "--force"]);
    assert_eq!(out["recreated"], true);
}

#[test]
fn commands_need_an_initialized_database() {
    let env = Env::new();
    env.gt().args(["trail", "list"]).assert().failure().code(2);
}

#[test]
fn trail_add_and_list() {
    let env = Env::new();
    env.init();

    let created = env.json(&[
        "trail",
        "add",
        "Trilha do Pico",
        "--gpx",
        "trackfiles/pico.gpx",
        "--difficulty",
        "dificil",
        "--distance",
        "5200",
    ]);
    assert_eq!(created["label"], "Trilha do Pico");
    assert_eq!(created["difficulty"], "dificil");
    assert!(created["external_index_id"].is_null());

    let list = env.json(&["trail", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["trails"][0]["id"], created["id"]);
}

#[test]
fn trail_update_keeps_unspecified_fields() {
    let env = Env::new();
    env.init();
    let created = env.json(&["trail", "add", "Pico", "--gpx", "pico.gpx", "-d", "Vista"]);
    let id = created["id"].to_string();

    let updated = env.json(&["trail", "update", &id, "--label", "Pico Alto"]);
    assert_eq!(updated["label"], "Pico Alto");
    assert_eq!(updated["description"], "Vista");
}

#[test]
fn invalid_trail_input_is_rejected() {
    let env = Env::new();
    env.init();
    env.gt()
        .args(["trail", "add", "Pico", "--gpx", "pico.gpx", "--difficulty", "extremo"])
        .assert()
        .failure()
        .code(4);
    env.gt()
        .args(["trail", "add", "Pico", "--gpx", "pico.kml"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn missing_trail_is_not_found() {
    let env = Env::new();
    env.init();
    env.gt().args(["trail", "show", "42"]).assert().failure().code(3);
    env.gt().args(["trail", "delete", "42"]).assert().failure().code(3);
}

#[test]
fn knowledge_lifecycle() {
    let env = Env::new();
    env.init();

    let created = env.json(&[
        "knowledge",
        "add",
        "Horários",
        "O parque abre às 7h.",
    ]);
    let id = created["id"].to_string();

    let updated = env.json(&["knowledge", "update", &id, "--content", "O parque abre às 6h."]);
    assert_eq!(updated["title"], "Horários");
    assert_eq!(updated["content"], "O parque abre às 6h.");

    let deleted = env.json(&["knowledge", "delete", &id]);
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["kind"], "knowledge");

    let list = env.json(&["knowledge", "list"]);
    assert_eq!(list["count"], 0);
}

#[test]
fn document_add_defaults_title_to_file_name() {
    let env = Env::new();
    env.init();
    let file = env.home.path().join("regras.txt");
    std::fs::write(&file, "Proibido acampar.").expect("write file");

    let created = env.json(&["document", "add", &file.to_string_lossy()]);
    assert_eq!(created["title"], "regras.txt");
    assert_eq!(created["processed"], false);
}

#[test]
fn sync_status_reports_coverage() {
    let env = Env::new();
    env.init();
    env.json(&["trail", "add", "Pico", "--gpx", "pico.gpx"]);

    let status = env.json(&["sync", "status"]);
    assert_eq!(status["enabled"], false);
    assert_eq!(status["pending"], 0);
    assert_eq!(status["pending_keys"], serde_json::json!([]));
    assert!(status["embedder"].is_null());
    assert_eq!(status["status"]["trails"]["total"], 1);
    assert_eq!(status["status"]["trails"]["indexed"], 0);
}

#[test]
fn chat_history_is_empty_for_new_room() {
    let env = Env::new();
    env.init();
    let out = env.json(&["chat", "history", "--room", "trilhas"]);
    assert_eq!(out["count"], 0);
}

#[test]
fn silent_mode_prints_only_the_id() {
    let env = Env::new();
    env.init();
    let output = env
        .gt()
        .args(["--silent", "knowledge", "add", "Regras", "Sem lixo."])
        .output()
        .expect("run gt");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1");
}
