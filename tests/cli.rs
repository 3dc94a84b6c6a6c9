//! CLI integration tests.
//!
//! These run the `pit` binary against a temporary storage root, with the
//! password supplied through the environment.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use pit::auth::{CredentialStore, FileCredentialStore, PasswordRecord};
use pit::core::config::{AuthConfig, AuthMethod, GlobalConfig, ServerConfig};
use pit::core::types::Identity;

struct Env {
    temp: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let credentials = temp.path().join("credentials.toml");
        FileCredentialStore::with_path(credentials.clone())
            .set_password(&Identity::new("alice").unwrap(), PasswordRecord::new("pw"))
            .unwrap();

        let config = GlobalConfig {
            identity: Some("alice".into()),
            server: Some(ServerConfig {
                storage_root: Some(temp.path().join("storage")),
                ..Default::default()
            }),
            auth: Some(AuthConfig {
                method: Some(AuthMethod::Password),
                credentials_file: Some(credentials),
                ..Default::default()
            }),
        };
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, toml::to_string(&config).unwrap()).unwrap();
        fs::create_dir_all(temp.path().join("work")).unwrap();

        Self {
            temp,
            config: config_path,
        }
    }

    fn work(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    /// A `pit` invocation running in `cwd`.
    fn pit(&self, cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin("pit").unwrap();
        cmd.env("PIT_PASSWORD", "pw")
            .env("HOME", self.temp.path())
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config)
            .arg("--cwd")
            .arg(cwd);
        cmd
    }
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("pit")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pit"));
}

#[test]
fn full_workflow() {
    let env = Env::new();
    let work = env.work();

    env.pit(&work)
        .args(["create", "proj"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created alice/proj"));

    env.pit(&work)
        .args(["clone", "alice/proj"])
        .assert()
        .success()
        .stdout(predicate::str::contains("001_initial"));

    let proj = work.join("proj");
    fs::write(proj.join("a.txt"), "x").unwrap();

    env.pit(&proj)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("A a.txt"));

    env.pit(&proj)
        .args(["commit", "-m", "first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Staged 001_first"));

    env.pit(&proj)
        .arg("push")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed 002_first"));

    env.pit(&proj)
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("001_initial").and(predicate::str::contains("002_first")));

    env.pit(&work)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("proj"));

    env.pit(&proj)
        .args(["pull", "001_initial"])
        .assert()
        .success();
    assert!(!proj.join("a.txt").exists());
    assert!(proj.join(".pit/tracking.toml").exists());
}

#[test]
fn duplicate_create_fails() {
    let env = Env::new();
    env.pit(&env.work()).args(["create", "proj"]).assert().success();

    env.pit(&env.work())
        .args(["create", "proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn wrong_password_is_rejected() {
    let env = Env::new();
    env.pit(&env.work())
        .env("PIT_PASSWORD", "nope")
        .args(["create", "proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication failed"));
}

#[test]
fn commands_outside_working_directory_fail() {
    let env = Env::new();
    env.pit(&env.work())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a pit working directory"));
}
