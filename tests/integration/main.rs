//! Integration tests for the restorer

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn restorer() -> Command {
        let mut cmd = cargo_bin_cmd!("restorer");
        for var in [
            "RESTORER_CONFIG",
            "CNB_LAYERS_DIR",
            "CNB_GROUP_PATH",
            "CNB_ANALYZED_PATH",
            "CNB_CACHE_DIR",
            "CNB_PLATFORM_API",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        restorer()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("layer cache restoration"));
    }

    #[test]
    fn version_displays() {
        restorer()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("restorer"));
    }

    #[test]
    fn config_path() {
        restorer()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        restorer()
            .arg("--config")
            .arg(temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("verify_digests = false"));
    }

    #[test]
    fn config_file_is_honored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[platform]\napi = \"0.9\"\n").unwrap();

        restorer()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("api = \"0.9\""));
    }

    #[test]
    fn config_init_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("restorer").join("config.toml");

        restorer()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("[restore]"));

        restorer()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[paths\n").unwrap();

        restorer()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod restore_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const METADATA_FILE: &str = "io.buildpacks.lifecycle.cache.metadata";

    /// A layers directory and a cache volume side by side
    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        fn new(buildpack_api: &str) -> Self {
            let temp = TempDir::new().unwrap();
            let layers = temp.path().join("layers");
            fs::create_dir_all(layers.join("acme_node")).unwrap();
            fs::create_dir_all(temp.path().join("cache").join("committed")).unwrap();
            fs::write(
                layers.join("group.toml"),
                format!(
                    "[[group]]\nid = \"acme/node\"\nversion = \"1.0.0\"\napi = \"{}\"\n",
                    buildpack_api
                ),
            )
            .unwrap();
            Self { temp }
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn layer_dir(&self) -> PathBuf {
            self.root().join("layers").join("acme_node")
        }

        fn record(&self, name: &str, toml: &str, sha: &str) {
            fs::write(self.layer_dir().join(format!("{}.toml", name)), toml).unwrap();
            fs::write(self.layer_dir().join(format!("{}.sha", name)), sha).unwrap();
        }

        fn cache_metadata(&self, json: &str) {
            fs::write(self.root().join("cache").join("committed").join(METADATA_FILE), json).unwrap();
        }

        fn cache_blob(&self, sha: &str, files: &[(&str, &str)]) {
            let mut builder = tar::Builder::new(Vec::new());
            for (path, content) in files {
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, content.as_bytes())
                    .unwrap();
            }
            let tar = builder.into_inner().unwrap();
            fs::write(
                self.root().join("cache").join("committed").join(format!("{}.tar", sha)),
                tar,
            )
            .unwrap();
        }

        fn restore(&self, platform_api: &str) -> Command {
            let mut cmd = cargo_bin_cmd!("restorer");
            for var in ["RESTORER_CONFIG", "CNB_GROUP_PATH", "CNB_ANALYZED_PATH"] {
                cmd.env_remove(var);
            }
            cmd.arg("--config")
                .arg(self.root().join("config.toml"))
                .arg("restore")
                .arg("--layers")
                .arg(self.root().join("layers"))
                .arg("--cache-dir")
                .arg(self.root().join("cache"))
                .arg("--extract-root")
                .arg(self.root())
                .args(["--platform-api", platform_api]);
            cmd
        }
    }

    #[test]
    fn restores_removes_and_skips() {
        let ws = Workspace::new("0.5");
        ws.record("deps", "cache = true\n", "sha256:deps");
        ws.record("stale", "cache = true\n", "sha256:old");
        ws.record("runtime", "launch = true\n", "sha256:runtime");
        ws.cache_metadata(
            r#"{"buildpacks":[{"key":"acme/node","version":"1.0.0","layers":{
                "deps":{"sha":"sha256:deps","cache":true,"build":true}}}]}"#,
        );
        ws.cache_blob("sha256:deps", &[("layers/acme_node/deps/hello.txt", "hi")]);

        ws.restore("0.6")
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored 1, removed 1, skipped 1"));

        assert_eq!(
            fs::read_to_string(ws.layer_dir().join("deps").join("hello.txt")).unwrap(),
            "hi"
        );
        assert!(!ws.layer_dir().join("stale.toml").exists());
        assert!(!ws.layer_dir().join("stale.sha").exists());
        assert!(ws.layer_dir().join("runtime.toml").exists());
    }

    #[test]
    fn newer_platform_restores_metadata_from_cache() {
        let ws = Workspace::new("0.7");
        ws.cache_metadata(
            r#"{"buildpacks":[{"key":"acme/node","version":"1.0.0","layers":{
                "deps":{"sha":"sha256:deps","cache":true,"build":true,"launch":false}}}]}"#,
        );
        ws.cache_blob("sha256:deps", &[("layers/acme_node/deps/hello.txt", "hi")]);

        ws.restore("0.7")
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored 1, removed 0, skipped 0"));

        let toml = fs::read_to_string(ws.layer_dir().join("deps.toml")).unwrap();
        assert!(toml.contains("[types]"));
        assert_eq!(
            fs::read_to_string(ws.layer_dir().join("deps.sha")).unwrap().trim(),
            "sha256:deps"
        );
        assert!(ws.layer_dir().join("deps").join("hello.txt").exists());
    }

    #[test]
    fn missing_cache_blob_fails_after_reconciliation() {
        let ws = Workspace::new("0.5");
        ws.record("deps", "cache = true\n", "sha256:deps");
        ws.record("stale", "cache = true\n", "sha256:old");
        ws.cache_metadata(
            r#"{"buildpacks":[{"key":"acme/node","version":"1.0.0","layers":{
                "deps":{"sha":"sha256:deps","cache":true}}}]}"#,
        );

        ws.restore("0.6")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Restoring data"))
            .stderr(predicate::str::contains("acme/node:deps"));

        // Stale records are removed even when a fetch fails
        assert!(!ws.layer_dir().join("stale.toml").exists());
    }

    #[test]
    fn digest_mismatch_is_reported_when_verifying() {
        let ws = Workspace::new("0.5");
        let sha = format!("sha256:{}", "0".repeat(64));
        ws.record("deps", "cache = true\n", &sha);
        ws.cache_metadata(&format!(
            r#"{{"buildpacks":[{{"key":"acme/node","version":"1.0.0","layers":{{
                "deps":{{"sha":"{}","cache":true}}}}}}]}}"#,
            sha
        ));
        ws.cache_blob(&sha, &[("layers/acme_node/deps/hello.txt", "hi")]);

        ws.restore("0.6")
            .arg("--verify-digests")
            .assert()
            .failure()
            .stderr(predicate::str::contains("mismatch"));

        assert!(!ws.layer_dir().join("deps").join("hello.txt").exists());
    }

    #[test]
    fn malformed_platform_api_is_rejected() {
        let ws = Workspace::new("0.7");

        ws.restore("seven")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid API version"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn missing_group_file_fails() {
        let ws = Workspace::new("0.7");
        fs::remove_file(ws.root().join("layers").join("group.toml")).unwrap();

        ws.restore("0.7").assert().failure();
    }
}
