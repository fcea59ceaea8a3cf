use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_manifest(&self, content: &str) {
        self.write("lift.kdl", content);
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.path().join(relative)
    }
}

pub const ARENA: &str = r#"
project "arena"

provider "gamelift" {
    region "us-west-2"
}

fleet "arena" {
    build-id "build-1111"
    ec2-instance-type "c5.large"
    ec2-inbound-permission from-port=7777 to-port=7777 ip-range="0.0.0.0/0" protocol="UDP"
    runtime-configuration {
        server-process launch-path="/local/game/server" concurrent-executions=1
    }
}

scaling_policy "keep-headroom" {
    fleet "arena"
    metric-name "PercentAvailableGameSessions"
    policy-type "TargetBased"
    target-configuration target-value=20.0
}
"#;
