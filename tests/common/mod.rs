#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

pub const FAKE_GIT: &str = r#"#!/usr/bin/env bash
set -euo pipefail

case "${3:-}" in
  rev-parse)
    echo "."
    ;;
  log)
    printf 'aaa111\t2026-01-08T00:00:00+00:00\n'
    printf 'bbb222\t2026-01-08T12:00:00+00:00\n'
    printf 'ccc333\t2026-01-09T00:00:00+01:00\n'
    ;;
  show)
    case "${4:-}" in
      aaa111:*) echo '[{"fc":"1111-2222-3333","name":"Ann","ev":5000},{"fc":"4444-5555-6666","vr":7000}]' ;;
      bbb222:*) echo 'corrupt{' ;;
      ccc333:*) echo '{"a":{"fc":"1111-2222-3333","ev":5100},"b":{"name":"no fc"}}' ;;
      *) echo "fatal: bad revision" >&2; exit 128 ;;
    esac
    ;;
  *)
    exit 1
    ;;
esac
"#;

pub const BROKEN_GIT: &str = "#!/usr/bin/env bash\necho 'fatal: not a git repository' >&2\nexit 128\n";

pub fn write_script(path: &Path, script: &str) {
    fs::write(path, script).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("chmod");
    }
}

/// Serves `rows` on `/` and `discord` on `/discord` until the test process exits.
pub fn spawn_feed_server(rows: String, discord: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let request = String::from_utf8_lossy(&request);
            let path = request.split_whitespace().nth(1).unwrap_or("/");
            let (status, body) = match path {
                "/" => ("200 OK", rows.as_str()),
                "/discord" => ("200 OK", discord.as_str()),
                _ => ("404 Not Found", ""),
            };
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    format!("http://{addr}")
}

pub struct Sandbox {
    pub root: PathBuf,
    pub vr_home: PathBuf,
    pub players_dir: PathBuf,
}

impl Sandbox {
    pub fn new(root: &Path) -> Self {
        let vr_home = root.join("vr");
        Self {
            root: root.to_path_buf(),
            players_dir: vr_home.join("players"),
            vr_home,
        }
    }

    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vr-tracker");
        cmd.current_dir(&self.root)
            .env("VR_HOME", &self.vr_home)
            .env("VR_CONFIG_PATH", self.root.join("missing-config.toml"))
            .env("NO_PROXY", "127.0.0.1,localhost")
            .env_remove("VR_PLAYERS_DIR")
            .env_remove("VR_LOGS_DIR")
            .env_remove("VR_REPO_URL")
            .env_remove("VR_GIT_DIR")
            .env_remove("VR_GIT_BIN")
            .env_remove("VR_FEED_BASE_URL")
            .env_remove("VR_TRACKED_PATH")
            .env_remove("VR_LOOKBACK_DAYS")
            .env_remove("VR_RETENTION_DAYS");
        cmd
    }

    pub fn read_player(&self, file_name: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.players_dir.join(file_name)).expect("read player");
        serde_json::from_str(&raw).expect("parse player")
    }
}
