// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use launchwatch::config::{load_and_validate, load_from_path, load_or_default};
use launchwatch::errors::LaunchwatchError;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &TempDir, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join("Launchwatch.toml");
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn bundled_demo_config_is_valid() -> TestResult {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Launchwatch.toml");
    let cfg = load_and_validate(path)?;

    let launcher = cfg.launcher.ok_or("demo config has no [launcher]")?;
    assert_eq!(launcher.exe_path, PathBuf::from(r"C:\Exeluncher\EL.exe"));
    assert_eq!(launcher.launch_delay, Duration::from_secs(60));
    assert_eq!(launcher.confirmation_delay, Duration::from_secs(2));
    assert_eq!(launcher.connection_markers.len(), 3);

    assert_eq!(cfg.termination.poll_attempts, 10);
    assert_eq!(cfg.termination.poll_interval, Duration::from_millis(200));
    assert_eq!(cfg.server.bind.port(), 3000);
    assert_eq!(cfg.tracker.server_url, "http://127.0.0.1:3000");
    Ok(())
}

#[test]
fn full_config_round_trips_every_section() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[launcher]
exe_path = "/opt/el/EL"
args = ["--headless", "--port=9000"]
launch_delay = "500ms"
confirmation_delay = "1s"
connection_markers = ["READY"]

[termination]
poll_attempts = 0
poll_interval = "50ms"

[server]
bind = "127.0.0.1:8080"

[tracker]
server_url = "https://launcher.local:8443/"
keywords = ["PixelStreamingID", "  "]
interval = "2m"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    let launcher = cfg.launcher.ok_or("missing launcher")?;
    assert_eq!(launcher.args, vec!["--headless", "--port=9000"]);
    assert_eq!(launcher.launch_delay, Duration::from_millis(500));
    assert_eq!(launcher.connection_markers, vec!["READY"]);

    assert_eq!(cfg.termination.poll_attempts, 0);
    assert_eq!(cfg.server.bind.to_string(), "127.0.0.1:8080");
    assert_eq!(cfg.tracker.server_url, "https://launcher.local:8443");
    assert_eq!(cfg.tracker.keywords, vec!["PixelStreamingID"]);
    assert_eq!(cfg.tracker.interval, Duration::from_secs(120));
    Ok(())
}

#[test]
fn missing_file_falls_back_to_defaults_for_tracking() -> TestResult {
    let dir = TempDir::new()?;
    let cfg = load_or_default(dir.path().join("absent.toml"))?;

    assert!(cfg.launcher.is_none());
    assert_eq!(cfg.tracker.keywords.len(), 3);
    assert_eq!(cfg.tracker.interval, Duration::from_secs(30));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error_when_serving() -> TestResult {
    let dir = TempDir::new()?;
    let err = load_and_validate(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LaunchwatchError::IoError(_)));
    Ok(())
}

#[test]
fn malformed_toml_is_reported_as_toml_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[launcher\nexe_path = 1")?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, LaunchwatchError::TomlError(_)));
    Ok(())
}

#[test]
fn semantic_problems_are_config_errors() -> TestResult {
    let dir = TempDir::new()?;
    let cases = [
        ("[launcher]\nexe_path = \"  \"\n", "exe_path"),
        ("[launcher]\nexe_path = \"EL\"\nconnection_markers = []\n", "connection_markers"),
        ("[termination]\npoll_interval = \"fast\"\n", "poll_interval"),
        ("[tracker]\ninterval = \"10\"\n", "interval"),
        ("[tracker]\nkeywords = [\"\"]\n", "keywords"),
        ("[tracker]\nserver_url = \"ftp://host\"\n", "server_url"),
        ("[server]\nbind = \"0.0.0.0\"\n", "bind"),
    ];

    for (contents, field) in cases {
        let path = write_config(&dir, contents)?;
        match load_and_validate(&path) {
            Err(LaunchwatchError::ConfigError(msg)) => {
                assert!(msg.contains(field), "{field}: {msg}")
            }
            other => panic!("{field}: expected ConfigError, got {other:?}"),
        }
    }
    Ok(())
}
