#![cfg(target_os = "linux")]

// Linux/systemd integration tests.
//
// These are ignored by default and are intended to be run as root on a disposable systemd host:
// - `UNITGEN_ITEST_UNIT`: a throwaway service name to create (e.g. "unitgen-itest")
// - `UNITGEN_ITEST_BACKEND`: "systemctl" (default) or "dbus"

use std::time::{SystemTime, UNIX_EPOCH};

use unitgen::{Backend, Error, Generator, GeneratorOptions, Plan, ServiceManager, UnitConfig};

fn env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn backend() -> Backend {
    match env("UNITGEN_ITEST_BACKEND").as_deref() {
        Some("dbus") => Backend::Dbus,
        _ => Backend::Systemctl,
    }
}

fn staging_dir() -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("unitgen-itest-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create staging dir");
    dir
}

fn skip_if_unavailable(err: &Error) -> bool {
    match err {
        Error::BackendUnavailable { .. } => {
            eprintln!("backend unavailable; skipping: {err}");
            true
        }
        Error::PermissionDenied { .. } => {
            eprintln!("permission denied; skipping: {err}");
            true
        }
        _ => false,
    }
}

#[test]
#[ignore]
fn install_enable_start_real_unit() {
    let Some(name) = env("UNITGEN_ITEST_UNIT") else {
        eprintln!("UNITGEN_ITEST_UNIT not set; skipping");
        return;
    };

    let staging = staging_dir();
    let mut opts = GeneratorOptions::default();
    opts.staging_dir = staging.clone();
    // Running as root already; avoid depending on sudo being present.
    opts.privilege_command = None;

    let manager = match backend().client(&opts) {
        Ok(m) => m,
        Err(e) if skip_if_unavailable(&e) => return,
        Err(e) => panic!("backend client failed: {e}"),
    };

    let config = UnitConfig::new(&name, "unitgen integration test", "/bin/sleep 300");
    let generator = Generator::new(opts, manager);

    let mut steps = Vec::new();
    let report = match generator.run(&config, Plan::new(true, true), |s| steps.push(s.name())) {
        Ok(r) => r,
        Err(e) if skip_if_unavailable(&e) => return,
        Err(e) => panic!("run failed: {e}"),
    };

    assert_eq!(steps, ["generate", "install", "reload", "enable", "start"]);
    assert_eq!(report.unit_file.unit, format!("{name}.service"));

    let installed = generator
        .options()
        .systemd_system_dir
        .join(&report.unit_file.unit);
    let contents = std::fs::read_to_string(&installed).expect("read installed unit");
    assert_eq!(contents, report.unit_file.contents);

    let status = std::process::Command::new("systemctl")
        .args(["is-enabled", &report.unit_file.unit])
        .output()
        .expect("systemctl is-enabled");
    assert!(
        status.status.success(),
        "unit not enabled: {}",
        String::from_utf8_lossy(&status.stdout)
    );

    // Leave the host as we found it.
    for args in [
        vec!["stop", report.unit_file.unit.as_str()],
        vec!["disable", report.unit_file.unit.as_str()],
    ] {
        let _ = std::process::Command::new("systemctl").args(&args).status();
    }
    let _ = std::fs::remove_file(&installed);
    let _ = std::process::Command::new("systemctl")
        .arg("daemon-reload")
        .status();
    let _ = std::fs::remove_dir_all(&staging);
}

#[test]
#[ignore]
fn reload_only_against_real_systemd() {
    if env("UNITGEN_ITEST_UNIT").is_none() {
        eprintln!("UNITGEN_ITEST_UNIT not set; skipping");
        return;
    }

    let mut opts = GeneratorOptions::default();
    opts.privilege_command = None;
    let manager = match backend().client(&opts) {
        Ok(m) => m,
        Err(e) if skip_if_unavailable(&e) => return,
        Err(e) => panic!("backend client failed: {e}"),
    };

    match manager.reload() {
        Ok(_) => {}
        Err(e) if skip_if_unavailable(&e) => {}
        Err(e) => panic!("daemon reload failed: {e}"),
    }
}
