//! Runner tests against a stand-in host (`sh`).

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::config::test_config_at;
use crate::prefs::{PrefNamespace, PrefValue, PrefsStore};

/// Config whose "host" is a shell sleeping in the background.
fn sh_host_config(root: &Path, extra: &str) -> PluginConfig {
    let toml = format!(
        r#"
[serve.host]
binary = "sh"
profile = "profile"
process_names = ["plugkit-test-host-never-matches"]
start_args = ["-c", "sleep 30"]
reload_args = ["-c", "echo reloaded > reload.marker"]

[serve.prefs]
"extensions.test-plugin.debug" = "true"
{extra}
"#
    );
    test_config_at(root, &toml)
}

fn read_profile_prefs(profile: &Path) -> PrefsStore {
    let mut store = PrefsStore::new(PrefNamespace::UserPref);
    store.read(&profile.join("prefs.js")).unwrap();
    store
}

#[test]
fn test_runner_kind_from_config() {
    let mut config = PluginConfig::default();
    assert_eq!(RunnerKind::from_config(&config), RunnerKind::Extension);
    config.serve.as_proxy = true;
    assert_eq!(RunnerKind::from_config(&config), RunnerKind::Proxy);
}

#[test]
fn test_missing_binary() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config_at(temp.path(), "");
    config.serve.host.binary = "plugkit-definitely-missing-binary".into();
    assert!(HostApp::from_config(&config).is_err());

    config.serve.host.binary = "bin/missing".into();
    assert!(HostApp::from_config(&config).is_err());
}

#[cfg(unix)]
#[test]
fn test_prepare_profile() {
    let temp = TempDir::new().unwrap();
    let config = sh_host_config(temp.path(), "");
    let host = HostApp::from_config(&config).unwrap();

    fs::create_dir_all(host.profile()).unwrap();
    fs::write(
        host.profile().join("prefs.js"),
        concat!(
            "// Mozilla User Preferences\n",
            "user_pref(\"extensions.lastAppBuildId\", \"20240101\");\n",
            "user_pref(\"extensions.lastAppVersion\", \"7.0.0\");\n",
            "user_pref(\"browser.theme\", \"dark\");\n",
        ),
    )
    .unwrap();

    host.prepare_profile().unwrap();

    let store = read_profile_prefs(host.profile());
    assert!(store.get_pref("extensions.lastAppBuildId").is_none());
    assert!(store.get_pref("extensions.lastAppVersion").is_none());
    assert_eq!(store.get_pref("browser.theme"), Some(&PrefValue::from("dark")));
    assert_eq!(
        store.get_pref("extensions.autoDisableScopes"),
        Some(&PrefValue::Number(0.0))
    );
    assert_eq!(
        store.get_pref("xpinstall.signatures.required"),
        Some(&PrefValue::Bool(false))
    );
    assert_eq!(
        store.get_pref("extensions.test-plugin.debug"),
        Some(&PrefValue::Bool(true))
    );

    let text = fs::read_to_string(host.profile().join("prefs.js")).unwrap();
    assert!(text.lines().all(|l| l.starts_with("user_pref(")));
}

#[cfg(unix)]
#[test]
fn test_proxy_runner_lifecycle() {
    let temp = TempDir::new().unwrap();
    let config = sh_host_config(temp.path(), "");
    let host = HostApp::from_config(&config).unwrap();
    let mut runner = ProxyRunner::new(host, &config);

    runner.run().unwrap();
    let proxy = fs::read_to_string(runner.proxy_file()).unwrap();
    assert_eq!(Path::new(&proxy), config.build.dist);
    assert!(runner.proxy_file().ends_with("extensions/test-plugin@example.com"));

    runner.reload().unwrap();
    assert!(config.root_join("reload.marker").exists());

    runner.exit().unwrap();
    // A second exit has nothing left to stop.
    runner.exit().unwrap();
}

#[cfg(unix)]
#[test]
fn test_extension_runner_requires_package() {
    let temp = TempDir::new().unwrap();
    let config = sh_host_config(temp.path(), "");
    let host = HostApp::from_config(&config).unwrap();
    let mut runner = ExtensionRunner::new(host, &config);

    let err = runner.run().unwrap_err();
    assert!(format!("{err}").contains("package"));
}

#[cfg(unix)]
#[test]
fn test_extension_runner_installs_and_reinstalls() {
    let temp = TempDir::new().unwrap();
    let config = sh_host_config(temp.path(), "[build]\npackage = \"out/plugin.xpi\"\n");
    fs::create_dir_all(config.root_join("out")).unwrap();
    fs::write(config.package_path(), b"v1").unwrap();

    let host = HostApp::from_config(&config).unwrap();
    let mut runner = ExtensionRunner::new(host, &config);
    runner.run().unwrap();
    assert_eq!(fs::read(runner.installed_path()).unwrap(), b"v1");
    assert!(runner.installed_path().ends_with("extensions/test-plugin@example.com.xpi"));

    fs::write(config.package_path(), b"v2").unwrap();
    runner.reload().unwrap();
    assert_eq!(fs::read(runner.installed_path()).unwrap(), b"v2");

    runner.exit().unwrap();
}

#[cfg(unix)]
#[test]
fn test_reload_without_args_is_noop() {
    let temp = TempDir::new().unwrap();
    let mut config = sh_host_config(temp.path(), "");
    config.serve.host.reload_args.clear();

    let host = HostApp::from_config(&config).unwrap();
    host.signal_reload().unwrap();
    assert!(!config.root_join("reload.marker").exists());
}

#[cfg(unix)]
#[test]
fn test_create_runner() {
    let temp = TempDir::new().unwrap();
    let config = sh_host_config(temp.path(), "");
    assert!(create_runner(RunnerKind::Proxy, &config).is_ok());
    assert!(create_runner(RunnerKind::Extension, &config).is_ok());
}
