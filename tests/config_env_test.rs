use election_feed::Settings;
use election_feed::feed::Grammar;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// Environment variables are process-wide, so every case lives in one test.
#[test]
fn test_env_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("election-feed.toml");
    std::fs::write(
        &config_path,
        r#"
[watch]
debounce_ms = 1000

[publish]
sop_filename = "from-file.xml"
"#,
    )
    .unwrap();

    unsafe {
        // Prefixed, double underscore separates nesting levels
        env::set_var("FEED_WATCH__DEBOUNCE_MS", "2500");
        env::set_var("FEED_LIVE__ENABLED", "false");
        // Flat names the feed has always been deployed with
        env::set_var("SOP_FILENAME", "state.xml");
        env::set_var("ELECTION_TYPE", "referendum");
        env::set_var("RESULTS_FILENAME_STRING", "ref_result");
        env::set_var("LOCAL_RESULTS_DIRECTORY", "/srv/results");
        env::set_var("FTP_SERVER", "ftp.example.com");
        env::set_var("FTP_PASSWORD", "hunter2");
    }

    let settings = Settings::load_from(&config_path);

    unsafe {
        for var in [
            "FEED_WATCH__DEBOUNCE_MS",
            "FEED_LIVE__ENABLED",
            "SOP_FILENAME",
            "ELECTION_TYPE",
            "RESULTS_FILENAME_STRING",
            "LOCAL_RESULTS_DIRECTORY",
            "FTP_SERVER",
            "FTP_PASSWORD",
        ] {
            env::remove_var(var);
        }
    }

    let settings = settings.unwrap();
    assert_eq!(settings.watch.debounce_ms, 2500, "env beats file");
    assert!(!settings.live.enabled);
    assert_eq!(settings.publish.sop_filename, "state.xml");
    assert_eq!(settings.feed.kind, Grammar::Referendum);
    assert_eq!(settings.feed.result_match, "ref_result");
    assert_eq!(settings.feed.results_dir, PathBuf::from("/srv/results"));
    assert!(settings.sync.is_enabled());
    assert_eq!(settings.sync.password.as_deref(), Some("hunter2"));
    assert_eq!(
        settings.redacted().sync.password.as_deref(),
        Some("********")
    );

    // Without the variables the file and defaults apply again
    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.watch.debounce_ms, 1000);
    assert_eq!(settings.publish.sop_filename, "from-file.xml");
    assert_eq!(settings.feed.kind, Grammar::Local);
    assert!(!settings.sync.is_enabled());
}
