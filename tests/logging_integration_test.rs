//! File output of the logger. Kept in its own test binary because it
//! installs the global subscriber.

use glassscore::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};

#[test]
fn test_logger_writes_json_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = LogConfig {
        level: "debug".to_string(),
        format: LogFormat::Json,
        log_dir: Some(dir.path().to_path_buf()),
        enable_console: false,
        rotation: RotationPolicy::Never,
    };

    let logger = LoggerImpl::init(&config).expect("logger should initialize");
    tracing::info!(session_id = "test-session", "evaluation started");
    drop(logger);

    let contents = std::fs::read_to_string(dir.path().join("glassscore.log")).expect("log file written");
    let line = contents
        .lines()
        .find(|l| l.contains("evaluation started"))
        .expect("event logged");
    let record: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(record["level"], "INFO");
    assert_eq!(record["fields"]["session_id"], "test-session");

    // a second global subscriber cannot be installed
    assert!(LoggerImpl::init(&LogConfig::default()).is_err());
}
