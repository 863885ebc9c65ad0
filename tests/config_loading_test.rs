//! Configuration loading from files and the process environment.

use glassscore::ConfigLoader;
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{contents}").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file_with_env_key_lists() {
    let file = config_file(
        r"
evaluation:
  web_verifier_slots: 4
judge:
  providers:
    - name: openai
      base_url: https://api.openai.com/v1
      model: gpt-4o-mini
    - name: gemini
      base_url: https://generativelanguage.googleapis.com/v1beta/openai
      model: gemini-2.5-flash
      api_keys: [from-file]
scorer:
  intercept: -1.5
  weights:
    loan_int_rate: 0.08
",
    );

    temp_env::with_vars(
        [
            ("OPENAI_API_LIST", Some("sk-1,sk-2")),
            ("GEMINI_API_LIST", Some("ignored")),
            ("TAVILY_API_KEY", Some("tvly-env")),
        ],
        || {
            let config = ConfigLoader::load_from_file(file.path()).expect("config should load");

            assert_eq!(config.evaluation.web_verifier_slots, 4);
            assert_eq!(config.judge.providers[0].api_keys, vec!["sk-1", "sk-2"]);
            assert_eq!(config.judge.providers[1].api_keys, vec!["from-file"]);
            assert_eq!(config.search.api_key.as_deref(), Some("tvly-env"));
            assert_eq!(config.scorer.weights.get("loan_int_rate"), Some(&0.08));
            // untouched sections keep their defaults
            assert_eq!(config.judge.json_attempts, 3);
            assert_eq!(config.logging.format, "json");
        },
    );
}

#[test]
fn test_load_from_file_rejects_invalid_values() {
    let file = config_file("evaluation:\n  web_verifier_slots: 12\n");
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("web_verifier_slots"));

    let file = config_file("logging:\n  rotation: weekly\n");
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("weekly"));
}

#[test]
fn test_load_from_file_reports_parse_errors() {
    let file = config_file("evaluation:\n  web_verifier_slots: many\n");
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config"));
}
