use super::*;
use tempfile::TempDir;

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.docs_dir, PathBuf::from("files"));
}

#[test]
fn missing_config_file_loads_defaults() {
    let dir = TempDir::new().expect("can create temp dir");
    let config = Config::load_from(dir.path()).expect("can load");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.base_dir, Some(dir.path().to_path_buf()));
}

#[test]
fn save_and_reload_round_trip() {
    let dir = TempDir::new().expect("can create temp dir");

    let mut config = Config::load_from(dir.path()).expect("can load");
    config.ollama.host = "embedhost".to_string();
    config.ollama.port = 4242;
    config.retrieval.top_k = 7;
    config.docs_dir = PathBuf::from("/srv/documents");
    config.save().expect("can save");

    let reloaded = Config::load_from(dir.path()).expect("can reload");
    assert_eq!(reloaded.ollama.host, "embedhost");
    assert_eq!(reloaded.ollama.port, 4242);
    assert_eq!(reloaded.retrieval.top_k, 7);
    assert_eq!(reloaded.docs_dir, PathBuf::from("/srv/documents"));
}

#[test]
fn partial_config_file_fills_in_defaults() {
    let dir = TempDir::new().expect("can create temp dir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[ollama]\nhost = \"otherhost\"\n",
    )
    .expect("can write file");

    let config = Config::load_from(dir.path()).expect("can load");
    assert_eq!(config.ollama.host, "otherhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.chunking.max_lines, 20);
}

#[test]
fn invalid_protocol_is_rejected() {
    let mut config = Config::default();
    config.ollama.protocol = "ftp".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn zero_port_is_rejected() {
    let mut config = Config::default();
    config.ollama.port = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(0))));
}

#[test]
fn empty_model_is_rejected() {
    let mut config = Config::default();
    config.ollama.embed_model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn overlap_must_be_smaller_than_window() {
    let mut config = Config::default();
    config.chunking.line_overlap = config.chunking.max_lines;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLineWindow(_, _))
    ));

    let mut config = Config::default();
    config.chunking.char_overlap = config.chunking.max_chars;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidCharBudget(_, _))
    ));
}

#[test]
fn top_k_bounds_are_enforced() {
    let mut config = Config::default();
    config.retrieval.top_k = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));

    config.retrieval.top_k = 101;
    assert!(config.validate().is_err());
}

#[test]
fn state_paths_live_under_the_base_dir() {
    let dir = TempDir::new().expect("can create temp dir");
    let config = Config::load_from(dir.path()).expect("can load");

    assert_eq!(
        config.index_path().expect("has index path"),
        dir.path().join("index.bin")
    );
    assert_eq!(
        config.chunks_path().expect("has chunks path"),
        dir.path().join("chunks.json")
    );
    assert_eq!(
        config.filemeta_path().expect("has filemeta path"),
        dir.path().join("filemeta.json")
    );
}

#[test]
fn ollama_url_is_built_from_parts() {
    let config = OllamaConfig {
        protocol: "https".to_string(),
        host: "models.internal".to_string(),
        port: 8443,
        ..OllamaConfig::default()
    };
    let url = config.ollama_url().expect("valid url");
    assert_eq!(url.as_str(), "https://models.internal:8443/");
}
