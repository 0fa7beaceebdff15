use super::*;

#[test]
fn config_module_re_exports() {
    // The public surface used across the crate.
    let config = Config::default();
    assert!(config.validate().is_ok());

    let ollama = OllamaConfig::default();
    assert!(ollama.ollama_url().is_ok());

    assert_eq!(RetrievalConfig::default().top_k, 3);
}
