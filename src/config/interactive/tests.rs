use super::load_existing_config as load_existing_config_impl;
use super::non_empty_model;

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.ollama.embed_model.is_empty());
    assert!(!config.ollama.generate_model.is_empty());
    assert!(config.ollama.batch_size > 0);
}

#[test]
fn model_validator_rejects_blank_names() {
    assert!(non_empty_model(&"mistral:latest".to_string()).is_ok());
    assert!(non_empty_model(&"   ".to_string()).is_err());
    assert!(non_empty_model(&String::new()).is_err());
}
