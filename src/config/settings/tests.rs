use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.provider.base_url, "https://api.openai.com/v1/");
    assert_eq!(config.provider.embedding_model, "text-embedding-ada-002");
    assert_eq!(config.provider.completion_model, "gpt-3.5-turbo");
    assert_eq!(config.provider.api_key, None);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 150);
    assert_eq!(config.server.port, 3001);
    assert_eq!(config.server.top_k, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.provider.base_url = "ftp://files.example.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.provider.base_url = "not a url".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.server.port = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidPort(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.provider.completion_model = "  ".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidModel("completion_model"))
    ));

    let mut invalid_config = config.clone();
    invalid_config.provider.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.provider.batch_size = 2049;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.provider.temperature = 2.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.server.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config;
    invalid_config.server.document_path = PathBuf::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::EmptyDocumentPath)
    ));
}

#[test]
fn chunking_validation() {
    let mut config = Config::default();

    config.chunking.chunk_size = 50;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunkSize(50))
    ));

    config.chunking.chunk_size = 500;
    config.chunking.chunk_overlap = 500;
    assert!(matches!(config.validate(), Err(ConfigError::Chunking(_))));

    config.chunking.chunk_overlap = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn endpoint_url_gets_trailing_slash() {
    let mut provider = ProviderConfig {
        base_url: "http://localhost:8080/v1".to_string(),
        ..ProviderConfig::default()
    };
    let url = provider.endpoint_url().expect("url should parse");
    assert_eq!(url.as_str(), "http://localhost:8080/v1/");
    assert_eq!(
        url.join("embeddings").expect("join").as_str(),
        "http://localhost:8080/v1/embeddings"
    );

    provider.base_url = "https://api.openai.com/v1/".to_string();
    let url = provider.endpoint_url().expect("url should parse");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.provider.api_key = Some("sk-test".to_string());
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn api_key_is_omitted_when_unset() {
    let toml_str = toml::to_string(&Config::default()).expect("should serialize toml correctly");
    assert!(!toml_str.contains("api_key"));
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing file should load defaults");
    assert_eq!(config.server, ServerConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(
        config.config_file_path(),
        temp_dir.path().join("config.toml")
    );
}

#[test]
fn load_partial_config_fills_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        r#"
            [server]
            port = 8080
            document_path = "/srv/policies/handbook.pdf"

            [chunking]
            chunk_size = 500
        "#,
    )
    .expect("should write config");

    let config = Config::load(temp_dir.path()).expect("config should load");
    assert_eq!(config.server.port, 8080);
    assert_eq!(
        config.server.document_path,
        PathBuf::from("/srv/policies/handbook.pdf")
    );
    assert_eq!(config.server.top_k, 4);
    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 150);
    assert_eq!(config.provider, ProviderConfig::default());
}

#[test]
fn load_invalid_toml_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "[server\nport = 1")
        .expect("should write config");

    let err = Config::load(temp_dir.path()).expect_err("broken toml must fail");
    assert!(matches!(err, ConfigError::TomlParse(_)));
}

#[test]
fn unreadable_config_file_is_io_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::create_dir_all(temp_dir.path().join("config.toml")).expect("should create directory");

    let err = Config::load(temp_dir.path()).expect_err("directory must not load");
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn environment_overrides_file_values() {
    let mut config = Config::default();
    config
        .apply_env(env_from(&[
            (ENV_API_KEY, "sk-from-env"),
            (ENV_BASE_URL, "http://proxy.internal/v1"),
            (ENV_PORT, "4000"),
            (ENV_DOCUMENT, "docs/handbook.pdf"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.provider.api_key.as_deref(), Some("sk-from-env"));
    assert_eq!(config.provider.base_url, "http://proxy.internal/v1");
    assert_eq!(config.server.port, 4000);
    assert_eq!(
        config.server.document_path,
        PathBuf::from("docs/handbook.pdf")
    );
}

#[test]
fn blank_environment_values_are_ignored() {
    let mut config = Config::default();
    config.provider.api_key = Some("sk-from-file".to_string());
    config
        .apply_env(env_from(&[(ENV_API_KEY, ""), (ENV_PORT, "  ")]))
        .expect("blank overrides are ignored");

    assert_eq!(config.provider.api_key.as_deref(), Some("sk-from-file"));
    assert_eq!(config.server.port, 3001);
}

#[test]
fn invalid_port_override_is_rejected() {
    let mut config = Config::default();
    let result = config.apply_env(env_from(&[(ENV_PORT, "not-a-port")]));
    assert!(matches!(result, Err(ConfigError::InvalidPort(value)) if value == "not-a-port"));

    let result = config.apply_env(env_from(&[(ENV_PORT, "70000")]));
    assert!(result.is_err());
}

#[test]
fn require_api_key() {
    let mut config = Config::default();
    assert!(matches!(
        config.require_api_key(),
        Err(ConfigError::MissingApiKey)
    ));

    config.provider.api_key = Some(" ".to_string());
    assert!(config.require_api_key().is_err());

    config.provider.api_key = Some("sk-live".to_string());
    assert_eq!(config.require_api_key().expect("key is set"), "sk-live");
}

#[test]
fn bind_address_formats_host_and_port() {
    let server = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 3001,
        ..ServerConfig::default()
    };
    assert_eq!(server.bind_address(), "127.0.0.1:3001");
}
