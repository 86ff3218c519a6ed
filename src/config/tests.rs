use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_memoria_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("MEMORIA_PORT");
        env::remove_var("MEMORIA_BIND_ADDR");
        env::remove_var("MEMORIA_STORAGE_PATH");
        env::remove_var("MEMORIA_EMBEDDING_ENDPOINT");
        env::remove_var("MEMORIA_EMBEDDING_API_KEY");
        env::remove_var("MEMORIA_EMBEDDING_DIM");
        env::remove_var("MEMORIA_HOT_CACHE_CAPACITY");
        env::remove_var("MEMORIA_EMBEDDING_RATE_PER_SEC");
        env::remove_var("MEMORIA_EMBEDDING_RESERVED_FRACTION");
        env::remove_var("MEMORIA_LLM_ENDPOINT");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.storage_path, PathBuf::from("./.data"));
    assert_eq!(config.embedding_dim, crate::constants::DEFAULT_EMBEDDING_DIM);
    assert!(config.embedding_api_key.is_none());
    assert!(config.llm_endpoint.is_none());
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8080");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_memoria_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
}

#[test]
#[serial]
fn test_from_env_custom_port() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_PORT", "3000")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.port, 3000);
    });
}

#[test]
#[serial]
fn test_from_env_custom_bind_addr() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_BIND_ADDR", "0.0.0.0")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(
            config.bind_addr,
            IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0))
        );
    });
}

#[test]
#[serial]
fn test_from_env_ipv6_bind_addr() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_BIND_ADDR", "::1")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(
            config.bind_addr,
            IpAddr::V6(std::net::Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    });
}

#[test]
#[serial]
fn test_from_env_custom_endpoint_and_key() {
    clear_memoria_env();

    with_env_vars(
        &[
            ("MEMORIA_EMBEDDING_ENDPOINT", "https://embeddings.example/v1"),
            ("MEMORIA_EMBEDDING_API_KEY", "sk-test"),
            ("MEMORIA_STORAGE_PATH", "/var/lib/memoria"),
        ],
        || {
            let config = Config::from_env().expect("should parse");

            assert_eq!(config.storage_path, PathBuf::from("/var/lib/memoria"));
            assert_eq!(config.embedding_endpoint, "https://embeddings.example/v1");
            assert_eq!(config.embedding_api_key, Some("sk-test".to_string()));
        },
    );
}

#[test]
#[serial]
fn test_invalid_port_zero() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_PORT", "0")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        assert!(err.to_string().contains("invalid port"));
    });
}

#[test]
#[serial]
fn test_invalid_port_not_number() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_PORT", "not_a_port")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::PortParseError { .. }));
        assert!(err.to_string().contains("failed to parse port"));
    });
}

#[test]
#[serial]
fn test_invalid_bind_addr() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_BIND_ADDR", "not.an.ip.address")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
        assert!(err.to_string().contains("failed to parse bind address"));
    });
}

#[test]
#[serial]
fn test_invalid_dimension_zero() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_EMBEDDING_DIM", "0")], || {
        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidDimension { .. }));
    });
}

#[test]
fn test_validate_storage_path_is_file() {
    let config = Config {
        storage_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"),
        ..Default::default()
    };

    let result = config.validate();
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::NotADirectory { .. }));
}

#[test]
fn test_validate_success_with_defaults() {
    let config = Config::default();

    let result = config.validate();
    assert!(
        result.is_ok(),
        "validate() should succeed with default config"
    );
}

#[test]
#[serial]
fn test_from_env_custom_hot_cache_capacity() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_HOT_CACHE_CAPACITY", "50000")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.hot_cache_capacity, 50000);
    });
}

#[test]
#[serial]
fn test_from_env_invalid_hot_cache_capacity_uses_default() {
    clear_memoria_env();

    with_env_vars(&[("MEMORIA_HOT_CACHE_CAPACITY", "not_a_number")], || {
        let config = Config::from_env().expect("should parse with fallback");
        assert_eq!(config.hot_cache_capacity, 10_000);
    });
}

#[test]
fn test_database_path_joins_storage_path() {
    let config = Config {
        storage_path: PathBuf::from("/var/lib/memoria"),
        ..Default::default()
    };
    assert_eq!(
        config.database_path(),
        PathBuf::from("/var/lib/memoria/memoria.sqlite3")
    );
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = ConfigError::InvalidPort {
        value: "0".to_string(),
    };
    assert!(err.to_string().contains("invalid port"));
    assert!(err.to_string().contains("0"));
    assert!(err.to_string().contains("1 and 65535"));

    let err = ConfigError::PathNotFound {
        path: PathBuf::from("/some/path"),
    };
    assert!(err.to_string().contains("/some/path"));
}
