#[cfg(test)]
mod tests {
    use crate::config::{ConfigError, Settings};
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper to set environment variables for testing
    fn with_env_vars<F, R>(vars: Vec<(&str, &str)>, test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let all_config_vars = vec![
            "GYM_SYNC_CONFIG", "API_BASE_URL", "PROFILE_PATH", "PUSH_URL", "LOGIN_PATH",
            "LOG_LEVEL", "LOG_FORMAT", "POLL_INTERVAL_SECONDS", "HTTP_TIMEOUT_SECONDS",
            "RECONNECT_INITIAL_DELAY_MS", "RECONNECT_MAX_DELAY_MS", "RECONNECT_MAX_ATTEMPTS",
            "DEACTIVATION_GRACE_SECONDS",
        ];

        // Store original values for all config variables
        let original_values: Vec<_> = all_config_vars
            .iter()
            .map(|key| (*key, env::var(key).ok()))
            .collect();

        for key in &all_config_vars {
            env::remove_var(key);
        }

        for (key, value) in &vars {
            env::set_var(key, value);
        }

        let result = test();

        // Restore original values
        for (key, original_value) in original_values {
            match original_value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }

        result
    }

    #[test]
    fn test_default_settings() {
        let settings = with_env_vars(vec![], || Settings::new_with_env_file(false))
            .expect("Failed to create default settings");

        assert_eq!(settings.api_base_url, "http://localhost:4000/api");
        assert_eq!(settings.profile_path, "/auth/profile");
        assert_eq!(settings.push_url, "ws://localhost:4000/ws");
        assert_eq!(settings.poll_interval(), Duration::from_secs(30));
        assert_eq!(settings.deactivation_grace(), Duration::from_secs(3));
        assert_eq!(settings.login_path, "/login");
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.log_format, "json");

        let policy = settings.reconnect_policy();
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_env_overrides() {
        let settings = with_env_vars(
            vec![
                ("API_BASE_URL", "https://gym.example.com/api/"),
                ("PUSH_URL", "wss://gym.example.com/socket"),
                ("POLL_INTERVAL_SECONDS", "5"),
                ("RECONNECT_MAX_ATTEMPTS", "10"),
                ("LOG_FORMAT", "plain"),
            ],
            || Settings::new_with_env_file(false),
        )
        .expect("Failed to create settings with overrides");

        assert_eq!(settings.push_url, "wss://gym.example.com/socket");
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.reconnect_max_attempts, 10);
        assert_eq!(settings.log_format, "plain");
        assert_eq!(
            settings.profile_url().unwrap().as_str(),
            "https://gym.example.com/api/auth/profile"
        );
    }

    #[test]
    fn test_unparseable_numeric_override_is_ignored() {
        let settings = with_env_vars(vec![("POLL_INTERVAL_SECONDS", "soon")], || {
            Settings::new_with_env_file(false)
        })
        .expect("Failed to create settings");

        assert_eq!(settings.poll_interval_seconds, 30.0);
    }

    #[test]
    fn test_invalid_log_format() {
        let result = with_env_vars(vec![("LOG_FORMAT", "xml")], || {
            Settings::new_with_env_file(false)
        });

        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("log_format")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_push_url_requires_websocket_scheme() {
        let result = with_env_vars(vec![("PUSH_URL", "http://localhost:4000/ws")], || {
            Settings::new_with_env_file(false)
        });

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_max_delay_below_initial_delay_rejected() {
        let result = with_env_vars(
            vec![
                ("RECONNECT_INITIAL_DELAY_MS", "2000"),
                ("RECONNECT_MAX_DELAY_MS", "500"),
            ],
            || Settings::new_with_env_file(false),
        );

        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("reconnect_max_delay_ms")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = with_env_vars(vec![("POLL_INTERVAL_SECONDS", "0")], || {
            Settings::new_with_env_file(false)
        });

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_file_source() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp config file");
        writeln!(file, "api_base_url = \"http://10.0.0.5:8080\"").unwrap();
        writeln!(file, "profile_path = \"/users/me\"").unwrap();
        writeln!(file, "deactivation_grace_seconds = 1.5").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let settings = with_env_vars(vec![("GYM_SYNC_CONFIG", path.as_str())], || {
            Settings::new_with_env_file(false)
        })
        .expect("Failed to load settings from file");

        assert_eq!(
            settings.profile_url().unwrap().as_str(),
            "http://10.0.0.5:8080/users/me"
        );
        assert_eq!(settings.deactivation_grace(), Duration::from_millis(1500));
    }

    #[test]
    fn test_env_overrides_config_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp config file");
        writeln!(file, "login_path = \"/signin\"").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let settings = with_env_vars(
            vec![("GYM_SYNC_CONFIG", path.as_str()), ("LOGIN_PATH", "/auth/login")],
            || Settings::new_with_env_file(false),
        )
        .expect("Failed to load settings");

        assert_eq!(settings.login_path, "/auth/login");
    }

    #[test]
    fn test_non_finite_interval_rejected() {
        let result = with_env_vars(vec![("POLL_INTERVAL_SECONDS", "NaN")], || {
            Settings::new_with_env_file(false)
        });

        assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("poll_interval_seconds")));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        for (key, value, field) in [
            ("POLL_INTERVAL_SECONDS", "1e20", "poll_interval_seconds"),
            ("HTTP_TIMEOUT_SECONDS", "1e300", "http_timeout_seconds"),
            ("DEACTIVATION_GRACE_SECONDS", "-1", "deactivation_grace_seconds"),
        ] {
            let result = with_env_vars(vec![(key, value)], || Settings::new_with_env_file(false));
            match result {
                Err(ConfigError::Validation(msg)) => assert!(msg.contains(field), "{}", msg),
                other => panic!("{}={} should be rejected, got {:?}", key, value, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_large_but_representable_interval_accepted() {
        let settings = with_env_vars(vec![("POLL_INTERVAL_SECONDS", "86400")], || {
            Settings::new_with_env_file(false)
        })
        .expect("one day should be accepted");

        assert_eq!(settings.poll_interval(), Duration::from_secs(86_400));
    }
}
