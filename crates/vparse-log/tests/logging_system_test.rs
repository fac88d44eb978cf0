//! Tests for Abseil-style Logging System

#[test]
fn test_vlog_levels() {
    // Test VLOG level system
    struct VlogConfig {
        global_level: u8,
        module_levels: Vec<(String, u8)>,
    }

    let config = VlogConfig {
        global_level: 2,
        module_levels: vec![
            ("parser".to_string(), 3),
            ("decoder".to_string(), 1),
        ],
    };

    assert_eq!(config.global_level, 2);
    assert_eq!(config.module_levels.len(), 2);
}

#[test]
fn test_vlog_filtering() {
    // Test VLOG level filtering
    fn should_log(level: u8, config_level: u8) -> bool {
        level <= config_level
    }

    assert!(should_log(1, 2));
    assert!(should_log(2, 2));
    assert!(!should_log(3, 2));
}

#[test]
fn test_check_macro_types() {
    // Test CHECK macro variants
    #[derive(Debug, PartialEq)]
    enum CheckType {
        Check,
        CheckEq,
        CheckNe,
        CheckLt,
        CheckLe,
        CheckGt,
        CheckGe,
    }

    let checks = vec![
        CheckType::Check,
        CheckType::CheckEq,
        CheckType::CheckNe,
    ];

    assert_eq!(checks.len(), 3);
}

#[test]
fn test_rate_limiting() {
    // Test rate limiting state
    struct RateLimitState {
        last_log_time_ms: u64,
        log_count: usize,
    }

    let mut state = RateLimitState {
        last_log_time_ms: 1000,
        log_count: 0,
    };

    state.log_count += 1;
    state.last_log_time_ms = 2000;

    assert_eq!(state.log_count, 1);
}

#[test]
fn test_log_every_n() {
    // Test log_every_n behavior
    fn should_log_every_n(count: usize, n: usize) -> bool {
        count % n == 0
    }

    assert!(should_log_every_n(0, 100));
    assert!(should_log_every_n(100, 100));
    assert!(!should_log_every_n(50, 100));
}

#[test]
fn test_log_first_n() {
    // Test log_first_n behavior
    fn should_log_first_n(count: usize, n: usize) -> bool {
        count < n
    }

    assert!(should_log_first_n(0, 5));
    assert!(should_log_first_n(4, 5));
    assert!(!should_log_first_n(5, 5));
}

#[test]
fn test_log_every_n_sec() {
    // Test time-based rate limiting
    fn should_log_time(current_ms: u64, last_log_ms: u64, interval_ms: u64) -> bool {
        current_ms - last_log_ms >= interval_ms
    }

    assert!(should_log_time(2000, 1000, 1000));
    assert!(!should_log_time(1500, 1000, 1000));
}

#[test]
fn test_log_levels() {
    // Test standard log levels
    #[derive(Debug, PartialEq, Ord, PartialOrd, Eq)]
    enum LogLevel {
        Trace = 0,
        Debug = 1,
        Info = 2,
        Warn = 3,
        Error = 4,
    }

    assert!(LogLevel::Error > LogLevel::Warn);
    assert!(LogLevel::Debug < LogLevel::Info);
}

#[test]
fn test_module_path_matching() {
    // Test module path matching for per-module VLOG levels
    fn matches_module(path: &str, pattern: &str) -> bool {
        path.starts_with(pattern)
    }

    assert!(matches_module("vparse::parser::av1", "vparse::parser"));
    assert!(!matches_module("vparse::decoder", "vparse::parser"));
}

#[test]
fn test_check_condition_formatting() {
    // Test CHECK condition formatting
    struct CheckFailure {
        file: String,
        line: u32,
        condition: String,
        message: String,
    }

    let failure = CheckFailure {
        file: "parser.rs".to_string(),
        line: 42,
        condition: "data.len() > 0".to_string(),
        message: "Data cannot be empty".to_string(),
    };

    assert_eq!(failure.line, 42);
    assert!(!failure.condition.is_empty());
}

#[test]
fn test_binary_check_values() {
    // Test binary CHECK value printing
    struct BinaryCheckFailure {
        left_value: String,
        right_value: String,
        operator: String,
    }

    let failure = BinaryCheckFailure {
        left_value: "42".to_string(),
        right_value: "24".to_string(),
        operator: "==".to_string(),
    };

    assert_eq!(failure.operator, "==");
}

#[test]
fn test_dcheck_debug_only() {
    // Test DCHECK (debug-only check) behavior
    struct DCheckState {
        enabled: bool,
    }

    let debug_state = DCheckState {
        enabled: cfg!(debug_assertions),
    };

    // In debug builds, DCHECK is enabled
    // In release builds, DCHECK is disabled
    assert_eq!(debug_state.enabled, cfg!(debug_assertions));
}

#[test]
fn test_log_config_persistence() {
    // Test log configuration persistence
    struct LogConfigFile {
        vlog_level: u8,
        module_filters: Vec<String>,
        rate_limit_enabled: bool,
    }

    let config = LogConfigFile {
        vlog_level: 2,
        module_filters: vec!["parser=3".to_string(), "decoder=1".to_string()],
        rate_limit_enabled: true,
    };

    assert_eq!(config.module_filters.len(), 2);
}

#[test]
fn test_log_output_formatting() {
    // Test log message formatting
    struct LogMessage {
        level: String,
        timestamp: u64,
        module: String,
        message: String,
    }

    let msg = LogMessage {
        level: "INFO".to_string(),
        timestamp: 1234567890,
        module: "vparse::parser".to_string(),
        message: "Parsing complete".to_string(),
    };

    assert_eq!(msg.level, "INFO");
}
