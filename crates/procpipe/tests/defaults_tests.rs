//! Process-wide defaults (serialized: they share global state)

use serial_test::serial;

use procpipe::{
    defaults, execute, reset_defaults, set_defaults, Encoding, Options, Policy, ProcessHandle,
};

#[tokio::test]
#[serial]
async fn test_defaults_apply_to_later_spawns() {
    set_defaults(Policy {
        trim_output: false,
        ..Policy::default()
    });

    let output = execute("echo Hello", Options::new()).await.unwrap();
    assert_eq!(output.stdout_text(), Some("Hello\n"));

    // Explicit fields still win
    let output = execute("echo Hello", Options::new().trim_output(true))
        .await
        .unwrap();
    assert_eq!(output.stdout_text(), Some("Hello"));

    reset_defaults();
}

#[tokio::test]
#[serial]
async fn test_policy_snapshot_is_frozen_at_spawn() {
    reset_defaults();
    let handle = ProcessHandle::spawn("exit 3", Options::new()).await.unwrap();

    set_defaults(Policy {
        check_exit_code: false,
        ..Policy::default()
    });

    // Resolved before the change: still checked
    assert!(handle.options().check_exit_code);
    assert!(handle.wait().await.is_err());

    reset_defaults();
}

#[tokio::test]
#[serial]
async fn test_defaults_from_config_file() {
    let policy: Policy =
        serde_json::from_str(r#"{"encoding": "raw", "check_signal_code": false}"#).unwrap();
    set_defaults(policy);

    assert_eq!(defaults().encoding, Encoding::Raw);
    assert!(!defaults().check_signal_code);
    assert!(defaults().check_exit_code);

    let output = execute("printf ' x '", Options::new()).await.unwrap();
    assert_eq!(output.stdout.unwrap().as_bytes(), b" x ");

    reset_defaults();
    assert_eq!(defaults(), Policy::default());
}
