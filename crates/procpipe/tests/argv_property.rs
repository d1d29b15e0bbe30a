//! Property-based tests for verbatim argument passing

use proptest::prelude::*;

use procpipe::{execute, Encoding, Options};

fn printed_args(args: &[String]) -> Vec<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut argv = vec!["printf".to_string(), "%s\\0".to_string()];
    argv.extend(args.iter().cloned());

    let output = runtime
        .block_on(execute(argv, Options::new().encoding(Encoding::Raw)))
        .unwrap();
    let bytes = output.stdout.unwrap().into_bytes();

    let mut printed: Vec<String> = bytes
        .split(|b| *b == 0)
        .map(|arg| String::from_utf8(arg.to_vec()).unwrap())
        .collect();
    // Trailing terminator
    printed.pop();
    printed
}

/// Arguments with quotes, whitespace and shell metacharacters arrive unmodified
#[test]
fn prop_argv_arrives_verbatim() {
    proptest!(ProptestConfig::with_cases(32), |(
        args in prop::collection::vec("[^\u{0}%\\\\]{0,16}", 1..5)
    )| {
        prop_assert_eq!(printed_args(&args), args);
    });
}

#[test]
fn test_shell_metacharacters_not_interpreted() {
    let args = vec![
        "it's \"quoted\"".to_string(),
        "$HOME `id` $(whoami)".to_string(),
        "a;b|c&&d > e".to_string(),
        "  spaced  out  ".to_string(),
        "*".to_string(),
    ];
    assert_eq!(printed_args(&args), args);
}
