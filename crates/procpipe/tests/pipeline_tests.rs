//! Round trips through chained process bridges

mod common;

use common::{HashingWriter, PatternReader};
use procpipe::{pipeline, DuplexBridge, Options, ProcessError, ProcessHandle};

const MIB: u64 = 1024 * 1024;

async fn bridge(command: &[&str]) -> DuplexBridge {
    ProcessHandle::spawn(command, Options::new())
        .await
        .unwrap()
        .into_duplex()
        .unwrap()
}

#[tokio::test]
async fn test_encode_decode_round_trip() {
    common::init_tracing();
    let len = 96 * MIB;
    let seed = 0x5eed;

    #[cfg(target_os = "linux")]
    let rss_before = common::peak_rss_kib();

    let stages = vec![bridge(&["base64"]).await, bridge(&["base64", "-d"]).await];
    let mut sink = HashingWriter::default();

    let copied = pipeline(PatternReader::new(len, seed), stages, &mut sink)
        .await
        .unwrap();

    assert_eq!(copied, len);
    assert_eq!(sink.total, len);
    assert!(sink.shut_down);
    assert_eq!(sink.digest(), PatternReader::digest(len, seed));

    // Each leg moves one copy buffer at a time
    assert!(sink.largest_write <= 64 * 1024);

    #[cfg(target_os = "linux")]
    {
        if let (Some(before), Some(after)) = (rss_before, common::peak_rss_kib()) {
            let grown_mib = after.saturating_sub(before) / 1024;
            assert!(
                grown_mib < 32,
                "peak RSS grew by {grown_mib} MiB for a {} MiB payload",
                len / MIB
            );
        }
    }
}

#[tokio::test]
async fn test_stage_statuses_after_pipeline() {
    common::init_tracing();
    let encode = bridge(&["gzip", "-c"]).await;
    let decode = bridge(&["gzip", "-dc"]).await;
    let statuses = [encode.status().clone(), decode.status().clone()];

    let mut sink = HashingWriter::default();
    pipeline(PatternReader::new(4 * MIB, 7), vec![encode, decode], &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.digest(), PatternReader::digest(4 * MIB, 7));
    for status in &statuses {
        assert!(!status.is_alive());
        assert_eq!(status.exit_code(), Some(0));
    }
}

#[tokio::test]
async fn test_failing_stage_still_ends_stream() {
    common::init_tracing();
    // Passes input through, then fails; the stage must not raise mid-pipe
    let failing = bridge(&["sh", "-c", "cat; exit 2"]).await;
    let status = failing.status().clone();

    let mut out = Vec::new();
    pipeline(&b"through"[..], vec![failing], &mut out)
        .await
        .unwrap();

    assert_eq!(out, b"through");
    assert_eq!(status.exit_code(), Some(2));
}

#[tokio::test]
async fn test_stage_closing_stdin_early_fails_pipeline() {
    common::init_tracing();
    let head = bridge(&["head", "-c", "4"]).await;
    let status = head.status().clone();

    let mut out = Vec::new();
    let err = pipeline(PatternReader::new(8 * MIB, 3), vec![head], &mut out)
        .await
        .unwrap_err();

    match err {
        ProcessError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("expected a stream error, got {other:?}"),
    }
    // Whatever had not reached the sink is dropped with the other legs
    assert!(out.len() <= 4);

    // The stage still settles on its own
    assert_eq!(status.wait().await.unwrap().exit_code(), Some(0));
}
