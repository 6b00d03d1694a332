//! Session runner integration tests
//!
//! Whole sessions against a scripted transport on a paused clock, so
//! timeouts are exact and nothing touches real hardware.

mod support;

use std::time::Duration;

use blepush_core::{
    Acquisition, CharProperties, ErrorKind, MemoryImageSource, SessionConfig, SessionState,
    TargetAddress,
};
use blepush_runtime::{cancel_pair, CancelHandle, CancelSignal, SessionReport, SessionRunner};
use support::{writes, Call, Script, ScriptedTransport};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

const IMAGE_SIZE: usize = 4736;

fn create_test_target() -> TargetAddress {
    TargetAddress::parse("AA:BB:CC:DD:EE:FF").unwrap()
}

fn create_test_image() -> Vec<u8> {
    (0..IMAGE_SIZE).map(|i| (i * 7 % 256) as u8).collect()
}

async fn run_session(
    config: SessionConfig,
    transport: ScriptedTransport,
    cancel: CancelSignal,
) -> (SessionReport, Vec<Call>) {
    let log = transport.call_log();
    let image = MemoryImageSource::new(create_test_image(), IMAGE_SIZE);
    let runner =
        SessionRunner::new(create_test_target(), config, transport, image, cancel).unwrap();
    let report = runner.run().await;
    let calls = log.lock().unwrap().clone();
    (report, calls)
}

/// Timer deadlines resolve to whole milliseconds on the paused clock
fn assert_elapsed(report: &SessionReport, expected: Duration) {
    assert!(
        report.elapsed >= expected && report.elapsed < expected + Duration::from_millis(5),
        "elapsed {:?}, expected {:?}",
        report.elapsed,
        expected
    );
}

fn error_kind(report: &SessionReport) -> Option<ErrorKind> {
    report.outcome.error().map(|e| e.kind())
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_happy_path_transfers_whole_image() {
    let transport = ScriptedTransport::new(create_test_target(), Script::default());
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert!(report.is_completed());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.final_state, SessionState::Completed);
    assert_eq!(report.chunks_written, 20);
    assert_eq!(report.total_chunks, 20);
    assert_eq!(report.bytes_written, IMAGE_SIZE);
    assert_elapsed(&report, Duration::from_millis(150));

    let written = writes(&calls);
    assert_eq!(written.len(), 20);
    assert!(written[..19].iter().all(|chunk| chunk.len() == 244));
    assert_eq!(written[19].len(), 180);
    assert_eq!(written.concat(), create_test_image());

    assert_eq!(
        calls[..7].to_vec(),
        vec![
            Call::Init,
            Call::StartScan,
            Call::StopScan,
            Call::Connect,
            Call::ResolveServices,
            Call::Properties,
            Call::EnableNotify,
        ]
    );
    assert_eq!(
        calls[27..].to_vec(),
        vec![Call::DisableNotify, Call::Disconnect, Call::Deinit]
    );
}

#[tokio::test(start_paused = true)]
async fn test_absent_peripheral_times_out_scanning() {
    let script = Script {
        advertise_after: None,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::DiscoveryTimeout));
    assert_eq!(report.exit_code(), 4);
    assert_elapsed(&report, Duration::from_secs(30));
    assert_eq!(
        calls,
        vec![Call::Init, Call::StartScan, Call::StopScan, Call::Deinit]
    );
    assert_eq!(
        report.audit_trail.last().map(|entry| entry.event.as_str()),
        Some("TimerExpired")
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_ten_writes() {
    let (handle, signal) = cancel_pair();
    let transport = ScriptedTransport::new(create_test_target(), Script::default())
        .with_cancel_after_writes(10, handle);
    let (report, calls) = run_session(SessionConfig::default(), transport, signal).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::Cancelled));
    assert_eq!(report.exit_code(), 130);
    assert_eq!(report.chunks_written, 10);
    assert_eq!(writes(&calls).len(), 10);

    let tail = &calls[calls.len() - 3..];
    assert_eq!(
        tail.to_vec(),
        vec![Call::DisableNotify, Call::Disconnect, Call::Deinit]
    );
}

/// Raise cancellation from another task after `delay`
fn spawn_cancel_after(delay: Duration, handle: CancelHandle) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        handle.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_scanning_stops_scan() {
    let (handle, signal) = cancel_pair();
    spawn_cancel_after(Duration::from_secs(5), handle);
    let script = Script {
        advertise_after: None,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) = run_session(SessionConfig::default(), transport, signal).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::Cancelled));
    assert_eq!(report.exit_code(), 130);
    assert_eq!(
        report.outcome.error().and_then(|e| e.state()),
        Some(SessionState::Scanning)
    );
    assert_elapsed(&report, Duration::from_secs(5));
    assert_eq!(
        calls,
        vec![Call::Init, Call::StartScan, Call::StopScan, Call::Deinit]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_connecting_disconnects() {
    let (handle, signal) = cancel_pair();
    spawn_cancel_after(Duration::from_secs(1), handle);
    let script = Script {
        connect_after: None,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) = run_session(SessionConfig::default(), transport, signal).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::Cancelled));
    assert_eq!(
        report.outcome.error().and_then(|e| e.state()),
        Some(SessionState::Connecting)
    );
    assert_elapsed(&report, Duration::from_secs(1));
    assert_eq!(
        calls,
        vec![
            Call::Init,
            Call::StartScan,
            Call::StopScan,
            Call::Connect,
            Call::Disconnect,
            Call::Deinit
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_touches_nothing() {
    let (handle, signal) = cancel_pair();
    handle.cancel();
    let transport = ScriptedTransport::new(create_test_target(), Script::default());
    let (report, calls) = run_session(SessionConfig::default(), transport, signal).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::Cancelled));
    assert!(calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_connect_times_out() {
    let script = Script {
        connect_after: None,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::ConnectionTimeout));
    assert_eq!(report.exit_code(), 5);
    assert_elapsed(&report, Duration::from_millis(25_100));
    assert_eq!(
        calls,
        vec![
            Call::Init,
            Call::StartScan,
            Call::StopScan,
            Call::Connect,
            Call::Disconnect,
            Call::Deinit
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_skips_negotiation() {
    let script = Script {
        refuse_connection: true,
        ..Script::default()
    };
    let config = SessionConfig::default().with_acquisition(Acquisition::Known);
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) = run_session(config, transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::UnexpectedDisconnect));
    assert_eq!(calls, vec![Call::Init, Call::Connect, Call::Deinit]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_notify_property_fails_before_writing() {
    let script = Script {
        properties: CharProperties::WRITE,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::ServiceResolution));
    assert!(!calls.contains(&Call::EnableNotify));
    assert!(writes(&calls).is_empty());
    assert_eq!(calls.last(), Some(&Call::Deinit));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_aborts_with_chunk_context() {
    let script = Script {
        fail_write: Some(3),
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::Write));
    let message = report.outcome.error().unwrap().to_string();
    assert!(message.contains("chunk 3"));
    assert!(message.contains("att error 0x0e"));
    assert_eq!(report.chunks_written, 3);
    assert_eq!(writes(&calls).len(), 4);
    assert_eq!(
        calls[calls.len() - 3..].to_vec(),
        vec![Call::DisableNotify, Call::Disconnect, Call::Deinit]
    );
}

#[tokio::test(start_paused = true)]
async fn test_link_drop_mid_transfer_stops_writes() {
    let script = Script {
        drop_link_after_writes: Some(5),
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::UnexpectedDisconnect));
    assert_eq!(writes(&calls).len(), 5);
    assert!(!calls.contains(&Call::Disconnect));
    assert!(!calls.contains(&Call::DisableNotify));
    assert_eq!(calls.last(), Some(&Call::Deinit));
}

#[tokio::test(start_paused = true)]
async fn test_missing_adapter_reports_transport_unavailable() {
    let script = Script {
        init_fails: true,
        ..Script::default()
    };
    let transport = ScriptedTransport::new(create_test_target(), script);
    let (report, calls) =
        run_session(SessionConfig::default(), transport, CancelSignal::never()).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::TransportUnavailable));
    assert_eq!(report.exit_code(), 3);
    assert_eq!(calls, vec![Call::Init]);
}

#[tokio::test(start_paused = true)]
async fn test_short_image_aborts_after_notify() {
    let log;
    let report = {
        let transport = ScriptedTransport::new(create_test_target(), Script::default());
        log = transport.call_log();
        let image = MemoryImageSource::new(vec![0u8; 100], IMAGE_SIZE);
        let runner = SessionRunner::new(
            create_test_target(),
            SessionConfig::default(),
            transport,
            image,
            CancelSignal::never(),
        )
        .unwrap();
        runner.run().await
    };
    let calls = log.lock().unwrap().clone();

    assert_eq!(error_kind(&report), Some(ErrorKind::ImageLoad));
    assert_eq!(report.exit_code(), 8);
    assert!(writes(&calls).is_empty());
    assert_eq!(
        calls[calls.len() - 3..].to_vec(),
        vec![Call::DisableNotify, Call::Disconnect, Call::Deinit]
    );
}
