use std::net::Ipv4Addr;
use std::time::Duration;

use srtcast::config::TransportConfig;
use srtcast::srt::ConnectionState;
use srtcast::{PublishError, Publisher};

fn fast_connect_timeout() -> TransportConfig {
    let mut config = TransportConfig::defaults();
    config.connect_timeout = Duration::from_secs(2);
    config
}

/// Connecting to a port nothing is listening on must fail within the
/// configured connect timeout, and the failure must surface as `None`
/// rather than a panic or a hang.
#[tokio::test]
async fn init_against_a_closed_port_returns_none() {
    let publisher = tokio::time::timeout(
        Duration::from_secs(5),
        Publisher::init_with_config(
            fast_connect_timeout(),
            Ipv4Addr::new(127, 0, 0, 1),
            9, // discard port: nothing listens for SRT here
            "cam1",
        ),
    )
    .await
    .expect("init must not hang past its own connect timeout");

    assert!(publisher.is_none());
}

/// `send_frame` on a `Publisher` that never connected shouldn't be
/// reachable at all: `init` returning `None` means there is no `Publisher`
/// value to call it on. This test documents that invariant at the type
/// level rather than exercising a runtime branch.
#[tokio::test]
async fn failed_init_yields_no_publisher_to_misuse() {
    let publisher = Publisher::init_with_config(
        fast_connect_timeout(),
        Ipv4Addr::new(127, 0, 0, 1),
        9,
        "cam1",
    )
    .await;

    match publisher {
        None => {}
        Some(p) => {
            // Defensive: if a future refactor ever returns Some on
            // failure, fail loudly instead of silently passing.
            assert_eq!(p.connection_state().await, ConnectionState::Connected);
            p.release().await;
            panic!("expected init to fail against a closed port");
        }
    }
}

/// A configuration mistake (an unparsable IP string) is caught before any
/// connect attempt and surfaced as a `PublishError`, distinct from the
/// live-session `None` outcomes above.
#[tokio::test]
async fn init_str_rejects_an_unparsable_ip() {
    let err = Publisher::init_str("not-an-ip", 9000, "cam1")
        .await
        .expect_err("a non-IPv4 string must not reach the connector");

    assert!(matches!(err, PublishError::InvalidEndpoint(_)));
}
