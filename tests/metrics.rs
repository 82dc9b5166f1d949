//! Connection and byte counters recorded through the `metrics` facade.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serverpp::config::{ListenerConfig, SocketConfig};
use serverpp::net::{ConnectionTracker, Listener};
use serverpp::observability::metrics::{
    ACTIVE_CONNECTIONS, BYTES_READ, BYTES_WRITTEN, CONNECTIONS_ACCEPTED,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn value(snapshotter: &Snapshotter, name: &str) -> Option<DebugValue> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find(|(key, _, _, _)| key.key().name() == name)
        .map(|(_, _, _, value)| value)
}

/// Run `f` on a current-thread runtime with `recorder` installed locally.
fn with_recorder<F>(recorder: &DebuggingRecorder, f: F)
where
    F: std::future::Future<Output = ()>,
{
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    });
}

#[test]
fn accept_read_write_and_tracking_are_recorded() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    with_recorder(&recorder, async {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections: 4,
        };
        let listener = Listener::bind(&config, &SocketConfig::default()).await.unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (mut socket, _permit) = listener.accept().await.unwrap();

        let tracker = ConnectionTracker::new();
        let guard = tracker.track(socket.id());
        assert_eq!(value(&snapshotter, ACTIVE_CONNECTIONS), Some(DebugValue::Gauge(1.0f64.into())));

        client.write_all(b"ping").await.unwrap();
        assert_eq!(socket.read().await.unwrap(), b"ping");

        socket.write_all(b"pong!").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();

        drop(guard);
        assert_eq!(value(&snapshotter, ACTIVE_CONNECTIONS), Some(DebugValue::Gauge(0.0f64.into())));
    });

    assert_eq!(value(&snapshotter, CONNECTIONS_ACCEPTED), Some(DebugValue::Counter(1)));
    assert_eq!(value(&snapshotter, BYTES_READ), Some(DebugValue::Counter(4)));
    assert_eq!(value(&snapshotter, BYTES_WRITTEN), Some(DebugValue::Counter(5)));
}

#[test]
fn chunked_write_all_counts_every_byte() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let payload = vec![3u8; 512 * 1024];

    with_recorder(&recorder, async {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections: 1,
        };
        let listener = Listener::bind(&config, &SocketConfig::default()).await.unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (mut socket, _permit) = listener.accept().await.unwrap();

        let mut received = vec![0u8; payload.len()];
        let (written, read) = tokio::join!(socket.write_all(&payload), client.read_exact(&mut received));
        written.unwrap();
        read.unwrap();
        assert_eq!(received, payload);

        // Nothing is counted for an empty write.
        socket.write_all(&[]).await.unwrap();
    });

    assert_eq!(
        value(&snapshotter, BYTES_WRITTEN),
        Some(DebugValue::Counter(payload.len() as u64))
    );
}
