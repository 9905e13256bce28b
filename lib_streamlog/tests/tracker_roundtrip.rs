use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use lib_streamlog::{Destination, FixedClock, LoggingConfig, Router};

fn read_frame(stream: &mut TcpStream) -> String {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).unwrap();
    let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
    stream.read_exact(&mut body).unwrap();
    String::from_utf8(body).unwrap()
}

#[test]
fn test_tracker_destination_reaches_tcp_tracker() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        (read_frame(&mut stream), read_frame(&mut stream))
    });

    let config = LoggingConfig {
        with_time: true,
        tracker_uri: Some(addr),
        ..LoggingConfig::default()
    };
    let router = Router::new(config).with_time_source(Arc::new(FixedClock("10:20:30".to_string())));

    router.route(Destination::Tracker).append("ping");
    router.tracker().append("round=").append(2);

    let (first, second) = handle.join().unwrap();
    assert_eq!(first, "[10:20:30] ping");
    assert_eq!(second, "[10:20:30] round=2");
}

#[test]
fn test_config_file_drives_router() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "withTime": true, "odsLogEnabled": true, "timeFormat": "%Y" }}"#).unwrap();

    let config = LoggingConfig::from_file(file.path()).unwrap();
    let router = Router::new(config);
    assert!(router.config().with_time);
    assert!(router.config().ods_log_enabled);

    let message = router.console();
    let prefix = message.text().to_string();
    // Nothing to deliver to a test's stderr beyond the prefix.
    drop(message);
    assert!(prefix.starts_with('[') && prefix.ends_with("] "));
    assert_eq!(prefix.len(), "[2026] ".len());
}
