use async_trait::async_trait;
use connectors::{
    Connection, ConnectionConfig, ConnectionError, DatabaseKind, DbConnection, Driver,
    DriverError, DriverProperties, DriverRegistry,
    retry::{RetryDisposition, RetryError, RetryPolicy},
};
use jobconf::JobConf;
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tracing_test::traced_test;

/// Records the property set of every connect call and either hands back a
/// stub connection or fails like a refused socket.
#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<(String, Option<DriverProperties>)>>,
    refuse: bool,
}

impl RecordingDriver {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Option<DriverProperties>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct StubConnection;

#[async_trait]
impl DbConnection for StubConnection {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Other("stub".to_string())
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Other("stub".to_string())
    }

    fn accepts_url(&self, url: &str) -> bool {
        url.starts_with("jdbc:x:")
    }

    async fn connect(
        &self,
        url: &str,
        properties: Option<&DriverProperties>,
    ) -> Result<Connection, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), properties.cloned()));
        if self.refuse {
            return Err(DriverError::Unexpected("connection refused".to_string()));
        }
        Ok(Box::new(StubConnection))
    }
}

fn registry_with(driver: Arc<RecordingDriver>) -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register("org.x.Driver", driver);
    registry
}

#[traced_test]
#[tokio::test]
async fn connects_with_url_alone_when_no_properties() {
    let driver = Arc::new(RecordingDriver::default());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.x.Driver", "jdbc:x://host/db");

    let mut conn = config.open_connection_with(&registry).await.unwrap();
    conn.ping().await.unwrap();
    conn.close().await.unwrap();

    assert_eq!(
        driver.calls(),
        vec![("jdbc:x://host/db".to_string(), None)]
    );
}

#[traced_test]
#[tokio::test]
async fn connects_with_merged_properties() {
    let driver = Arc::new(RecordingDriver::default());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.set_connection_params("org.x.Driver", "jdbc:x://host/db", Some("app"), Some("pw"));
    config.add_driver_property("fetchSize", "50");

    config.open_connection_with(&registry).await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 1);
    let props = calls[0].1.as_ref().unwrap();
    assert_eq!(props.user(), Some("app"));
    assert_eq!(props.password(), Some("pw"));
    assert_eq!(props.get("fetchSize"), Some("50"));
    assert_eq!(props.len(), 3);
    assert!(logs_contain("Opening database connection"));
}

#[traced_test]
#[tokio::test]
async fn unknown_driver_class_is_a_driver_load_error() {
    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.example.MissingDriver", "jdbc:x://host/db");

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(err, ConnectionError::DriverLoad { ref driver, .. } if driver == "org.example.MissingDriver"));
    assert_eq!(err.disposition(), RetryDisposition::Stop);
}

#[traced_test]
#[tokio::test]
async fn unset_driver_class_is_a_driver_load_error() {
    let mut job = JobConf::new();
    let config = ConnectionConfig::new(&mut job);

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(err, ConnectionError::DriverLoad { .. }));
}

#[traced_test]
#[tokio::test]
async fn unset_url_is_a_connection_error() {
    let driver = Arc::new(RecordingDriver::default());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.add_driver_property("ssl", "true");
    drop(config);
    job.extend([("mapred.jdbc.driver.class", "org.x.Driver")]);

    let config = ConnectionConfig::new(&mut job);
    let err = config.open_connection_with(&registry).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Connect {
            source: DriverError::MissingUrl,
            ..
        }
    ));
    assert!(driver.calls().is_empty());
}

#[traced_test]
#[tokio::test]
async fn driver_failure_is_wrapped_with_redacted_url() {
    let driver = Arc::new(RecordingDriver::refusing());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.x.Driver", "jdbc:x://app:hunter2@host/db");

    let err = config.open_connection_with(&registry).await.unwrap_err();
    match &err {
        ConnectionError::Connect { url, source } => {
            assert_eq!(url, "jdbc:x://app:***@host/db");
            assert!(matches!(source, DriverError::Unexpected(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.disposition(), RetryDisposition::Retry);
    assert!(!err.to_string().contains("hunter2"));
    assert!(!logs_contain("hunter2"));
}

#[traced_test]
#[tokio::test]
async fn each_call_is_a_single_attempt_and_retry_is_up_to_the_caller() {
    let driver = Arc::new(RecordingDriver::refusing());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.x.Driver", "jdbc:x://host/db");

    assert!(config.open_connection_with(&registry).await.is_err());
    assert_eq!(driver.calls().len(), 1);

    let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
    let config = &config;
    let registry = &registry;
    let result = policy
        .run(move || async move { config.open_connection_with(registry).await })
        .await;

    assert!(matches!(
        result,
        Err(RetryError::AttemptsExceeded { attempts: 3, .. })
    ));
    assert_eq!(driver.calls().len(), 4);
}

#[traced_test]
#[tokio::test]
async fn unreachable_postgres_is_a_connection_error() {
    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.set_connection_params(
        "org.postgresql.Driver",
        "jdbc:postgresql://127.0.0.1:1/testdb",
        Some("user"),
        Some("password"),
    );
    config.set_driver_properties([("sslmode", "disable"), ("connect_timeout", "5")]);

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Connect {
            source: DriverError::Postgres(_),
            ..
        }
    ));
}

#[traced_test]
#[tokio::test]
async fn unreachable_mysql_is_a_connection_error() {
    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("com.mysql.cj.jdbc.Driver", "jdbc:mysql://root@127.0.0.1:1/sakila");
    config.set_driver_properties([("fetchSize", "50"), ("ssl", "true")]);

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Connect {
            source: DriverError::MySql(_),
            ..
        }
    ));
}

#[traced_test]
#[tokio::test]
async fn malformed_url_is_a_connection_error() {
    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.postgresql.Driver", "jdbc:mysql://localhost/db");

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Connect {
            source: DriverError::UnsupportedUrl { .. },
            ..
        }
    ));
}

#[traced_test]
#[tokio::test]
async fn url_the_driver_does_not_accept_is_rejected_before_connecting() {
    let driver = Arc::new(RecordingDriver::default());
    let registry = registry_with(Arc::clone(&driver));

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.configure("org.x.Driver", "jdbc:y://app:hunter2@host/db");

    let err = config.open_connection_with(&registry).await.unwrap_err();
    match err {
        ConnectionError::Connect {
            url,
            source: DriverError::UnsupportedUrl { driver: kind, .. },
        } => {
            assert_eq!(url, "jdbc:y://app:***@host/db");
            assert_eq!(kind, "stub");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(driver.calls().is_empty());
}

#[traced_test]
#[tokio::test]
async fn postgres_makes_a_single_connection_per_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    let mut job = JobConf::new();
    let mut config = ConnectionConfig::new(&mut job);
    config.set_connection_params(
        "org.postgresql.Driver",
        &format!("jdbc:postgresql://127.0.0.1:{port}/testdb"),
        Some("app"),
        Some("wrong"),
    );
    config.set_driver_properties([("fetchSize", "50"), ("ssl", "true")]);

    let err = config.open_connection().await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Connect {
            source: DriverError::Postgres(_),
            ..
        }
    ));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert!(logs_contain("fetchSize"));
}
