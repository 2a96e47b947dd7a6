pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod properties;
pub mod retry;

pub use config::{ConnectionConfig, ConnectionSummary};
pub use connection::{Connection, DatabaseKind, DbConnection};
pub use driver::{Driver, DriverRegistry};
pub use error::{ConnectionError, DriverError};
pub use properties::DriverProperties;
