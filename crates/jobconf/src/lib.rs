pub mod error;
pub mod file;
pub mod store;

pub use error::JobConfError;
pub use store::{ConfigStore, JobConf, strip_prefixed};
