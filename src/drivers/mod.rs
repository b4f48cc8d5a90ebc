mod data_api;

pub use self::data_api::{ConnectionHandle, DataApiDriver};
