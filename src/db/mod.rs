pub mod connection;
pub mod properties;

pub use connection::SourceDatabase;
pub use properties::TableName;
