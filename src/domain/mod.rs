pub mod property;
pub mod value;

pub use property::PropertyRecord;
pub use value::Value;
