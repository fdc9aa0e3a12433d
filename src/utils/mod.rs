pub mod value;

pub use value::{FromValue, Value};
