pub mod error;
pub mod message;
pub mod query_type;
pub mod response_code;

pub use error::FormatError;
pub use message::{Message, ResponseParams};
pub use query_type::QueryType;
pub use response_code::ResponseCode;
