pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StoreError};
pub use types::{ObjectId, RelationEndPointId};
pub use value::Value;
