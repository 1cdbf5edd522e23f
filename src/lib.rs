pub mod error;
pub mod filter;
pub mod genotype;
pub(crate) mod parser;
pub mod record;
pub mod types;

pub use error::{Result, VcfError};
pub use filter::{FilterKind, VariantFilter};
pub use record::Variant;
pub use types::{FieldInfo, FieldNumber, FieldType, FieldTypes, Header, HeaderRef};
