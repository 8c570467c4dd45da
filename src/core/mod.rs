pub mod alias_table;
pub mod classifier;
pub mod coordinates;
pub mod etl;
pub mod field_mapper;
pub mod formatter;
pub mod pipeline;
pub mod timestamp;
pub mod tools;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use alias_table::AliasTable;
pub use classifier::{classify, classify_record, classify_value};
pub use field_mapper::{FieldMapper, FieldSource};
pub use formatter::{DataFormatter, FormatOutcome};
pub use timestamp::{normalize_timestamp, NormalizedTimestamp};
