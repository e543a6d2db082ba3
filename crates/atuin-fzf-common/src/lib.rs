pub mod enrich;
pub mod record;
pub mod style;

pub use enrich::{DirContext, EnrichedRecord};
pub use record::{DELIMITER, FIELD_COUNT, HistoryRecord, MalformedRecord};
