pub mod describe;
pub mod field;
pub mod record_set;
pub mod value;

pub use describe::*;
pub use field::*;
pub use record_set::*;
pub use value::*;

/// System identifier column present on every record
pub const ID_FIELD: &str = "Id";

/// Reserved slot populated after commit with a failure message, or cleared
/// on success
pub const ERRORS_FIELD: &str = "Errors";

/// Object name that always migrates first and indexes its business keys by
/// a compound `<SobjectType>;<key>` value
pub const RECORD_TYPE_OBJECT: &str = "RecordType";

/// Separator used in compound business keys
pub const COMPOUND_KEY_SEPARATOR: char = ';';
