pub mod aliases;
pub mod field_mapper;

pub use aliases::AliasTable;
pub use field_mapper::{unmapped_fields, unused_donor_keys, FieldMapper, MappingResult};
