pub mod cdn_prefix;
pub mod file_record;
pub mod prelude;

pub use cdn_prefix::Entity as CdnPrefix;
pub use file_record::Entity as FileRecord;
