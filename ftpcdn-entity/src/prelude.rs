pub use super::cdn_prefix::Entity as CdnPrefix;
pub use super::file_record::Entity as FileRecord;
