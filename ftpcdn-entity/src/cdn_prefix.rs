use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "cdn_prefixes")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,

    /// Human readable label, unique across prefixes
    pub name: String,

    /// URL prefix such as `https://cdn.example.com/`, unique across prefixes
    pub prefix_url: String,

    pub description: Option<String>,

    /// At most one prefix is the default offered for new uploads
    pub is_default: bool,

    /// Inactive prefixes are kept for history but hidden from selection
    pub is_active: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            is_default: Set(false),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..ActiveModelTrait::default()
        }
    }
}
