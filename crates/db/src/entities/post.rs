//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Author reference; nullable so the owner can be removed without
    /// deleting the post.
    #[sea_orm(nullable, indexed)]
    pub author_id: Option<i64>,

    pub title: String,

    #[sea_orm(nullable)]
    pub subtitle: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Raw stored image reference. May be a bare filename, a relative
    /// media path, a CDN URL, or a malformed historical variant; the read
    /// path normalizes it before it reaches clients.
    #[sea_orm(nullable)]
    pub image: Option<String>,

    /// Unique, server-assigned, derived from the title at creation and
    /// never changed afterwards.
    #[sea_orm(unique, indexed)]
    pub slug: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,

    #[sea_orm(has_many = "super::like::Entity")]
    Like,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Like.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
