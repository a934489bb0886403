//! Movie entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movie")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub synopsis: String,

    #[sea_orm(indexed)]
    pub release_date: Date,

    pub director: String,

    /// Main cast, comma separated
    #[sea_orm(column_type = "Text")]
    pub actors: String,

    /// Storage key of the cover image
    #[sea_orm(nullable)]
    pub cover: Option<String>,

    #[sea_orm(nullable)]
    pub trailer_url: Option<String>,

    /// Mean of all rating scores, one fractional digit.
    /// Written only by the rating aggregator.
    #[sea_orm(column_type = "Decimal(Some((3, 1)))")]
    pub average_rating: Decimal,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,

    #[sea_orm(has_many = "super::movie_category::Entity")]
    MovieCategories,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl Related<super::movie_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieCategories.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_category::Relation::Movie.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
