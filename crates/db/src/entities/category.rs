//! Category entity (genres used to filter the catalog).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movie_category::Entity")]
    MovieCategories,
}

impl Related<super::movie_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieCategories.def()
    }
}

impl Related<super::movie::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_category::Relation::Movie.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_category::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
