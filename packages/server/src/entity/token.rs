use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub object_id: i64,
    #[sea_orm(belongs_to, from = "object_id", to = "id")]
    pub object: HasOne<super::object::Entity>,

    #[sea_orm(unique)]
    pub token: String,
    pub description: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
