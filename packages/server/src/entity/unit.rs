use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub symbol: String,

    pub name: String,

    #[sea_orm(column_name = "type")]
    pub value_type: String,
    #[sea_orm(belongs_to, from = "value_type", to = "name")]
    pub type_ref: HasOne<super::value_type::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
