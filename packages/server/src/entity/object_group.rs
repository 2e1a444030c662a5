use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ogrps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub description: Option<String>,

    #[sea_orm(indexed)]
    pub ugrp_id: i32,
    #[sea_orm(belongs_to, from = "ugrp_id", to = "id")]
    pub owner: HasOne<super::user_group::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
