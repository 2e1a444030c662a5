use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: String,
    pub description: Option<String>,

    pub unit_symbol: String,
    #[sea_orm(belongs_to, from = "unit_symbol", to = "symbol")]
    pub unit: HasOne<super::unit::Entity>,

    /// Owning user group.
    #[sea_orm(indexed)]
    pub ugrp_id: i32,
    #[sea_orm(belongs_to, from = "ugrp_id", to = "id")]
    pub owner: HasOne<super::user_group::Entity>,

    pub disabled: bool,
    pub creationdate: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
