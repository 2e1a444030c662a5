use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Object <-> object group membership.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objects_ogrps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ogrp_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub object_id: i64,
    #[sea_orm(belongs_to, from = "ogrp_id", to = "id")]
    pub group: HasOne<super::object_group::Entity>,
    #[sea_orm(belongs_to, from = "object_id", to = "id")]
    pub object: HasOne<super::object::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
