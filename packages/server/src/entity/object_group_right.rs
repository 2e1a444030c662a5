use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read access granted to a user group on an object group.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rights")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ogrp_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub ugrp_id: i32,
    #[sea_orm(belongs_to, from = "ogrp_id", to = "id")]
    pub object_group: HasOne<super::object_group::Entity>,
    #[sea_orm(belongs_to, from = "ugrp_id", to = "id")]
    pub user_group: HasOne<super::user_group::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
