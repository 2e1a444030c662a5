use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Id of the group whose admins bypass every ownership check.
pub const SUPERADMIN_GROUP: i32 = 1;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ugrps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
}

impl ActiveModelBehavior for ActiveModel {}
