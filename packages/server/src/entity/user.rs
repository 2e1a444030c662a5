use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
    /// Argon2 PHC string.
    pub password: String,
    pub email: Option<String>,

    pub creationdate: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
