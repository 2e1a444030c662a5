use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "apikeys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// 32 hex characters.
    #[sea_orm(unique)]
    pub secret: String,
    pub readonly: bool,
    /// NULL means the key never expires.
    pub expirationdate: Option<DateTimeUtc>,
    pub description: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
