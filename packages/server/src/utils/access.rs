use sea_orm::sea_query::{Query as SeaQuery, SelectStatement};
use sea_orm::*;

use crate::entity::{
    object, object_group, object_group_member, object_group_right, user_group,
    user_group_mapping,
};
use crate::error::AppError;

/// What a user may see or modify.
///
/// * superadmins (admins of group 1) see and modify everything;
/// * members of a group read what the group owns, admins also modify it;
/// * members of a group granted on an object group read its objects.
#[derive(Debug, Clone, Copy)]
pub struct Access {
    pub user_id: i32,
    pub superadmin: bool,
}

impl Access {
    pub async fn load<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Self, DbErr> {
        Ok(Self {
            user_id,
            superadmin: is_superadmin(db, user_id).await?,
        })
    }

    /// Groups the user belongs to (or administers, when `admin_only`).
    pub fn member_groups(&self, admin_only: bool) -> SelectStatement {
        let mut query = SeaQuery::select();
        query
            .column(user_group_mapping::Column::UgrpId)
            .from(user_group_mapping::Entity)
            .and_where(user_group_mapping::Column::UserId.eq(self.user_id));
        if admin_only {
            query.and_where(user_group_mapping::Column::IsAdmin.eq(true));
        }
        query.to_owned()
    }

    /// Object groups shared with one of the user's groups.
    fn granted_object_groups(&self) -> SelectStatement {
        SeaQuery::select()
            .column(object_group_right::Column::OgrpId)
            .from(object_group_right::Entity)
            .and_where(object_group_right::Column::UgrpId.in_subquery(self.member_groups(false)))
            .to_owned()
    }

    /// Filter on `objects` rows, `None` for superadmins.
    pub fn objects_filter(&self, writable: bool) -> Option<Condition> {
        if self.superadmin {
            return None;
        }
        if writable {
            return Some(Condition::all().add(object::Column::UgrpId.in_subquery(self.member_groups(true))));
        }
        let shared = SeaQuery::select()
            .column(object_group_member::Column::ObjectId)
            .from(object_group_member::Entity)
            .and_where(object_group_member::Column::OgrpId.in_subquery(self.granted_object_groups()))
            .to_owned();
        Some(
            Condition::any()
                .add(object::Column::UgrpId.in_subquery(self.member_groups(false)))
                .add(object::Column::Id.in_subquery(shared)),
        )
    }

    /// Filter on `ogrps` rows, `None` for superadmins.
    pub fn object_groups_filter(&self, writable: bool) -> Option<Condition> {
        if self.superadmin {
            return None;
        }
        if writable {
            return Some(
                Condition::all().add(object_group::Column::UgrpId.in_subquery(self.member_groups(true))),
            );
        }
        Some(
            Condition::any()
                .add(object_group::Column::UgrpId.in_subquery(self.member_groups(false)))
                .add(object_group::Column::Id.in_subquery(self.granted_object_groups())),
        )
    }

    /// Filter on `ugrps` rows, `None` for superadmins.
    pub fn user_groups_filter(&self, admin_only: bool) -> Option<Condition> {
        if self.superadmin {
            return None;
        }
        Some(Condition::all().add(user_group::Column::Id.in_subquery(self.member_groups(admin_only))))
    }

    pub fn objects(&self, writable: bool) -> Select<object::Entity> {
        let select = object::Entity::find();
        match self.objects_filter(writable) {
            Some(cond) => select.filter(cond),
            None => select,
        }
    }

    pub fn object_groups(&self, writable: bool) -> Select<object_group::Entity> {
        let select = object_group::Entity::find();
        match self.object_groups_filter(writable) {
            Some(cond) => select.filter(cond),
            None => select,
        }
    }

    pub fn user_groups(&self, admin_only: bool) -> Select<user_group::Entity> {
        let select = user_group::Entity::find();
        match self.user_groups_filter(admin_only) {
            Some(cond) => select.filter(cond),
            None => select,
        }
    }

    /// Load an object the user can read (or write), 404 otherwise.
    pub async fn object<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        writable: bool,
    ) -> Result<object::Model, AppError> {
        self.objects(writable)
            .filter(object::Column::Id.eq(id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("object (id={id})")))
    }

    pub async fn object_group<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i32,
        writable: bool,
    ) -> Result<object_group::Model, AppError> {
        self.object_groups(writable)
            .filter(object_group::Column::Id.eq(id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("objectGroup (id={id})")))
    }

    pub async fn user_group<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i32,
        admin_only: bool,
    ) -> Result<user_group::Model, AppError> {
        self.user_groups(admin_only)
            .filter(user_group::Column::Id.eq(id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("userGroup (id={id})")))
    }
}

pub async fn is_superadmin<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<bool, DbErr> {
    let count = user_group_mapping::Entity::find()
        .filter(user_group_mapping::Column::UserId.eq(user_id))
        .filter(user_group_mapping::Column::UgrpId.eq(user_group::SUPERADMIN_GROUP))
        .filter(user_group_mapping::Column::IsAdmin.eq(true))
        .count(db)
        .await?;
    Ok(count > 0)
}
