use bbdata_common::ValueType;
use sea_orm::*;
use sea_orm::sea_query::{Index, IndexOrder, OnConflict, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{aggregation, raw_value, unit, user, user_group, user_group_mapping, value_type};
use crate::utils::hash;

/// Units available out of the box: `(symbol, name, type)`.
const DEFAULT_UNITS: &[(&str, &str, &str)] = &[
    ("V", "volt", "float"),
    ("A", "ampere", "float"),
    ("W", "watt", "float"),
    ("kWh", "kilowatt-hour", "float"),
    ("°C", "celsius", "float"),
    ("%", "percent", "float"),
    ("lx", "lux", "float"),
    ("ppm", "parts per million", "int"),
    ("on/off", "switch", "bool"),
    ("-", "text", "string"),
];

/// Seed value types, units and the superadmin group.
pub async fn seed_reference_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut types_inserted = 0u32;
    for t in ValueType::ALL {
        let model = value_type::ActiveModel {
            name: Set(t.as_str().to_string()),
        };
        let result = value_type::Entity::insert(model)
            .on_conflict(
                OnConflict::column(value_type::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => types_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    let mut units_inserted = 0u32;
    for &(symbol, name, kind) in DEFAULT_UNITS {
        let model = unit::ActiveModel {
            symbol: Set(symbol.to_string()),
            name: Set(name.to_string()),
            value_type: Set(kind.to_string()),
        };
        let result = unit::Entity::insert(model)
            .on_conflict(OnConflict::column(unit::Column::Symbol).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => units_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if types_inserted + units_inserted > 0 {
        info!(types = types_inserted, units = units_inserted, "Seeded reference data");
    }

    let superadmin = user_group::ActiveModel {
        id: Set(user_group::SUPERADMIN_GROUP),
        name: Set("SUPERADMIN".to_string()),
    };
    let result = user_group::Entity::insert(superadmin)
        .on_conflict(OnConflict::column(user_group::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await;
    match result {
        Ok(_) => info!("Created SUPERADMIN user group"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }
    sync_sequence(db, "ugrps").await?;

    Ok(())
}

/// Create the `admin` user as an admin of the superadmin group, unless it exists.
pub async fn seed_admin(db: &DatabaseConnection, password: &str) -> Result<(), DbErr> {
    let existing = user::Entity::find()
        .filter(user::Column::Name.eq("admin"))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let hash = hash::hash_password(password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;
    let admin = user::ActiveModel {
        name: Set("admin".to_string()),
        password: Set(hash),
        email: Set(None),
        creationdate: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    user_group_mapping::ActiveModel {
        user_id: Set(admin.id),
        ugrp_id: Set(user_group::SUPERADMIN_GROUP),
        is_admin: Set(true),
    }
    .insert(db)
    .await?;

    info!(user_id = admin.id, "Created bootstrap admin user");
    Ok(())
}

/// Move a serial sequence past rows inserted with explicit ids.
async fn sync_sequence(db: &DatabaseConnection, table: &str) -> Result<(), DbErr> {
    db.execute_unprepared(&format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
         GREATEST((SELECT MAX(id) FROM {table}), 1))"
    ))
    .await?;
    Ok(())
}

/// Ensure the indexes backing per-partition range scans exist.
///
/// The primary keys already cover `(object_id, month, timestamp)`; the
/// descending index serves latest-value lookups.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "idx_raw_values_latest",
            Index::create()
                .if_not_exists()
                .name("idx_raw_values_latest")
                .table(raw_value::Entity)
                .col(raw_value::Column::ObjectId)
                .col(raw_value::Column::Month)
                .col((raw_value::Column::Timestamp, IndexOrder::Desc))
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_aggregations_latest",
            Index::create()
                .if_not_exists()
                .name("idx_aggregations_latest")
                .table(aggregation::Entity)
                .col(aggregation::Column::Minutes)
                .col(aggregation::Column::ObjectId)
                .col(aggregation::Column::Month)
                .col((aggregation::Column::Timestamp, IndexOrder::Desc))
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
