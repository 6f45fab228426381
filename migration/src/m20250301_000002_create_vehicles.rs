use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(VehicleStatus::Enum)
                    .values([
                        VehicleStatus::Available,
                        VehicleStatus::OnTrip,
                        VehicleStatus::Maintenance,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(VehicleType::Enum)
                    .values([VehicleType::Car, VehicleType::Motorcycle, VehicleType::Van])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vehicle::Table)
                    .if_not_exists()
                    .col(pk_auto(Vehicle::Id))
                    // One vehicle per driver
                    .col(integer_null(Vehicle::DriverId).unique_key())
                    .col(ColumnDef::new(Vehicle::VehicleType).custom(VehicleType::Enum).null())
                    .col(string_len(Vehicle::PlateNumber, 20).not_null().unique_key())
                    .col(
                        ColumnDef::new(Vehicle::Status)
                            .custom(VehicleStatus::Enum)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        timestamp_with_time_zone(Vehicle::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Vehicle::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Vehicle::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vehicle_driver")
                            .from(Vehicle::Table, Vehicle::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicle_status")
                    .table(Vehicle::Table)
                    .col(Vehicle::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vehicle::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VehicleType::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VehicleStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vehicle {
    Table,
    Id,
    DriverId,
    VehicleType,
    PlateNumber,
    Status,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
pub enum VehicleStatus {
    #[sea_orm(iden = "vehicle_status")]
    Enum,
    #[sea_orm(iden = "available")]
    Available,
    #[sea_orm(iden = "on_trip")]
    OnTrip,
    #[sea_orm(iden = "maintenance")]
    Maintenance,
}

#[derive(DeriveIden)]
pub enum VehicleType {
    #[sea_orm(iden = "vehicle_type")]
    Enum,
    #[sea_orm(iden = "car")]
    Car,
    #[sea_orm(iden = "motorcycle")]
    Motorcycle,
    #[sea_orm(iden = "van")]
    Van,
}
