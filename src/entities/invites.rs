use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "invites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Signed token handed to the invitee; claims carry the creator and
    /// creation time.
    #[sea_orm(unique)]
    pub token: String,

    pub created_by: i32,

    pub created_at: DateTimeUtc,

    pub claimed_by: Option<i32>,

    pub claimed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Creator,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ClaimedBy",
        to = "super::users::Column::Id"
    )]
    Claimant,
}

impl ActiveModelBehavior for ActiveModel {}
