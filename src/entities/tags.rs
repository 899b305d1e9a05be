use sea_orm::entity::prelude::*;

/// A tag is the full `/`-separated path (`food/bread/rye`); the segment
/// hierarchy is mirrored through `parent_id`. Names are unique per user,
/// not globally — the migrator adds the `(user_id, name)` index.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub parent_id: Option<i32>,

    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,

    #[sea_orm(has_many = "super::link_tags::Entity")]
    LinkTags,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::link_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LinkTags.def()
    }
}

impl Related<super::links::Entity> for Entity {
    fn to() -> RelationDef {
        super::link_tags::Relation::Link.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::link_tags::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
