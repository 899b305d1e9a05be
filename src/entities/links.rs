use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub url: String,

    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub created: DateTimeUtc,

    /// Hidden from every viewer except the owner.
    pub private: bool,

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

impl Related<super::tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::link_tags::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::link_tags::Relation::Link.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
