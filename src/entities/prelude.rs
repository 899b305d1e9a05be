pub use super::invites::Entity as Invites;
pub use super::link_tags::Entity as LinkTags;
pub use super::links::Entity as Links;
pub use super::tags::Entity as Tags;
pub use super::users::Entity as Users;
