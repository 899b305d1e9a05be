pub mod prelude;

pub mod invites;
pub mod link_tags;
pub mod links;
pub mod tags;
pub mod users;
