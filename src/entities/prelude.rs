pub use super::comments::Entity as Comments;
pub use super::interesting_flags::Entity as InterestingFlags;
pub use super::posts::Entity as Posts;
pub use super::users::Entity as Users;
