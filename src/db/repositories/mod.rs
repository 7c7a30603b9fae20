pub mod comment;
pub mod flag;
pub mod post;
pub mod user;
