pub mod prelude;

pub mod comments;
pub mod interesting_flags;
pub mod posts;
pub mod users;
