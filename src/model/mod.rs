mod server_status;
pub use self::server_status::*;

mod invite_stats;
pub use self::invite_stats::*;
