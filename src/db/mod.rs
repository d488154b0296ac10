pub mod families;
pub mod memberships;
pub mod moments;
pub mod pool;
pub mod tx;
pub mod users;

pub use pool::{create_pool, run_migrations};
pub use tx::WriteTx;
