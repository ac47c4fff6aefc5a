pub mod health;
pub mod judge;
pub mod scheduler;
pub mod session;
pub mod stats;
