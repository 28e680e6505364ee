pub mod attendance;
pub mod auth;
pub mod core;
pub mod instructors;
pub mod programs;
pub mod schedule;
pub mod students;
