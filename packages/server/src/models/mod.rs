pub mod application;
pub mod internship;
pub mod progress;
pub mod shared;
pub mod submission;
pub mod task;
