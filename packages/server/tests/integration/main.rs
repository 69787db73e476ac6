mod common;

mod application;
mod internship;
mod submission;
mod task;
