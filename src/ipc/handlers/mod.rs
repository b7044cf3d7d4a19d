pub mod attendance;
pub mod backup_exchange;
pub mod core;
pub mod dashboard;
pub mod logbook;
pub mod reports;
pub mod session;
pub mod students;
pub mod teacher_attendance;
pub mod teachers;
pub mod users;
