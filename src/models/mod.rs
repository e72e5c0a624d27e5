pub mod answer;
pub mod app_state;
pub mod exam;
pub mod question;
pub mod submission;
pub mod user;
