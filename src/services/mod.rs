pub mod ai_service;
pub mod analytics_service;
pub mod auth_service;
pub mod exam_service;
pub mod grading_service;
pub mod integrity_service;
pub mod persistence_service;
pub mod session_runner;
pub mod session_service;
pub mod store_service;
