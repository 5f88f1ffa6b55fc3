pub mod config_service;
pub mod json_course_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_course_repository::JsonCourseRepository;
pub use crate::paths::LecternPaths;
