mod handler;
mod model;

pub use handler::{course_detail, home};
pub use model::{COURSE_NOT_FINISHED, Course, CourseScore, RoadmapStep, VideoItem};
