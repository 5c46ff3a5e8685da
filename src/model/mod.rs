pub mod attendance;
pub mod geo_zone;
pub mod justification;
pub mod role;
pub mod work_schedule;
