pub mod clock;
pub mod error;
pub mod geo;
pub mod justification;
pub mod punctuality;
pub mod registrar;
pub mod schedule;
