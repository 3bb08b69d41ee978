pub mod constants;
pub mod hierarchy;
pub mod messages;
pub mod validation;
