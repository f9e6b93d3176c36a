pub mod feedback;
pub mod registration;

pub use feedback::feedback;
pub use registration::registration;
