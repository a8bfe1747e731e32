pub mod contact;
pub mod gravity;
pub mod integrator;
