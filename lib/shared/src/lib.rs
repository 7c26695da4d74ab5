pub mod catalog;
pub mod decision;
pub mod deletion;
pub mod library;
pub mod system;
