pub mod core;
pub mod export;
pub mod groups;
pub mod helpers;
pub mod scan;
pub mod students;
