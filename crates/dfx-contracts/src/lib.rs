pub mod categories;
pub mod events;
pub mod records;
pub mod report;
pub mod sanitize;
