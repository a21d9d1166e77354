pub mod census;
pub mod export;
pub mod host;
pub mod model;
pub mod panel;
pub mod report;
