//! Command implementations
//!
//! - `report`: build the change report of one repository and write it out

pub mod report;
