//! Port traits at the seams: data access, configuration, the external
//! analysis collaborators, and record persistence.

pub mod analysis_port;
pub mod config_port;
pub mod data_port;
pub mod indicator_port;
pub mod record_port;
