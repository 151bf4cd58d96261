pub mod broadcast_msg;
pub mod config;
pub mod participant_db;
pub mod report;
pub mod round_state;
pub mod session;
