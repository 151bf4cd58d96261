pub mod agent;
pub mod console_input;
pub mod coordinator_connection_process;
