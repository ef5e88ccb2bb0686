pub mod instance_control;
pub mod mail_sender;
pub mod mail_store;
pub mod notification;
