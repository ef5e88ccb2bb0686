pub mod instance_stop;
pub mod mail_relay;
