pub mod handlers;
pub mod locks;
pub mod machine;
pub mod status;
pub mod webhook;
