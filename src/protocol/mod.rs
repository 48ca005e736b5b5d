pub mod agui;
pub(crate) mod error_shapes;
pub mod mapping;
pub mod openai_chat;
