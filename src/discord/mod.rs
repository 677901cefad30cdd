pub(crate) mod bot;
mod commands;

pub(crate) mod interactions;
pub(crate) mod utils;
pub(crate) mod view;
