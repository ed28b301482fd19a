pub mod main_handler;

pub mod canonical;
pub mod components;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod hint;
pub mod matcher;
pub mod parse;
pub mod producer;
pub mod script;
pub mod shortest_path;
pub mod store;
pub mod ted;
pub mod tree;
