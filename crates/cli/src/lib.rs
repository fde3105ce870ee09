//! Tool layer, file moves and the stdio tool server.
pub mod fs_move;
pub mod server;
pub mod tools;
