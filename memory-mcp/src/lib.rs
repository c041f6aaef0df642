//! Bootstrap library for the Learning Memory Server's MCP surface: wires
//! `learning-memory-core`'s components onto the twenty-five-operation RPC
//! surface (spec §6.1) via `rmcp`.

pub mod requests;
pub mod server;

pub use server::MemoryServer;
