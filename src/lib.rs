// Module declarations for the library's components
pub mod backend;       // Register transports (HTTP, YAML state file)
pub mod config;        // Tool configuration
pub mod controller;    // Settings controller and typed accessors
pub mod error;         // Error handling and types
pub mod options;       // Command line options parsing
pub mod prelude;       // Common imports and types
pub mod registers;     // Register primitives, values and codecs
pub mod registry;      // Setting registry and config compilation
pub mod scanner;       // Register range scanner and live poller

// Get the package version from Cargo.toml
pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
