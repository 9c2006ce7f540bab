// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// works with: labelled digit images and where they come from.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A single labelled image as read from disk
pub mod image;

// Core abstractions (traits) that other layers implement
pub mod traits;
