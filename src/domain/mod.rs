// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what the system talks about:
// a text corpus, the character vocabulary built from it, and
// the traits other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A loaded text corpus
pub mod corpus;

// Character <-> index bijection
pub mod vocab;

// Core abstractions (traits) that other layers implement
pub mod traits;
