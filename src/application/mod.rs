// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal per CLI command.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination and the console walkthroughs
//
// Each use case implements BackendTask, so the same workflow
// runs on the CPU or GPU backend chosen at the command line.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Data pipeline and untrained model walkthrough
pub mod inspect_use_case;

// The training workflow
pub mod train_use_case;

// Text generation from a trained checkpoint
pub mod generate_use_case;

// Functional model API demos
pub mod functional_use_case;
