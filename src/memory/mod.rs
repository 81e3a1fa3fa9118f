/*!
 * Memory Module
 * User/kernel boundary access
 */

pub mod user;

// Re-export for convenience
pub use user::{SimulatedUserMemory, UserFault, UserMemory, UserPtr};
