/*!
 * Data Structures
 * Small-string storage shared by error types and the device registry
 */

mod inline_string;

pub use inline_string::InlineString;
