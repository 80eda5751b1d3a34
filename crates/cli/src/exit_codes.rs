//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success, low consistency risk                  |
//! | 1    | General error (unspecified)                    |
//! | 2    | CLI usage error (bad args, handled by clap)    |
//! | 3    | Comparison completed, medium risk              |
//! | 4    | Comparison completed, high risk                |
//! | 5    | Cannot read or parse an input document         |
//! | 6    | Invalid engine config                          |
//! | 7    | Shipment validation found failed rules         |

/// Success - command completed, risk is low.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Comparison ran to completion but the shipment carries medium risk.
pub const EXIT_MEDIUM_RISK: u8 = 3;

/// Comparison ran to completion but the shipment carries high risk.
pub const EXIT_HIGH_RISK: u8 = 4;

/// Input document missing or not valid extraction JSON.
pub const EXIT_PARSE: u8 = 5;

/// Engine config file failed parsing or validation.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// `docrecon validate` found failed business rules or relationship issues.
pub const EXIT_VALIDATION_FAILED: u8 = 7;
