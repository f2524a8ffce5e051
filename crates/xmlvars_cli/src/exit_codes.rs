//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | General error (I/O, unreadable file)      |
//! | 2    | Usage error (bad arguments or value text) |
//! | 3    | Variable not found                        |
//! | 4    | Type mismatch or name already taken       |
//! | 5    | Settings are locked                       |

/// Command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure, typically file I/O or a format error with
/// `--no-recover`.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments, unknown type tag, or value text that does not parse.
pub const EXIT_USAGE: u8 = 2;

/// Named variable does not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Variable exists under another type, or the name is already used.
pub const EXIT_CONFLICT: u8 = 4;

/// Mutation refused because the settings file is locked.
pub const EXIT_LOCKED: u8 = 5;
