// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Atomic file replacement.

use crate::RuntimeError;
use std::io::Write;
use std::path::Path;

/// Writes `bytes` to a temporary file next to `path`, then renames it into
/// place. Readers never observe a partially written file, and a failure
/// leaves any existing file untouched.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RuntimeError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RuntimeError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| RuntimeError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| RuntimeError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| RuntimeError::io(path, e.error))?;
    Ok(())
}
