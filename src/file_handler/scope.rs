//! Scoped acquisition: a resource is released exactly once on every exit path.

use crate::error::{FileIoError, Result};
use crate::file_handler::handle::Handle;
use crate::file_handler::mode::AccessMode;
use std::path::Path;

/// A resource with an explicit, fallible release step.
///
/// Implementors must also release on `Drop` so that unwinding out of a
/// [`scoped`] body still frees the resource.
pub trait Release {
    /// Release the underlying resource. Releasing twice is an error.
    fn release(&mut self) -> Result<()>;

    /// Whether [`Release::release`] already ran
    fn is_released(&self) -> bool;
}

impl Release for Handle {
    fn release(&mut self) -> Result<()> {
        self.close()
    }

    fn is_released(&self) -> bool {
        self.is_closed()
    }
}

/// Run `body` with `resource`, then release it.
///
/// The release runs exactly once whether `body` returns normally or with an
/// error (a body that released the resource itself is not released again).
/// A body error is returned unchanged; a release error that happens after a
/// body error is logged and dropped.
pub fn scoped<R, T, E, F>(mut resource: R, body: F) -> std::result::Result<T, E>
where
    R: Release,
    E: From<FileIoError>,
    F: FnOnce(&mut R) -> std::result::Result<T, E>,
{
    let outcome = body(&mut resource);

    let released = if resource.is_released() {
        Ok(())
    } else {
        resource.release()
    };

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(E::from(release_err)),
        (Err(body_err), Ok(())) => Err(body_err),
        (Err(body_err), Err(release_err)) => {
            log::warn!("release failed after scoped body error: {}", release_err);
            Err(body_err)
        }
    }
}

/// Open `path` under `mode`, run `body` with the handle, and close it on every
/// exit path.
pub fn with_scoped_handle<P, T, E, F>(path: P, mode: AccessMode, body: F) -> std::result::Result<T, E>
where
    P: AsRef<Path>,
    E: From<FileIoError>,
    F: FnOnce(&mut Handle) -> std::result::Result<T, E>,
{
    let handle = Handle::open(path, mode, None).map_err(E::from)?;
    scoped(handle, body)
}
