// src/exec/gate.rs

/// Availability check consulted before every dispatch.
///
/// While it reports `false` the executor defers dispatch and re-polls; it
/// never skips or fails a task because of it.
pub trait ResourceGate: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Gate that is always open.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl ResourceGate for AlwaysOpen {
    fn is_available(&self) -> bool {
        true
    }
}

impl<F> ResourceGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_available(&self) -> bool {
        self()
    }
}
