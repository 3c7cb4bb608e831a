use thiserror::Error;

/// Buffer pool error conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Buffer count must be greater than zero")]
    ZeroBufferCount,

    #[error("Buffer size must be greater than zero")]
    ZeroBufferSize,

    #[error("Arena for {buffer_count} buffers of {buffer_size} bytes overflows the address space")]
    SizeOverflow {
        buffer_count: usize,
        buffer_size: usize,
    },

    #[error("Failed to allocate {bytes} bytes for the buffer arena")]
    AllocationFailed { bytes: usize },

    #[error("Storage pool exhausted: all {capacity} buffers are outstanding")]
    Exhausted { capacity: usize },
}

impl PoolError {
    /// True for errors raised while building the pool. These leave no usable
    /// pool behind.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, PoolError::Exhausted { .. })
    }
}
