/// Represents the physical location a kernel runs on.
///
/// Op metadata keeps one kernel slot per device. Only the CPU slot is ever
/// populated; the GPU variant exists so that a missing kernel is reported
/// against a concrete device rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageDevice {
    /// Main system memory. This is the default device.
    #[default]
    CPU,
    /// CUDA-capable GPU. No kernels are registered for it.
    GPU,
}

impl StorageDevice {
    /// Number of device slots in a kernel table.
    pub const COUNT: usize = 2;

    /// Index of this device in a kernel table.
    pub fn index(&self) -> usize {
        match self {
            StorageDevice::CPU => 0,
            StorageDevice::GPU => 1,
        }
    }
}
