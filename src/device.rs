use std::{ffi::CString, os::unix::ffi::OsStrExt, path::Path};

use log::{debug, info};
use tch::Device;

use crate::error::{BigramError, Result};

/// Where tensors live for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DeviceChoice {
    /// CUDA when available, otherwise CPU.
    Auto,
    Cpu,
    /// Fails when CUDA is unavailable instead of falling back.
    Cuda,
}

/// libtorch loads its CUDA backend lazily, so `Cuda::is_available` reports
/// false until the library has been opened.
pub fn preload_cuda(lib: &Path) -> Result<()> {
    let path = CString::new(lib.as_os_str().as_bytes())
        .map_err(|_| BigramError::InvalidConfig(format!("bad library path {}", lib.display())))?;
    let handle = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_LAZY) };
    if handle.is_null() {
        return Err(BigramError::DeviceUnavailable(format!(
            "could not load {}",
            lib.display()
        )));
    }
    debug!("loaded {}", lib.display());
    Ok(())
}

/// Resolves the device once; everything downstream uses the result.
pub fn resolve_device(choice: DeviceChoice, cuda_lib: Option<&Path>) -> Result<Device> {
    if let Some(lib) = cuda_lib {
        preload_cuda(lib)?;
    }
    let device = match choice {
        DeviceChoice::Cpu => Device::Cpu,
        DeviceChoice::Auto => Device::cuda_if_available(),
        DeviceChoice::Cuda if tch::Cuda::is_available() => Device::Cuda(0),
        DeviceChoice::Cuda => {
            return Err(BigramError::DeviceUnavailable("CUDA requested but not available".into()));
        }
    };
    info!("using device {:?}", device);
    Ok(device)
}
