//! libhackrf binding (requires the `native` feature)
//!
//! The driver runs its own USB threads. Each transfer enters Rust through
//! one of two `extern "C"` trampolines, which read the slot back out of the
//! transfer's context pointer and call [`dispatch`] on the process-wide
//! [`CallbackRegistry::global`]. The context pointer only ever carries a slot
//! number, never the address of Rust data.
//!
//! # Example
//!
//! ```no_run
//! use rs_hackrf::transport::native::Library;
//!
//! let library = Library::init()?;
//! for info in library.list_devices()? {
//!     println!("[{}] {} {}", info.index, info.board_id, info.serial);
//! }
//! let mut device = library.open()?;
//! println!("Firmware: {}", device.version()?);
//! # Ok::<(), rs_hackrf::Error>(())
//! ```

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::Arc;

use super::{Transport, VERSION_STRING_LEN};
use crate::board::{BoardId, DeviceInfo};
use crate::config::DeviceSelector;
use crate::device::Device;
use crate::dispatch::{dispatch, STREAM_STOP};
use crate::error::{check, Error, ErrorKind, Result, HACKRF_SUCCESS};
use crate::registry::{CallbackRegistry, Slot};
use crate::Direction;

#[allow(non_camel_case_types)]
mod ffi {
    use std::ffi::{c_char, c_double, c_int, c_void};

    #[repr(C)]
    pub struct hackrf_device {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct hackrf_transfer {
        pub device: *mut hackrf_device,
        pub buffer: *mut u8,
        pub buffer_length: c_int,
        pub valid_length: c_int,
        pub rx_ctx: *mut c_void,
        pub tx_ctx: *mut c_void,
    }

    #[repr(C)]
    pub struct hackrf_device_list_t {
        pub serial_numbers: *mut *mut c_char,
        pub usb_board_ids: *mut c_int,
        pub usb_device_index: *mut c_int,
        pub devicecount: c_int,
        pub usb_devices: *mut *mut c_void,
        pub usb_devicecount: c_int,
    }

    pub type hackrf_sample_block_cb_fn = unsafe extern "C" fn(*mut hackrf_transfer) -> c_int;

    #[link(name = "hackrf")]
    extern "C" {
        pub fn hackrf_init() -> c_int;
        pub fn hackrf_exit() -> c_int;
        pub fn hackrf_device_list() -> *mut hackrf_device_list_t;
        pub fn hackrf_device_list_free(list: *mut hackrf_device_list_t);
        pub fn hackrf_device_list_open(
            list: *mut hackrf_device_list_t,
            idx: c_int,
            device: *mut *mut hackrf_device,
        ) -> c_int;
        pub fn hackrf_open(device: *mut *mut hackrf_device) -> c_int;
        pub fn hackrf_open_by_serial(
            desired_serial_number: *const c_char,
            device: *mut *mut hackrf_device,
        ) -> c_int;
        pub fn hackrf_close(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_start_rx(
            device: *mut hackrf_device,
            callback: hackrf_sample_block_cb_fn,
            rx_ctx: *mut c_void,
        ) -> c_int;
        pub fn hackrf_stop_rx(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_start_tx(
            device: *mut hackrf_device,
            callback: hackrf_sample_block_cb_fn,
            tx_ctx: *mut c_void,
        ) -> c_int;
        pub fn hackrf_stop_tx(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_version_string_read(
            device: *mut hackrf_device,
            version: *mut c_char,
            length: u8,
        ) -> c_int;
        pub fn hackrf_set_freq(device: *mut hackrf_device, freq_hz: u64) -> c_int;
        pub fn hackrf_set_sample_rate(device: *mut hackrf_device, freq_hz: c_double) -> c_int;
        pub fn hackrf_set_sample_rate_manual(
            device: *mut hackrf_device,
            freq_hz: u32,
            divider: u32,
        ) -> c_int;
        pub fn hackrf_set_baseband_filter_bandwidth(
            device: *mut hackrf_device,
            bandwidth_hz: u32,
        ) -> c_int;
        pub fn hackrf_set_amp_enable(device: *mut hackrf_device, value: u8) -> c_int;
        pub fn hackrf_set_lna_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_vga_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_txvga_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_antenna_enable(device: *mut hackrf_device, value: u8) -> c_int;
    }
}

use ffi::{hackrf_device, hackrf_transfer};

unsafe extern "C" fn rx_callback(transfer: *mut hackrf_transfer) -> c_int {
    trampoline(transfer, Direction::Rx)
}

unsafe extern "C" fn tx_callback(transfer: *mut hackrf_transfer) -> c_int {
    trampoline(transfer, Direction::Tx)
}

unsafe fn trampoline(transfer: *mut hackrf_transfer, direction: Direction) -> c_int {
    let Some(transfer) = transfer.as_ref() else {
        return STREAM_STOP;
    };
    let ctx = match direction {
        Direction::Rx => transfer.rx_ctx,
        Direction::Tx => transfer.tx_ctx,
    };
    let Ok(valid_length) = usize::try_from(transfer.valid_length) else {
        return STREAM_STOP;
    };
    dispatch(
        CallbackRegistry::global(),
        direction,
        transfer.buffer,
        valid_length,
        Slot::from_raw(ctx as usize),
    )
}

/// Initialized libhackrf.
///
/// Call [`Library::init`] once before opening devices; dropping it shuts
/// the library down again, which libhackrf refuses while devices remain
/// open.
pub struct Library {
    _private: (),
}

impl Library {
    pub fn init() -> Result<Self> {
        check(unsafe { ffi::hackrf_init() })?;
        tracing::debug!("libhackrf initialized");
        Ok(Library { _private: () })
    }

    /// List all connected HackRF devices.
    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let list = unsafe { ffi::hackrf_device_list() };
        if list.is_null() {
            return Err(Error::Native(ErrorKind::NoMem));
        }

        let mut devices = Vec::new();
        unsafe {
            let l = &*list;
            for i in 0..usize::try_from(l.devicecount).unwrap_or(0) {
                let serial_ptr = *l.serial_numbers.add(i);
                let serial = if serial_ptr.is_null() {
                    String::new()
                } else {
                    CStr::from_ptr(serial_ptr).to_string_lossy().into_owned()
                };
                let board_id = BoardId::from_raw(*l.usb_board_ids.add(i) as u16);
                devices.push(DeviceInfo {
                    serial,
                    board_id,
                    index: i,
                });
            }
            ffi::hackrf_device_list_free(list);
        }
        Ok(devices)
    }

    /// Open the first available device.
    pub fn open(&self) -> Result<Device> {
        let mut handle: *mut hackrf_device = std::ptr::null_mut();
        check(unsafe { ffi::hackrf_open(&mut handle) })?;
        Ok(Self::wrap(handle))
    }

    /// Open the device whose serial number ends with `serial`.
    pub fn open_by_serial(&self, serial: &str) -> Result<Device> {
        let serial =
            CString::new(serial).map_err(|_| Error::config("serial number contains NUL"))?;
        let mut handle: *mut hackrf_device = std::ptr::null_mut();
        check(unsafe { ffi::hackrf_open_by_serial(serial.as_ptr(), &mut handle) })?;
        Ok(Self::wrap(handle))
    }

    /// Open the device at an enumeration index.
    pub fn open_by_index(&self, index: usize) -> Result<Device> {
        let idx = c_int::try_from(index).map_err(|_| Error::Native(ErrorKind::InvalidParam))?;
        let list = unsafe { ffi::hackrf_device_list() };
        if list.is_null() {
            return Err(Error::Native(ErrorKind::NoMem));
        }
        let mut handle: *mut hackrf_device = std::ptr::null_mut();
        let status = unsafe {
            let status = if idx < (*list).devicecount {
                ffi::hackrf_device_list_open(list, idx, &mut handle)
            } else {
                ErrorKind::NotFound.code()
            };
            ffi::hackrf_device_list_free(list);
            status
        };
        check(status)?;
        Ok(Self::wrap(handle))
    }

    pub fn open_device(&self, selector: &DeviceSelector) -> Result<Device> {
        match selector {
            DeviceSelector::First => self.open(),
            DeviceSelector::Index(index) => self.open_by_index(*index),
            DeviceSelector::Serial(serial) => self.open_by_serial(serial),
        }
    }

    fn wrap(handle: *mut hackrf_device) -> Device {
        Device::with_transport(
            Box::new(NativeTransport { handle }),
            CallbackRegistry::global().clone(),
        )
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if let Err(e) = check(unsafe { ffi::hackrf_exit() }) {
            tracing::warn!("libhackrf exit failed: {}", e);
        }
    }
}

/// Transport backed by an opened libhackrf device.
pub struct NativeTransport {
    handle: *mut hackrf_device,
}

// SAFETY: libhackrf device handles may be used from any thread as long as
// calls are not concurrent; `Transport` methods take `&mut self`.
unsafe impl Send for NativeTransport {}

impl Transport for NativeTransport {
    fn close(&mut self) -> i32 {
        let status = unsafe { ffi::hackrf_close(self.handle) };
        if status == HACKRF_SUCCESS {
            self.handle = std::ptr::null_mut();
        }
        status
    }

    fn version_string(&mut self) -> std::result::Result<String, i32> {
        let mut buffer = [0 as c_char; VERSION_STRING_LEN];
        let status = unsafe {
            ffi::hackrf_version_string_read(
                self.handle,
                buffer.as_mut_ptr(),
                (VERSION_STRING_LEN - 1) as u8,
            )
        };
        if status != HACKRF_SUCCESS {
            return Err(status);
        }
        let version = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Ok(version.to_string_lossy().into_owned())
    }

    fn set_freq(&mut self, freq_hz: u64) -> i32 {
        unsafe { ffi::hackrf_set_freq(self.handle, freq_hz) }
    }

    fn set_sample_rate(&mut self, freq_hz: f64) -> i32 {
        unsafe { ffi::hackrf_set_sample_rate(self.handle, freq_hz) }
    }

    fn set_sample_rate_manual(&mut self, freq_hz: u32, divider: u32) -> i32 {
        unsafe { ffi::hackrf_set_sample_rate_manual(self.handle, freq_hz, divider) }
    }

    fn set_baseband_filter_bandwidth(&mut self, bandwidth_hz: u32) -> i32 {
        unsafe { ffi::hackrf_set_baseband_filter_bandwidth(self.handle, bandwidth_hz) }
    }

    fn set_amp_enable(&mut self, enable: bool) -> i32 {
        unsafe { ffi::hackrf_set_amp_enable(self.handle, enable as u8) }
    }

    fn set_lna_gain(&mut self, gain_db: u32) -> i32 {
        unsafe { ffi::hackrf_set_lna_gain(self.handle, gain_db) }
    }

    fn set_vga_gain(&mut self, gain_db: u32) -> i32 {
        unsafe { ffi::hackrf_set_vga_gain(self.handle, gain_db) }
    }

    fn set_txvga_gain(&mut self, gain_db: u32) -> i32 {
        unsafe { ffi::hackrf_set_txvga_gain(self.handle, gain_db) }
    }

    fn set_antenna_enable(&mut self, enable: bool) -> i32 {
        unsafe { ffi::hackrf_set_antenna_enable(self.handle, enable as u8) }
    }

    fn start_streaming(
        &mut self,
        direction: Direction,
        registry: Arc<CallbackRegistry>,
        slot: Slot,
    ) -> i32 {
        // The trampolines can only reach the process-wide registry
        if !Arc::ptr_eq(&registry, CallbackRegistry::global()) {
            tracing::warn!("native streaming requires the global callback registry");
            return ErrorKind::InvalidParam.code();
        }
        let ctx = slot.as_raw() as *mut c_void;
        unsafe {
            match direction {
                Direction::Rx => ffi::hackrf_start_rx(self.handle, rx_callback, ctx),
                Direction::Tx => ffi::hackrf_start_tx(self.handle, tx_callback, ctx),
            }
        }
    }

    fn stop_streaming(&mut self, direction: Direction) -> i32 {
        unsafe {
            match direction {
                Direction::Rx => ffi::hackrf_stop_rx(self.handle),
                Direction::Tx => ffi::hackrf_stop_tx(self.handle),
            }
        }
    }
}
