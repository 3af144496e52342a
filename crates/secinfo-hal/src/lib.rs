//! Platform Abstraction Layer for the security-info handoff
//!
//! This crate defines the HAL trait that lets the relocator and key deriver
//! run under different execution environments (boot loader, VMM, host tests)
//! by abstracting the few platform services they need.
//!
//! # Platform Services
//!
//! - **Crypto**: the HMAC-SHA256 primitive (hardware engine or software)
//! - **Debug output**: serial console, log ring, or nothing
//! - **Halt**: terminal stop on a security emergency
//! - **Time**: monotonic timestamps for the handoff audit log

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Length of an HMAC-SHA256 tag in bytes
pub const HMAC_SHA256_LEN: usize = 32;

/// Platform abstraction trait
///
/// Implementations provide platform-specific functionality for:
/// - The HMAC-SHA256 primitive used for key extraction
/// - Debug output
/// - Terminal halt on unrecoverable conditions
/// - Time measurement
pub trait SecInfoHal {
    // === Crypto ===

    /// Compute HMAC-SHA256 of `data` keyed with `key` into `out`.
    ///
    /// The primitive must be constant time with respect to `key` and `data`.
    ///
    /// # Returns
    /// * `Ok(())` - `out` holds the tag
    /// * `Err(HalError::CryptoFailure)` - The engine reported failure; `out` is unspecified
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; HMAC_SHA256_LEN],
    ) -> Result<(), HalError>;

    // === Debug ===

    /// Write a debug message to the platform's console/log
    fn debug_write(&self, msg: &str);

    // === Halt ===

    /// Stop execution after an unrecoverable security condition.
    ///
    /// Callers scrub all secret material before calling this.
    fn halt(&self, msg: &str) -> !;

    // === Time ===

    /// Get current time in nanoseconds (monotonic)
    ///
    /// Platforms without a usable clock this early in boot keep the default.
    fn now_nanos(&self) -> u64 {
        0
    }
}

/// HAL errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// The crypto primitive reported failure
    CryptoFailure,
    /// Invalid argument (e.g. key length rejected by the primitive)
    InvalidArgument,
}

/// Software HMAC-SHA256 for platforms without a crypto engine.
pub fn soft_hmac_sha256(
    key: &[u8],
    data: &[u8],
    out: &mut [u8; HMAC_SHA256_LEN],
) -> Result<(), HalError> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| HalError::InvalidArgument)?;
    mac.update(data);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(())
}

/// A minimal test HAL for unit testing
///
/// Uses the software HMAC, records every debug line, and panics on halt so
/// that tests can observe fatal paths. HMAC failure can be injected.
#[derive(Default)]
pub struct TestHal {
    time: Cell<u64>,
    fail_hmac: Cell<bool>,
    hmac_calls: Cell<u32>,
    debug_log: RefCell<Vec<String>>,
}

impl TestHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent HMAC call report failure.
    pub fn fail_hmac(&self, fail: bool) {
        self.fail_hmac.set(fail);
    }

    /// Number of HMAC invocations so far
    pub fn hmac_calls(&self) -> u32 {
        self.hmac_calls.get()
    }

    /// Advance the monotonic clock.
    pub fn advance(&self, nanos: u64) {
        self.time.set(self.time.get() + nanos);
    }

    /// Snapshot of every line written through `debug_write`
    pub fn debug_lines(&self) -> Vec<String> {
        self.debug_log.borrow().clone()
    }

    /// Check whether any debug line contains `needle`.
    pub fn logged(&self, needle: &str) -> bool {
        self.debug_log.borrow().iter().any(|l| l.contains(needle))
    }
}

impl SecInfoHal for TestHal {
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; HMAC_SHA256_LEN],
    ) -> Result<(), HalError> {
        self.hmac_calls.set(self.hmac_calls.get() + 1);
        if self.fail_hmac.get() {
            // Leave garbage behind so callers can't rely on `out` after failure
            out.fill(0xA5);
            return Err(HalError::CryptoFailure);
        }
        soft_hmac_sha256(key, data, out)
    }

    fn debug_write(&self, msg: &str) {
        self.debug_log.borrow_mut().push(String::from(msg));
    }

    fn halt(&self, msg: &str) -> ! {
        panic!("halt: {}", msg)
    }

    fn now_nanos(&self) -> u64 {
        self.time.get()
    }
}
