//! Opaque tokens handed to the native layer.
//!
//! A token packs the owning bridge's generation tag into the high bits and a
//! per-bridge serial into the low bits of a pointer-sized value. Serials only
//! ever grow and generations are never recycled, so a token value names at
//! most one binding or task for the lifetime of the process.

use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

const GENERATION_BITS: u32 = if usize::BITS >= 64 { 16 } else { 8 };
const SERIAL_BITS: u32 = usize::BITS - GENERATION_BITS;
const SERIAL_MASK: usize = (1 << SERIAL_BITS) - 1;
const MAX_GENERATION: usize = (1 << GENERATION_BITS) - 1;

static NEXT_GENERATION: AtomicUsize = AtomicUsize::new(1);

/// Tag identifying one `Bridge` instance inside every token it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(usize);

impl Generation {
    /// Claim the next unused generation, or `None` once the tag space is spent.
    pub(crate) fn allocate() -> Option<Self> {
        let claimed = NEXT_GENERATION
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current <= MAX_GENERATION).then_some(current + 1)
            })
            .ok()?;
        Some(Self(claimed))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Pointer-sized value carried through the native layer unmodified.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(usize);

impl Token {
    /// Serial zero is reserved so a token is never a null pointer.
    pub(crate) fn new(generation: Generation, serial: u64) -> Option<Self> {
        let serial = usize::try_from(serial).ok()?;
        if serial == 0 || serial > SERIAL_MASK {
            return None;
        }
        Some(Self((generation.0 << SERIAL_BITS) | serial))
    }

    pub fn generation(self) -> Generation {
        Generation(self.0 >> SERIAL_BITS)
    }

    pub fn serial(self) -> u64 {
        (self.0 & SERIAL_MASK) as u64
    }

    pub fn into_raw(self) -> usize {
        self.0
    }

    /// Reinterpret a value received from the native layer.
    pub fn from_raw(raw: usize) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        Self::from_raw(ptr as usize)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generation().0, self.serial())
    }
}

/// Correlates a native-side registration with a host-side binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(pub(crate) Token);

/// Identifies one task scheduled onto the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) Token);

macro_rules! token_newtype {
    ($name:ident) => {
        impl $name {
            pub fn token(self) -> Token {
                self.0
            }

            pub fn into_raw(self) -> usize {
                self.0.into_raw()
            }

            pub fn from_raw(raw: usize) -> Option<Self> {
                Token::from_raw(raw).map(Self)
            }

            pub fn as_ptr(self) -> *mut c_void {
                self.0.as_ptr()
            }
        }
    };
}

token_newtype!(ContextKey);
token_newtype!(Ticket);
