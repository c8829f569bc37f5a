//! Fixed-size wire headers with zero-copy parsing.
//!
//! Every frame starts with a 6-byte header: `[length: u32][pkt_type: u16]`,
//! both Big Endian. `length` covers the header itself. The high bit of
//! `pkt_type` flags zstd compression of the body; the low 15 bits select the
//! fragment type. Notify bodies carry an additional fixed 16-byte routing
//! prefix.
//!
//! Headers are plain byte arrays cast in place with `zerocopy`: every bit
//! pattern is a valid header, so the resynchronizing parser can read one at
//! any byte offset of an untrusted buffer without copying or UB. Validation
//! (plausible length, known fragment type) happens in the parser, not here.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fragment types the pipeline interprets.
///
/// Anything that is neither Notify nor FrameDown is counted in the fragment
/// histogram and otherwise discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentType {
    /// Top-level application message (`0x0002`).
    Notify,
    /// Carrier fragment: a server sequence followed by a nested stream
    /// (`0x0006`).
    FrameDown,
    /// Any other fragment type code.
    Other(u16),
}

impl FragmentType {
    /// Fragment type code for Notify.
    pub const NOTIFY: u16 = 0x0002;
    /// Fragment type code for FrameDown.
    pub const FRAME_DOWN: u16 = 0x0006;

    /// Classify a 15-bit fragment type code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            Self::NOTIFY => Self::Notify,
            Self::FRAME_DOWN => Self::FrameDown,
            other => Self::Other(other),
        }
    }

    /// The raw 15-bit code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Notify => Self::NOTIFY,
            Self::FrameDown => Self::FRAME_DOWN,
            Self::Other(code) => code,
        }
    }
}

/// Six-byte outer frame header (Big Endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    length: [u8; 4],
    pkt_type: [u8; 2],
}

impl FrameHeader {
    /// Size of the serialized header (6 bytes).
    pub const SIZE: usize = 6;

    /// High bit of `pkt_type`: the body is zstd-compressed.
    pub const ZSTD_FLAG: u16 = 0x8000;

    /// Cast a header from the start of `bytes` (zero-copy).
    ///
    /// Returns `None` when fewer than [`Self::SIZE`] bytes are available.
    /// Any 6 bytes form a structurally valid header; plausibility of the
    /// length field is the caller's concern.
    #[must_use]
    pub fn from_prefix(bytes: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(bytes).ok().map(|(header, _)| header)
    }

    /// Total frame length in bytes, header included.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_be_bytes(self.length)
    }

    /// Raw packet type: compression flag plus fragment code.
    #[must_use]
    pub fn pkt_type(&self) -> u16 {
        u16::from_be_bytes(self.pkt_type)
    }

    /// Whether the compression flag bit is set.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.pkt_type() & Self::ZSTD_FLAG != 0
    }

    /// The 15-bit fragment type code.
    #[must_use]
    pub fn fragment_code(&self) -> u16 {
        self.pkt_type() & !Self::ZSTD_FLAG
    }

    /// The classified fragment type.
    #[must_use]
    pub fn fragment_type(&self) -> FragmentType {
        FragmentType::from_code(self.fragment_code())
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("length", &self.length())
            .field("fragment_type", &self.fragment_type())
            .field("is_compressed", &self.is_compressed())
            .finish()
    }
}

/// Sixteen-byte Notify body prefix (Big Endian).
///
/// `[service_uid: u64][stub_id: u32][method_id: u32]`; the message payload
/// follows.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct NotifyHeader {
    service_uid: [u8; 8],
    stub_id: [u8; 4],
    method_id: [u8; 4],
}

impl NotifyHeader {
    /// Size of the serialized prefix (16 bytes).
    pub const SIZE: usize = 16;

    /// Cast a Notify prefix from the start of `bytes` (zero-copy).
    ///
    /// Returns `None` when the body is too short to hold the prefix.
    #[must_use]
    pub fn from_prefix(bytes: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(bytes).ok().map(|(header, _)| header)
    }

    /// Originating service identifier.
    #[must_use]
    pub fn service_uid(&self) -> u64 {
        u64::from_be_bytes(self.service_uid)
    }

    /// RPC stub identifier.
    #[must_use]
    pub fn stub_id(&self) -> u32 {
        u32::from_be_bytes(self.stub_id)
    }

    /// Method identifier; selects the payload schema.
    #[must_use]
    pub fn method_id(&self) -> u32 {
        u32::from_be_bytes(self.method_id)
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for NotifyHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHeader")
            .field("service_uid", &format!("{:#018x}", self.service_uid()))
            .field("stub_id", &self.stub_id())
            .field("method_id", &format!("{:#010x}", self.method_id()))
            .finish()
    }
}
