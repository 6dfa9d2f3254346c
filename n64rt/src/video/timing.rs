//! # Video Timing Profiles
//!
//! One immutable table of VI timing values per TV standard. The table is
//! picked once at boot and never touched again.
//!
//! | Platform | Family | Lines | Notes                                  |
//! |----------|--------|-------|----------------------------------------|
//! | `Ntsc`   | NTSC   | 525   |                                        |
//! | `Pal`    | PAL    | 625   |                                        |
//! | `Mpal`   | PAL    | 525   | PAL-M, Brazil                          |
//! | `Ique`   | NTSC   | 525   | iQue Player; needs pixel advance 2     |
//!
//! ## Compile-time Overrides
//!
//! The TV type normally comes from the first-stage loader. Cargo features can
//! pin it instead:
//!
//! - `region-ntsc`, `region-pal`, `region-mpal` (at most one)
//! - `ique`, which only pairs with NTSC-family timing
//!
//! Anything else fails the build.

use bit_field::BitField;

use crate::{
    handoff::{BootParams, TvType},
    Error,
};

#[cfg(any(
    all(feature = "region-ntsc", feature = "region-pal"),
    all(feature = "region-ntsc", feature = "region-mpal"),
    all(feature = "region-pal", feature = "region-mpal"),
))]
compile_error!("pick at most one of `region-ntsc`, `region-pal`, `region-mpal`");

#[cfg(all(feature = "ique", any(feature = "region-pal", feature = "region-mpal")))]
compile_error!("the iQue console only drives NTSC-family timing");

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Platform {
    Ntsc,
    Pal,
    Mpal,
    Ique,
}

impl Platform {
    pub fn from_tv_type(tv: TvType) -> Result<Self, Error> {
        match tv {
            TvType::Pal => Ok(Self::Pal),
            TvType::Ntsc => Ok(Self::Ntsc),
            TvType::Mpal => Ok(Self::Mpal),
            TvType::Unknown(raw) => Err(Error::UnknownTvType(raw)),
        }
    }

    /// The platform to drive, honouring compile-time overrides.
    pub fn detect(params: &BootParams) -> Self {
        if cfg!(feature = "ique") {
            Self::Ique
        } else if cfg!(feature = "region-ntsc") {
            Self::Ntsc
        } else if cfg!(feature = "region-pal") {
            Self::Pal
        } else if cfg!(feature = "region-mpal") {
            Self::Mpal
        } else {
            Self::from_tv_type(params.tv_type).unwrap_or_else(|err| {
                log::warn!("{}, falling back to NTSC", err);
                Self::Ntsc
            })
        }
    }

    #[inline(always)]
    pub const fn profile(self) -> &'static TimingProfile {
        match self {
            Self::Ntsc => &NTSC,
            Self::Pal => &PAL,
            Self::Mpal => &MPAL,
            Self::Ique => &IQUE,
        }
    }
}

/// Every VI register value that depends on the TV standard.
#[derive(Debug, PartialEq, Eq)]
pub struct TimingProfile {
    pub burst: u32,
    pub v_sync: u32,
    pub h_sync: u32,
    pub h_sync_leap: u32,
    pub h_video: u32,
    pub v_video: u32,
    pub v_burst: u32,
    /// `VI_CTRL` bits 12-15.
    pub pixel_advance: u8,
}

pub const PAL: TimingProfile = TimingProfile {
    burst: 0x0004_233A,
    v_sync: 0x0000_0271,
    h_sync: 0x0015_0C69,
    h_sync_leap: 0x0C6F_0C6E,
    h_video: 0x0080_0300,
    v_video: 0x002D_026D,
    v_burst: 0x0009_026B,
    pixel_advance: 3,
};

pub const NTSC: TimingProfile = TimingProfile {
    burst: 0x03E5_2239,
    v_sync: 0x0000_020D,
    h_sync: 0x0000_0C15,
    h_sync_leap: 0x0C15_0C15,
    h_video: 0x006C_02EC,
    v_video: 0x0023_0203,
    v_burst: 0x000E_0204,
    pixel_advance: 3,
};

pub const MPAL: TimingProfile = TimingProfile {
    burst: 0x0065_1E39,
    v_sync: 0x0000_020D,
    h_sync: 0x0004_0C11,
    h_sync_leap: 0x0C19_0C1A,
    h_video: 0x006C_02EC,
    v_video: 0x0025_01FF,
    v_burst: 0x000E_0204,
    pixel_advance: 3,
};

pub const IQUE: TimingProfile = TimingProfile {
    pixel_advance: 2,
    ..NTSC
};

bitflags::bitflags! {
    /// `VI_CTRL` pixel type, bits 0-1.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ViCtrl: u32 {
        /// 16bpp RGBA5551 framebuffer. Gamma, divot and dither stay off.
        const TYPE_16 = 0b10;
    }
}

/// Anti-alias mode, `VI_CTRL` bits 8-9.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AntiAlias {
    ResampleFetchAlways = 0,
    ResampleFetchNeeded = 1,
    ResampleOnly = 2,
    Off = 3,
}

impl TimingProfile {
    /// `VI_CTRL` for a 16bpp progressive display with this profile.
    pub fn ctrl(&self, aa: AntiAlias) -> u32 {
        let mut value = ViCtrl::TYPE_16.bits();
        value.set_bits(8..10, aa as u32);
        value.set_bits(12..16, u32::from(self.pixel_advance));
        value
    }

    /// `VI_H_VIDEO` span in output pixels.
    pub fn active_width(&self) -> u32 {
        self.h_video.get_bits(0..10) - self.h_video.get_bits(16..26)
    }

    /// `VI_V_VIDEO` span in half-lines.
    pub fn active_half_lines(&self) -> u32 {
        self.v_video.get_bits(0..10) - self.v_video.get_bits(16..26)
    }
}

static_assertions::const_assert!(IQUE.pixel_advance < 16 && NTSC.pixel_advance < 16);
static_assertions::const_assert!(PAL.pixel_advance < 16 && MPAL.pixel_advance < 16);
