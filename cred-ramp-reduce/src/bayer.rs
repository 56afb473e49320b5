//! Bayer-pattern channel splitter (spec §4.4), a minor sibling utility: given
//! a W×H raw frame in a 2×2 repeating Bayer pattern, produce four
//! (W/2)×(H/2) channel images without allocating a transposed buffer.
//!
//! Grounded on the original C entry point
//! `image_format_extract_RGGBchan(ID_name, IDoutR_name, IDoutG1_name,
//! IDoutG2_name, IDoutB_name)` (`original_source/extract_RGGBchan.c` and
//! `image_format.h`): five image handles, mode resolved from frame size, no
//! mode argument on the call itself.

use serde::{Deserialize, Serialize};

/// Which corner of each 2x2 block a channel is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pos {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// The four-way mapping from 2x2 block position to {R, G1, G2, B}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayerMode {
    pub r: Pos,
    pub g1: Pos,
    pub g2: Pos,
    pub b: Pos,
}

impl BayerMode {
    pub const RGGB: BayerMode = BayerMode {
        r: Pos::TopLeft,
        g1: Pos::TopRight,
        g2: Pos::BottomLeft,
        b: Pos::BottomRight,
    };

    pub const GBRG: BayerMode = BayerMode {
        g1: Pos::TopLeft,
        b: Pos::TopRight,
        r: Pos::BottomLeft,
        g2: Pos::BottomRight,
    };
}

impl Default for BayerMode {
    fn default() -> Self {
        // Spec §7: unknown sizes fall back to GBRG, never fail.
        BayerMode::GBRG
    }
}

/// Size -> mode lookup (spec §9 Open Question: "consider surfacing as
/// explicit configuration" — resolved here by making the two hard-coded
/// entries a `serde`-deserializable, overridable table rather than a literal
/// `match` in the splitter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayerModeTable {
    entries: Vec<((u32, u32), BayerMode)>,
}

impl Default for BayerModeTable {
    fn default() -> Self {
        Self {
            entries: vec![
                ((5202, 3465), BayerMode::RGGB),
                ((4770, 3178), BayerMode::GBRG),
            ],
        }
    }
}

impl BayerModeTable {
    /// Resolve a mode for `(width, height)`, falling back to
    /// [`BayerMode::default`] with a warning for sizes not in the table
    /// (spec §7 "Unknown Bayer size").
    pub fn resolve(&self, width: u32, height: u32) -> BayerMode {
        match self.entries.iter().find(|(size, _)| *size == (width, height)) {
            Some((_, mode)) => *mode,
            None => {
                tracing::warn!(
                    width,
                    height,
                    "unknown Bayer frame size, defaulting to GBRG"
                );
                BayerMode::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BayerChannels {
    pub width: u32,
    pub height: u32,
    pub r: Vec<f32>,
    pub g1: Vec<f32>,
    pub g2: Vec<f32>,
    pub b: Vec<f32>,
}

#[inline]
fn pos_value(src: &[f32], src_width: usize, i: usize, j: usize, pos: Pos) -> f32 {
    let (dx, dy) = match pos {
        Pos::TopLeft => (0, 0),
        Pos::TopRight => (1, 0),
        Pos::BottomLeft => (0, 1),
        Pos::BottomRight => (1, 1),
    };
    let x = 2 * i + dx;
    let y = 2 * j + dy;
    src[y * src_width + x]
}

/// Split `src` (row-major, `width x height`, `width`/`height` even) into
/// four half-resolution channels per `mode`. Walks destination pixels and
/// reads the four source positions directly; never materializes a
/// transposed intermediate buffer (spec §4.4).
pub fn split_bayer(src: &[f32], width: u32, height: u32, mode: BayerMode) -> BayerChannels {
    let out_w = (width / 2) as usize;
    let out_h = (height / 2) as usize;
    let src_width = width as usize;

    let mut r = vec![0.0f32; out_w * out_h];
    let mut g1 = vec![0.0f32; out_w * out_h];
    let mut g2 = vec![0.0f32; out_w * out_h];
    let mut b = vec![0.0f32; out_w * out_h];

    for j in 0..out_h {
        for i in 0..out_w {
            let dst = j * out_w + i;
            r[dst] = pos_value(src, src_width, i, j, mode.r);
            g1[dst] = pos_value(src, src_width, i, j, mode.g1);
            g2[dst] = pos_value(src, src_width, i, j, mode.g2);
            b[dst] = pos_value(src, src_width, i, j, mode.b);
        }
    }

    BayerChannels {
        width: out_w as u32,
        height: out_h as u32,
        r,
        g1,
        g2,
        b,
    }
}
