//! Human-readable names for layer colors.
//!
//! Each layer is named after the closest CSS named color (Euclidean
//! distance in RGB), which keeps exported filenames recognizable
//! without shipping a large color dictionary.

use hachure_pipeline::Rgb;

use crate::filename::slugify;

/// A named reference color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedColor {
    /// Display name, e.g. `"Dark Slate Blue"`.
    pub name: &'static str,
    /// Reference value.
    pub rgb: Rgb,
}

impl NamedColor {
    /// Filename-safe form of [`name`](Self::name), e.g. `"dark-slate-blue"`.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(self.name)
    }
}

const fn named(name: &'static str, hex: u32) -> NamedColor {
    let [_, r, g, b] = hex.to_be_bytes();
    NamedColor {
        name,
        rgb: [r, g, b],
    }
}

/// CSS named colors. Alias spellings (`grey`, `cyan`, `magenta`) are
/// omitted; the first entry wins a tie.
pub const NAMED_COLORS: &[NamedColor] = &[
    named("Alice Blue", 0x00f0_f8ff),
    named("Antique White", 0x00fa_ebd7),
    named("Aqua", 0x0000_ffff),
    named("Aquamarine", 0x007f_ffd4),
    named("Azure", 0x00f0_ffff),
    named("Beige", 0x00f5_f5dc),
    named("Bisque", 0x00ff_e4c4),
    named("Black", 0x0000_0000),
    named("Blanched Almond", 0x00ff_ebcd),
    named("Blue", 0x0000_00ff),
    named("Blue Violet", 0x008a_2be2),
    named("Brown", 0x00a5_2a2a),
    named("Burly Wood", 0x00de_b887),
    named("Cadet Blue", 0x005f_9ea0),
    named("Chartreuse", 0x007f_ff00),
    named("Chocolate", 0x00d2_691e),
    named("Coral", 0x00ff_7f50),
    named("Cornflower Blue", 0x0064_95ed),
    named("Cornsilk", 0x00ff_f8dc),
    named("Crimson", 0x00dc_143c),
    named("Dark Blue", 0x0000_008b),
    named("Dark Cyan", 0x0000_8b8b),
    named("Dark Goldenrod", 0x00b8_860b),
    named("Dark Gray", 0x00a9_a9a9),
    named("Dark Green", 0x0000_6400),
    named("Dark Khaki", 0x00bd_b76b),
    named("Dark Magenta", 0x008b_008b),
    named("Dark Olive Green", 0x0055_6b2f),
    named("Dark Orange", 0x00ff_8c00),
    named("Dark Orchid", 0x0099_32cc),
    named("Dark Red", 0x008b_0000),
    named("Dark Salmon", 0x00e9_967a),
    named("Dark Sea Green", 0x008f_bc8f),
    named("Dark Slate Blue", 0x0048_3d8b),
    named("Dark Slate Gray", 0x002f_4f4f),
    named("Dark Turquoise", 0x0000_ced1),
    named("Dark Violet", 0x0094_00d3),
    named("Deep Pink", 0x00ff_1493),
    named("Deep Sky Blue", 0x0000_bfff),
    named("Dim Gray", 0x0069_6969),
    named("Dodger Blue", 0x001e_90ff),
    named("Fire Brick", 0x00b2_2222),
    named("Floral White", 0x00ff_faf0),
    named("Forest Green", 0x0022_8b22),
    named("Fuchsia", 0x00ff_00ff),
    named("Gainsboro", 0x00dc_dcdc),
    named("Ghost White", 0x00f8_f8ff),
    named("Gold", 0x00ff_d700),
    named("Goldenrod", 0x00da_a520),
    named("Gray", 0x0080_8080),
    named("Green", 0x0000_8000),
    named("Green Yellow", 0x00ad_ff2f),
    named("Honeydew", 0x00f0_fff0),
    named("Hot Pink", 0x00ff_69b4),
    named("Indian Red", 0x00cd_5c5c),
    named("Indigo", 0x004b_0082),
    named("Ivory", 0x00ff_fff0),
    named("Khaki", 0x00f0_e68c),
    named("Lavender", 0x00e6_e6fa),
    named("Lavender Blush", 0x00ff_f0f5),
    named("Lawn Green", 0x007c_fc00),
    named("Lemon Chiffon", 0x00ff_facd),
    named("Light Blue", 0x00ad_d8e6),
    named("Light Coral", 0x00f0_8080),
    named("Light Cyan", 0x00e0_ffff),
    named("Light Goldenrod Yellow", 0x00fa_fad2),
    named("Light Gray", 0x00d3_d3d3),
    named("Light Green", 0x0090_ee90),
    named("Light Pink", 0x00ff_b6c1),
    named("Light Salmon", 0x00ff_a07a),
    named("Light Sea Green", 0x0020_b2aa),
    named("Light Sky Blue", 0x0087_cefa),
    named("Light Slate Gray", 0x0077_8899),
    named("Light Steel Blue", 0x00b0_c4de),
    named("Light Yellow", 0x00ff_ffe0),
    named("Lime", 0x0000_ff00),
    named("Lime Green", 0x0032_cd32),
    named("Linen", 0x00fa_f0e6),
    named("Maroon", 0x0080_0000),
    named("Medium Aquamarine", 0x0066_cdaa),
    named("Medium Blue", 0x0000_00cd),
    named("Medium Orchid", 0x00ba_55d3),
    named("Medium Purple", 0x0093_70db),
    named("Medium Sea Green", 0x003c_b371),
    named("Medium Slate Blue", 0x007b_68ee),
    named("Medium Spring Green", 0x0000_fa9a),
    named("Medium Turquoise", 0x0048_d1cc),
    named("Medium Violet Red", 0x00c7_1585),
    named("Midnight Blue", 0x0019_1970),
    named("Mint Cream", 0x00f5_fffa),
    named("Misty Rose", 0x00ff_e4e1),
    named("Moccasin", 0x00ff_e4b5),
    named("Navajo White", 0x00ff_dead),
    named("Navy", 0x0000_0080),
    named("Old Lace", 0x00fd_f5e6),
    named("Olive", 0x0080_8000),
    named("Olive Drab", 0x006b_8e23),
    named("Orange", 0x00ff_a500),
    named("Orange Red", 0x00ff_4500),
    named("Orchid", 0x00da_70d6),
    named("Pale Goldenrod", 0x00ee_e8aa),
    named("Pale Green", 0x0098_fb98),
    named("Pale Turquoise", 0x00af_eeee),
    named("Pale Violet Red", 0x00db_7093),
    named("Papaya Whip", 0x00ff_efd5),
    named("Peach Puff", 0x00ff_dab9),
    named("Peru", 0x00cd_853f),
    named("Pink", 0x00ff_c0cb),
    named("Plum", 0x00dd_a0dd),
    named("Powder Blue", 0x00b0_e0e6),
    named("Purple", 0x0080_0080),
    named("Rebecca Purple", 0x0066_3399),
    named("Red", 0x00ff_0000),
    named("Rosy Brown", 0x00bc_8f8f),
    named("Royal Blue", 0x0041_69e1),
    named("Saddle Brown", 0x008b_4513),
    named("Salmon", 0x00fa_8072),
    named("Sandy Brown", 0x00f4_a460),
    named("Sea Green", 0x002e_8b57),
    named("Seashell", 0x00ff_f5ee),
    named("Sienna", 0x00a0_522d),
    named("Silver", 0x00c0_c0c0),
    named("Sky Blue", 0x0087_ceeb),
    named("Slate Blue", 0x006a_5acd),
    named("Slate Gray", 0x0070_8090),
    named("Snow", 0x00ff_fafa),
    named("Spring Green", 0x0000_ff7f),
    named("Steel Blue", 0x0046_82b4),
    named("Tan", 0x00d2_b48c),
    named("Teal", 0x0000_8080),
    named("Thistle", 0x00d8_bfd8),
    named("Tomato", 0x00ff_6347),
    named("Turquoise", 0x0040_e0d0),
    named("Violet", 0x00ee_82ee),
    named("Wheat", 0x00f5_deb3),
    named("White", 0x00ff_ffff),
    named("White Smoke", 0x00f5_f5f5),
    named("Yellow", 0x00ff_ff00),
    named("Yellow Green", 0x009a_cd32),
];

fn distance_squared(a: Rgb, b: Rgb) -> u32 {
    a.iter()
        .zip(b)
        .map(|(&x, y)| {
            let d = u32::from(x.abs_diff(y));
            d * d
        })
        .sum()
}

/// The named color closest to `color`.
///
/// ```
/// let named = hachure_export::nearest_named_color([250, 2, 3]);
/// assert_eq!(named.name, "Red");
/// assert_eq!(named.slug(), "red");
/// ```
#[must_use]
pub fn nearest_named_color(color: Rgb) -> NamedColor {
    let mut best = NAMED_COLORS[0];
    let mut best_distance = u32::MAX;
    for candidate in NAMED_COLORS {
        let d = distance_squared(color, candidate.rgb);
        if d < best_distance {
            best = *candidate;
            best_distance = d;
        }
    }
    best
}
