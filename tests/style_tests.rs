use datatrace::style::{DEFAULT_CUSTOM_COLORS, DEFAULT_PALETTE, parse_hex_color};
use datatrace::{PaletteKind, StyleConfig, StyleError, generate_color_palette};

fn strings(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| c.to_string()).collect()
}

#[test]
fn default_palette_cycles() {
    let colors = generate_color_palette(12, PaletteKind::Default, &[]);
    assert_eq!(colors.len(), 12);
    assert_eq!(colors[0], DEFAULT_PALETTE[0]);
    assert_eq!(colors[9], DEFAULT_PALETTE[9]);
    assert_eq!(colors[10], DEFAULT_PALETTE[0]);
    assert_eq!(colors[11], DEFAULT_PALETTE[1]);
}

#[test]
fn custom_palette_is_truncated_when_long_enough() {
    let custom = strings(&DEFAULT_CUSTOM_COLORS);
    let colors = generate_color_palette(3, PaletteKind::Custom, &custom);
    assert_eq!(colors, custom[..3].to_vec());
}

#[test]
fn short_custom_palette_is_padded_by_index() {
    let custom = strings(&["#000000", "#111111"]);
    let colors = generate_color_palette(4, PaletteKind::Custom, &custom);
    assert_eq!(
        colors,
        vec!["#000000", "#111111", DEFAULT_PALETTE[2], DEFAULT_PALETTE[3]]
    );
}

#[test]
fn zero_items_get_no_colors() {
    assert!(generate_color_palette(0, PaletteKind::Default, &[]).is_empty());
    assert!(generate_color_palette(0, PaletteKind::Custom, &strings(&["#000000"])).is_empty());
}

#[test]
fn style_config_picks_palette_by_kind() {
    let mut style = StyleConfig::default();
    assert_eq!(style.colors_for(2), strings(&DEFAULT_PALETTE[..2]));
    style.color_palette = PaletteKind::Custom;
    assert_eq!(style.colors_for(2), strings(&DEFAULT_CUSTOM_COLORS[..2]));
}

#[test]
fn palette_kind_parses_both_languages() {
    assert_eq!("custom".parse::<PaletteKind>().unwrap(), PaletteKind::Custom);
    assert_eq!("自定义配色".parse::<PaletteKind>().unwrap(), PaletteKind::Custom);
    assert_eq!("默认配色".parse::<PaletteKind>().unwrap(), PaletteKind::Default);
    assert!(matches!(
        "rainbow".parse::<PaletteKind>(),
        Err(StyleError::UnknownPalette(_))
    ));
}

#[test]
fn invalid_custom_color_fails_validation() {
    let style = StyleConfig {
        custom_colors: strings(&["#66BB6A", "green"]),
        ..StyleConfig::default()
    };
    assert_eq!(
        style.validate(),
        Err(StyleError::InvalidColor("green".into()))
    );
    assert!(parse_hex_color("#1DE9B6").is_ok());
}
