//! `presets`: list built-in categories and cities.

use leadscout_core::query::{CATEGORY_PRESETS, CITY_PRESETS};

pub fn run_presets_command() {
    println!("Categories (--category):");
    for preset in CATEGORY_PRESETS {
        println!("  {:<12} {} ({} terms)", preset.slug, preset.label, preset.terms.len());
    }
    println!();
    println!("Cities (--city):");
    for preset in CITY_PRESETS {
        println!("  {:<12} {}: {}", preset.slug, preset.name, preset.neighborhoods.join(", "));
    }
}
