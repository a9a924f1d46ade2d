//! Point-of-interest audio table
//!
//! Each geo cell the campaign targets is mapped to its city and three
//! pre-recorded voice-over variants. One variant is drawn per activation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoiEntry {
    pub id: &'static str,
    pub city: &'static str,
    pub variants: [&'static str; 3],
}

impl PoiEntry {
    /// Draw a variant with a freshly seeded generator
    pub fn pick_variant(&self) -> &'static str {
        self.pick_variant_with(&mut StdRng::from_entropy())
    }

    pub fn pick_variant_with<R: Rng>(&self, rng: &mut R) -> &'static str {
        self.variants[rng.gen_range(0..self.variants.len())]
    }
}

/// Look up a geo cell
pub fn lookup(id: &str) -> Option<&'static PoiEntry> {
    POI_TABLE.iter().find(|entry| entry.id == id)
}

macro_rules! poi {
    ($id:literal, $city:literal, $slug:literal) => {
        PoiEntry {
            id: $id,
            city: $city,
            variants: [
                concat!("https://cdn.adcreative.example.com/audio/", $slug, "/lom_1.mp3"),
                concat!("https://cdn.adcreative.example.com/audio/", $slug, "/lom_2.mp3"),
                concat!("https://cdn.adcreative.example.com/audio/", $slug, "/lom_3.mp3"),
            ],
        }
    };
}

pub static POI_TABLE: [PoiEntry; 24] = [
    poi!("u09tvw", "Paris", "paris"),
    poi!("u09wh2", "Saint-Denis", "saint-denis"),
    poi!("u09t4s", "Boulogne-Billancourt", "boulogne"),
    poi!("u0fs7f", "Reims", "reims"),
    poi!("u0u6gh", "Strasbourg", "strasbourg"),
    poi!("u14dhq", "Lille", "lille"),
    poi!("gcz4wz", "Rouen", "rouen"),
    poi!("gbwcvm", "Rennes", "rennes"),
    poi!("gbqutw", "Nantes", "nantes"),
    poi!("u0bhtf", "Tours", "tours"),
    poi!("u0b3qe", "Orléans", "orleans"),
    poi!("u07t7c", "Dijon", "dijon"),
    poi!("u0kq3j", "Besançon", "besancon"),
    poi!("u05kqh", "Lyon", "lyon"),
    poi!("u0h0ft", "Grenoble", "grenoble"),
    poi!("u05p9b", "Clermont-Ferrand", "clermont"),
    poi!("ezzx5m", "Bordeaux", "bordeaux"),
    poi!("spc00c", "Toulouse", "toulouse"),
    poi!("spf9zf", "Montpellier", "montpellier"),
    poi!("spey61", "Marseille", "marseille"),
    poi!("spv2bd", "Nice", "nice"),
    poi!("u0b7r3", "Limoges", "limoges"),
    poi!("gbrmrk", "Angers", "angers"),
    poi!("u0k7bs", "Saint-Étienne", "saint-etienne"),
];
