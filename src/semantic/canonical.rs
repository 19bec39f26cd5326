//! Canonical text derivation for listings.
//!
//! One listing maps to one normalized string, used both as the unit of
//! embedding and as the audit copy stored next to the vector. Field order is
//! fixed so identical attributes always produce an identical string.

use crate::listings::Listing;

/// Build the canonical text for a listing.
///
/// Fields are collected in a fixed order, each one whitespace-collapsed and
/// trimmed; empty fields are dropped and the rest joined with single spaces.
/// Returns an empty string when every field is empty, which downstream
/// components treat as "nothing to index".
pub fn canonical_text(listing: &Listing) -> String {
    let mut fields: Vec<String> = vec![
        listing.title.clone(),
        listing.transaction.clone(),
        listing.property_type.clone(),
        listing.category.clone(),
        listing.location.clone(),
        listing.description.clone(),
        listing.price_text.clone(),
    ];

    if let Some(beds) = listing.beds {
        fields.push(format!("{beds} beds chambres"));
    }
    if let Some(baths) = listing.baths {
        fields.push(format!("{baths} baths salles"));
    }
    if let Some(area) = listing.area_sqm {
        fields.push(format!("{area} m2 surface"));
    }

    fields.push(listing.amenities.join(" "));

    fields
        .iter()
        .map(|field| collapse_whitespace(field))
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_yields_empty_string() {
        assert_eq!(canonical_text(&Listing::default()), "");
    }

    #[test]
    fn test_field_order_is_fixed() {
        let listing = Listing {
            title: "Appartement F3".into(),
            location: "Oran".into(),
            beds: Some(3),
            ..Default::default()
        };

        let text = canonical_text(&listing);
        assert!(text.contains("Appartement F3 Oran 3 beds chambres"), "{text}");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let listing = Listing {
            title: "  Villa   avec \t jardin \n".into(),
            location: "Alger".into(),
            ..Default::default()
        };

        assert_eq!(canonical_text(&listing), "Villa avec jardin Alger");
    }

    #[test]
    fn test_deterministic_for_identical_attributes() {
        let listing = Listing {
            title: "Studio meublé".into(),
            transaction: "location".into(),
            property_type: "studio".into(),
            location: "Hydra, Alger".into(),
            price_text: "45 000 DA / mois".into(),
            baths: Some(1),
            area_sqm: Some(32.0),
            amenities: vec!["climatisation".into(), "ascenseur".into()],
            ..Default::default()
        };

        assert_eq!(canonical_text(&listing), canonical_text(&listing.clone()));
    }

    #[test]
    fn test_full_listing_layout() {
        let listing = Listing {
            title: "Appartement F4".into(),
            transaction: "vente".into(),
            property_type: "appartement".into(),
            category: "résidentiel".into(),
            location: "Bir El Djir, Oran".into(),
            description: "Vue sur mer, 3ème étage".into(),
            price_text: "18 000 000 DA".into(),
            beds: Some(3),
            baths: Some(2),
            area_sqm: Some(110.0),
            amenities: vec!["parking".into(), "ascenseur".into()],
            ..Default::default()
        };

        assert_eq!(
            canonical_text(&listing),
            "Appartement F4 vente appartement résidentiel Bir El Djir, Oran \
             Vue sur mer, 3ème étage 18 000 000 DA 3 beds chambres \
             2 baths salles 110 m2 surface parking ascenseur"
        );
    }

    #[test]
    fn test_counts_absent_fields_are_skipped() {
        let listing = Listing {
            title: "Terrain".into(),
            area_sqm: Some(500.0),
            ..Default::default()
        };

        let text = canonical_text(&listing);
        assert!(!text.contains("beds"));
        assert!(!text.contains("baths"));
        assert!(text.contains("500 m2 surface"));
    }
}
